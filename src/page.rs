//! Page snapshot loading and node descriptions for command output

use std::path::Path;

use anyhow::{Context, Result};
use dom_snapshot::{Document, NodeId};
use tokio::fs;

const TEXT_PREVIEW: usize = 40;

/// Load a page from a JSON snapshot file
pub async fn load_page(path: &Path) -> Result<Document> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read page snapshot {}", path.display()))?;
    Document::from_json(&raw)
        .with_context(|| format!("Failed to parse page snapshot {}", path.display()))
}

/// Find exactly one element by CSS selector
pub fn query_one(doc: &Document, selector: &str) -> Result<NodeId> {
    doc.query_selector(selector)
        .with_context(|| format!("Invalid selector: {}", selector))?
        .with_context(|| format!("No element matches {}", selector))
}

/// `body > form > input#email` style path with a text preview
pub fn describe_node(doc: &Document, node: NodeId) -> String {
    let mut parts = Vec::new();
    let mut current = Some(node);
    while let Some(id) = current {
        let Some(tag) = doc.tag_name(id) else { break };
        if tag == "html" {
            break;
        }
        let mut part = tag.to_string();
        if let Some(dom_id) = doc.get_attribute(id, "id").filter(|v| !v.is_empty()) {
            part.push('#');
            part.push_str(dom_id);
        } else if doc.same_tag_siblings(id).len() > 1 {
            part.push_str(&format!(":nth-of-type({})", doc.nth_of_type(id)));
        }
        parts.push(part);
        current = doc.parent_element(id);
    }
    parts.reverse();

    let mut described = parts.join(" > ");
    let text = doc.normalized_text(node);
    if !text.is_empty() {
        let preview: String = text.chars().take(TEXT_PREVIEW).collect();
        described.push_str(&format!(" \"{}\"", preview));
    }
    described
}
