//! JSON page snapshots

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{Document, NodeId, NodeType};
use crate::errors::DomError;

/// Serialized page: an optional URL plus the element tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub root: SnapshotNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotNode {
    Element(SnapshotElement),
    Text { text: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotElement {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
    /// Shorthand for a single trailing text child.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(
        default,
        rename = "selectedIndex",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_index: Option<usize>,
}

impl PageSnapshot {
    pub fn from_json(raw: &str) -> Result<Self, DomError> {
        serde_json::from_str(raw).map_err(|e| DomError::InvalidSnapshot(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, DomError> {
        serde_json::to_string_pretty(self).map_err(|e| DomError::InvalidSnapshot(e.to_string()))
    }
}

fn attr_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Document {
    pub fn from_snapshot(snapshot: &PageSnapshot) -> Result<Self, DomError> {
        let mut doc = Document::new();
        doc.set_url(snapshot.url.clone());
        let root = doc.root();
        match &snapshot.root {
            SnapshotNode::Element(element) => {
                doc.load_element(root, element)?;
            }
            SnapshotNode::Text { .. } => {
                return Err(DomError::InvalidSnapshot(
                    "snapshot root must be an element".to_string(),
                ))
            }
        }
        Ok(doc)
    }

    pub fn from_json(raw: &str) -> Result<Self, DomError> {
        Self::from_snapshot(&PageSnapshot::from_json(raw)?)
    }

    fn load_element(&mut self, parent: NodeId, source: &SnapshotElement) -> Result<NodeId, DomError> {
        if source.tag.trim().is_empty() {
            return Err(DomError::InvalidSnapshot("element without tag".to_string()));
        }
        let id = self.create_element(parent, source.tag.trim())?;
        for (name, value) in &source.attributes {
            self.set_attribute(id, name, &attr_text(value))?;
        }
        for child in &source.children {
            match child {
                SnapshotNode::Element(element) => {
                    self.load_element(id, element)?;
                }
                SnapshotNode::Text { text } => {
                    self.append_text(id, text)?;
                }
            }
        }
        if let Some(text) = &source.text {
            self.append_text(id, text)?;
        }

        let tag = self.tag_name(id).unwrap_or_default().to_string();
        let value = match (&source.value, tag.as_str()) {
            (Some(value), _) => Some(value.clone()),
            (None, "textarea") => Some(self.text_content(id)),
            _ => None,
        };
        if tag == "select" {
            let options = self.options(id);
            let index = source.selected_index.or_else(|| {
                options
                    .iter()
                    .position(|opt| self.get_attribute(*opt, "selected").is_some())
                    .or(if options.is_empty() { None } else { Some(0) })
            });
            self.element_mut(id)?.selected_index = index;
            if let (Some(value), None) = (&value, source.selected_index) {
                self.set_value(id, value)?;
            }
        } else if let Some(value) = value {
            self.element_mut(id)?.value = value;
        }
        if let Some(checked) = source.checked {
            self.element_mut(id)?.checked = checked;
        }
        Ok(id)
    }

    /// Captures the current tree, including live values and checked state.
    pub fn to_snapshot(&self) -> Result<PageSnapshot, DomError> {
        let root = self
            .document_element()
            .ok_or_else(|| DomError::InvalidSnapshot("document has no element".to_string()))?;
        Ok(PageSnapshot {
            url: self.url().map(str::to_string),
            root: self.dump_node(root)?,
        })
    }

    fn dump_node(&self, id: NodeId) -> Result<SnapshotNode, DomError> {
        let element = self.element(id)?;
        let mut out = SnapshotElement {
            tag: element.tag_name.clone(),
            ..Default::default()
        };
        for (name, value) in &element.attrs {
            out.attributes.insert(name.clone(), Value::String(value.clone()));
        }
        for child in self.children(id) {
            if self.is_element(*child) {
                out.children.push(self.dump_node(*child)?);
            } else if let Some(NodeType::Text(text)) = self.node_type(*child) {
                out.children.push(SnapshotNode::Text { text: text.clone() });
            }
        }
        if element.is_text_control() && element.attr("value") != Some(element.value.as_str()) {
            out.value = Some(element.value.clone());
        }
        if element.is_toggle() {
            out.checked = Some(element.checked);
        }
        if element.tag_name == "select" {
            out.selected_index = element.selected_index;
        }
        Ok(SnapshotNode::Element(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "url": "https://shop.example.com/checkout",
        "root": {"tag": "html", "children": [
            {"tag": "body", "children": [
                {"tag": "input", "attributes": {"type": "checkbox", "name": "terms", "checked": true}},
                {"tag": "select", "attributes": {"name": "country"}, "children": [
                    {"tag": "option", "attributes": {"value": "fr"}, "text": "France"},
                    {"tag": "option", "attributes": {"value": "de", "selected": true}, "text": "Germany"}
                ]},
                {"tag": "textarea", "text": "notes"},
                {"tag": "p", "children": [{"text": "Hello "}, {"tag": "b", "text": "world"}]}
            ]}
        ]}
    }"#;

    #[test]
    fn test_load_snapshot_state() {
        let doc = Document::from_json(PAGE).unwrap();
        assert_eq!(doc.url(), Some("https://shop.example.com/checkout"));
        let terms = doc.query_selector("input[name=terms]").unwrap().unwrap();
        assert!(doc.is_checked(terms));
        let select = doc.query_selector("select").unwrap().unwrap();
        assert_eq!(doc.value(select).as_deref(), Some("de"));
        let textarea = doc.query_selector("textarea").unwrap().unwrap();
        assert_eq!(doc.value(textarea).as_deref(), Some("notes"));
        let p = doc.query_selector("p").unwrap().unwrap();
        assert_eq!(doc.normalized_text(p), "Hello world");
    }

    #[test]
    fn test_attribute_order_preserved() {
        let doc = Document::from_json(PAGE).unwrap();
        let terms = doc.query_selector("input").unwrap().unwrap();
        let names: Vec<_> = doc.element(terms).unwrap().attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["type", "name", "checked"]);
    }

    #[test]
    fn test_snapshot_captures_live_state() {
        let mut doc = Document::from_json(PAGE).unwrap();
        let textarea = doc.query_selector("textarea").unwrap().unwrap();
        doc.set_value(textarea, "changed").unwrap();
        let reloaded = Document::from_snapshot(&doc.to_snapshot().unwrap()).unwrap();
        let textarea = reloaded.query_selector("textarea").unwrap().unwrap();
        assert_eq!(reloaded.value(textarea).as_deref(), Some("changed"));
    }

    #[test]
    fn test_rejects_text_root() {
        let err = Document::from_json(r#"{"root": {"text": "x"}}"#).unwrap_err();
        assert!(matches!(err, DomError::InvalidSnapshot(_)));
    }
}
