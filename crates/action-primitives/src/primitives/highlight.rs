//! Transient highlight

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx, HIGHLIGHT_BACKGROUND, HIGHLIGHT_OUTLINE},
};
use chrono::Utc;
use dom_snapshot::NodeId;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

const OUTLINE: &str = "outline";
const BACKGROUND: &str = "background-color";

/// Inline style an element had before its first pending highlight.
#[derive(Debug, Clone)]
pub(crate) struct SavedStyle {
    outline: String,
    background: String,
    /// Latest highlight on the node; only its restore may apply
    generation: u64,
}

/// Pending highlight restores, keyed by node.
#[derive(Debug, Default)]
pub(crate) struct HighlightTable {
    active: HashMap<NodeId, SavedStyle>,
    next_generation: u64,
}

/// Outline and tint the element, restoring its own inline style after the
/// configured duration. The restore runs in the background and also fires
/// on cancellation.
///
/// Re-highlighting a node that is still lit keeps the style saved by the
/// first highlight, and only the most recent restore writes it back.
pub async fn execute_highlight(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    node: NodeId,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    ctx.check()?;

    let Some(duration) = primitives.timing().highlight else {
        return Ok(ActionReport::no_op(started_at, 0));
    };

    let generation = {
        let mut table = primitives.highlights().lock();
        let saved = primitives.step(node, |doc| {
            let saved = (
                doc.style(node, OUTLINE).unwrap_or_default().to_string(),
                doc.style(node, BACKGROUND).unwrap_or_default().to_string(),
            );
            doc.set_style(node, OUTLINE, HIGHLIGHT_OUTLINE)?;
            doc.set_style(node, BACKGROUND, HIGHLIGHT_BACKGROUND)?;
            Ok(saved)
        })?;

        table.next_generation += 1;
        let generation = table.next_generation;
        table
            .active
            .entry(node)
            .and_modify(|entry| entry.generation = generation)
            .or_insert_with(|| SavedStyle {
                outline: saved.0,
                background: saved.1,
                generation,
            });
        generation
    };

    let doc = primitives.doc().clone();
    let highlights = primitives.highlights().clone();
    let cancel = ctx.cancel_token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
        let mut table = highlights.lock();
        let Some(saved) = table
            .active
            .get(&node)
            .filter(|entry| entry.generation == generation)
            .cloned()
        else {
            debug!(node = node.0, "Highlight superseded, leaving restore to the newer one");
            return;
        };
        table.active.remove(&node);
        let restored = doc.with_mut(|d| {
            d.set_style(node, OUTLINE, &saved.outline)?;
            d.set_style(node, BACKGROUND, &saved.background)
        });
        if let Err(err) = restored {
            debug!("Highlight restore skipped: {}", err);
        }
    });

    Ok(ActionReport::success(
        started_at,
        start_instant.elapsed().as_millis() as u64,
    ))
}
