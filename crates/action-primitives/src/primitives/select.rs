//! Select primitive

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx, PostSignals, SelectTarget},
};
use chrono::Utc;
use dom_snapshot::{DomError, DomEvent, NodeId};
use std::time::Instant;
use tracing::info;

/// Execute select primitive
///
/// Focuses the dropdown, chooses the option and dispatches `change`.
pub async fn execute_select(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    node: NodeId,
    target: &SelectTarget,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(action_id = %ctx.action_id, node = node.0, target = ?target, "Executing select primitive");
    ctx.check()?;

    let before = primitives.event_count();
    let value_after = primitives.step(node, |doc| {
        let element = doc.element(node)?;
        if element.is_disabled() {
            return Err(DomError::Disabled {
                tag: element.tag_name.clone(),
            });
        }
        doc.focus(node)?;
        match target {
            SelectTarget::Index(index) => doc.set_selected_index(node, *index)?,
            SelectTarget::Value(value) => {
                if doc.tag_name(node) != Some("select") {
                    return Err(DomError::NotSelect {
                        tag: doc.tag_name(node).unwrap_or_default().to_string(),
                    });
                }
                doc.set_value(node, value)?
            }
        }
        doc.dispatch(node, DomEvent::Change)?;
        Ok(doc.value(node))
    })?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    Ok(ActionReport::success(started_at, latency_ms).with_signals(PostSignals {
        events_dispatched: primitives.event_count() - before,
        value_after,
        checked_after: None,
    }))
}

#[cfg(test)]
mod tests {
    use crate::primitives::test_support::*;
    use crate::primitives::ActionPrimitives;
    use crate::{ActionError, ExecCtx, SelectTarget};
    use dom_snapshot::{DomEvent, NodeId, SharedDocument};

    fn countries(doc: &SharedDocument, body: NodeId) -> NodeId {
        let select = add(doc, body, "select", &[("id", "country")]);
        for (value, label) in [("fr", "France"), ("de", "Germany"), ("it", "Italy")] {
            let option = add(doc, select, "option", &[("value", value)]);
            doc.with_mut(|d| d.append_text(option, label)).unwrap();
        }
        doc.with_mut(|d| d.set_selected_index(select, 0)).unwrap();
        select
    }

    #[tokio::test]
    async fn test_select_by_index_then_value() {
        let (doc, body) = page();
        let select = countries(&doc, body);
        let prims = primitives(&doc);

        let report = prims
            .select(&ExecCtx::default(), select, &SelectTarget::Index(1))
            .await
            .unwrap();
        assert_eq!(report.post_signals.value_after.as_deref(), Some("de"));

        prims
            .select(&ExecCtx::default(), select, &SelectTarget::Value("it".to_string()))
            .await
            .unwrap();
        let page = doc.read();
        assert_eq!(page.selected_text(select).as_deref(), Some("Italy"));
        assert_eq!(page.count_events(select, &DomEvent::Change), 2);
    }

    #[tokio::test]
    async fn test_missing_option() {
        let (doc, body) = page();
        let select = countries(&doc, body);
        let err = primitives(&doc)
            .select(&ExecCtx::default(), select, &SelectTarget::Index(7))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::OptionNotFound(_)));
        assert_eq!(doc.read().count_events(select, &DomEvent::Change), 0);
    }

    #[tokio::test]
    async fn test_value_on_non_select() {
        let (doc, body) = page();
        let input = add(&doc, body, "input", &[]);
        let err = primitives(&doc)
            .select(&ExecCtx::default(), input, &SelectTarget::Value("x".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::NotSelectable(_)));
    }
}
