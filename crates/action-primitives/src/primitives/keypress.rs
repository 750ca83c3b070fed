//! Key press primitive

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx, PostSignals},
};
use chrono::Utc;
use dom_snapshot::{DomEvent, NodeId};
use std::time::Instant;
use tracing::info;

/// Focus the element and dispatch a keydown carrying `key`
pub async fn execute_press_key(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    node: NodeId,
    key: &str,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(action_id = %ctx.action_id, node = node.0, key, "Executing press_key primitive");
    ctx.check()?;

    let before = primitives.event_count();
    primitives.step(node, |doc| {
        doc.focus(node)?;
        doc.dispatch(
            node,
            DomEvent::KeyDown {
                key: key.to_string(),
            },
        )
    })?;

    Ok(
        ActionReport::success(started_at, start_instant.elapsed().as_millis() as u64)
            .with_signals(PostSignals {
                events_dispatched: primitives.event_count() - before,
                ..PostSignals::default()
            }),
    )
}

#[cfg(test)]
mod tests {
    use crate::primitives::test_support::*;
    use crate::primitives::ActionPrimitives;
    use crate::ExecCtx;
    use dom_snapshot::DomEvent;

    #[tokio::test]
    async fn test_keydown_carries_key() {
        let (doc, body) = page();
        let input = add(&doc, body, "input", &[]);
        let report = primitives(&doc)
            .press_key(&ExecCtx::default(), input, "Enter")
            .await
            .unwrap();
        assert_eq!(report.post_signals.events_dispatched, 2);
        assert_eq!(
            doc.read().events_for(input).last().copied(),
            Some(&DomEvent::KeyDown {
                key: "Enter".to_string()
            })
        );
    }
}
