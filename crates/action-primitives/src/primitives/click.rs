//! Click primitive

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx, PostSignals},
};
use chrono::Utc;
use dom_snapshot::NodeId;
use std::time::Instant;
use tracing::{debug, info};

/// Execute click primitive
///
/// Disabled elements reject the click. Checkbox and radio side effects
/// follow the page's native behaviour.
pub async fn execute_click(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    node: NodeId,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(action_id = %ctx.action_id, node = node.0, "Executing click primitive");
    ctx.check()?;

    let before = primitives.event_count();
    debug!("Dispatching click");
    let checked_after = primitives.step(node, |doc| {
        doc.click(node)?;
        Ok(doc.element(node)?.is_toggle().then(|| doc.is_checked(node)))
    })?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    info!(action_id = %ctx.action_id, latency_ms, "Click completed successfully");
    Ok(ActionReport::success(started_at, latency_ms).with_signals(PostSignals {
        events_dispatched: primitives.event_count() - before,
        value_after: None,
        checked_after,
    }))
}

#[cfg(test)]
mod tests {
    use crate::primitives::test_support::*;
    use crate::primitives::ActionPrimitives;
    use crate::{ActionError, ExecCtx};
    use dom_snapshot::DomEvent;

    #[tokio::test]
    async fn test_click_dispatches_once() {
        let (doc, body) = page();
        let button = add(&doc, body, "button", &[]);
        let report = tokio_test::assert_ok!(primitives(&doc).click(&ExecCtx::default(), button).await);
        assert!(report.applied);
        assert_eq!(report.post_signals.events_dispatched, 1);
        assert_eq!(doc.read().count_events(button, &DomEvent::Click), 1);
    }

    #[tokio::test]
    async fn test_click_disabled_is_rejected() {
        let (doc, body) = page();
        let button = add(&doc, body, "button", &[("disabled", "")]);
        let err = primitives(&doc)
            .click(&ExecCtx::default(), button)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::NotEnabled(_)));
    }
}
