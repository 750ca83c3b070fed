//! Type text primitive

use crate::{
    errors::ActionError,
    primitives::{pause, DefaultActionPrimitives},
    types::{ActionReport, ExecCtx, PostSignals},
};
use chrono::Utc;
use dom_snapshot::{DomError, DomEvent, NodeId};
use std::time::Instant;
use tracing::{debug, info};

/// Execute type_text primitive
///
/// Steps:
/// 1. Reject disabled or non-text controls
/// 2. Focus and clear the field
/// 3. Append one character at a time, dispatching `input` after each and
///    pausing for the typing delay
/// 4. Dispatch a single `change`
pub async fn execute_type_text(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    node: NodeId,
    text: &str,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        node = node.0,
        chars = text.chars().count(),
        "Executing type_text primitive"
    );
    ctx.check()?;

    let before = primitives.event_count();
    primitives.step(node, |doc| {
        let element = doc.element(node)?;
        if element.is_disabled() {
            return Err(DomError::Disabled {
                tag: element.tag_name.clone(),
            });
        }
        if !element.is_text_control() {
            return Err(DomError::NotTextControl {
                tag: element.tag_name.clone(),
            });
        }
        doc.focus(node)?;
        doc.set_value(node, "")
    })?;

    for ch in text.chars() {
        ctx.check()?;
        primitives.step(node, |doc| {
            let mut value = doc.value(node).unwrap_or_default();
            value.push(ch);
            doc.set_value(node, &value)?;
            doc.dispatch(node, DomEvent::Input)
        })?;
        pause(ctx, primitives.timing().typing_delay).await?;
    }

    let value_after = primitives.step(node, |doc| {
        doc.dispatch(node, DomEvent::Change)?;
        Ok(doc.value(node))
    })?;
    debug!("Typed value now {:?}", value_after);

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    info!(action_id = %ctx.action_id, latency_ms, "Typing completed successfully");
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
    use crate::{ActionError, ExecCtx};
    use dom_snapshot::DomEvent;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_one_input_per_character() {
        let (doc, body) = page();
        let input = add(&doc, body, "input", &[("type", "text")]);
        doc.with_mut(|d| d.set_value(input, "old")).unwrap();

        let start = tokio::time::Instant::now();
        let report = primitives(&doc)
            .type_text(&ExecCtx::default(), input, "abc")
            .await
            .unwrap();

        let page = doc.read();
        assert_eq!(page.count_events(input, &DomEvent::Input), 3);
        assert_eq!(page.count_events(input, &DomEvent::Change), 1);
        assert_eq!(page.value(input).as_deref(), Some("abc"));
        assert_eq!(page.active_element(), Some(input));
        assert_eq!(report.post_signals.value_after.as_deref(), Some("abc"));
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_follows_last_input() {
        let (doc, body) = page();
        let area = add(&doc, body, "textarea", &[]);
        primitives(&doc)
            .type_text(&ExecCtx::default(), area, "hi")
            .await
            .unwrap();
        let events: Vec<DomEvent> = doc.read().events_for(area).into_iter().cloned().collect();
        assert_eq!(
            events,
            vec![DomEvent::Focus, DomEvent::Input, DomEvent::Input, DomEvent::Change]
        );
    }

    #[tokio::test]
    async fn test_checkbox_is_not_typeable() {
        let (doc, body) = page();
        let boxed = add(&doc, body, "input", &[("type", "checkbox")]);
        let err = primitives(&doc)
            .type_text(&ExecCtx::default(), boxed, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::NotTypeable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_typing() {
        let (doc, body) = page();
        let input = add(&doc, body, "input", &[]);
        let ctx = ExecCtx::default();
        let token = ctx.cancel_token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            token.cancel();
        });
        let err = primitives(&doc)
            .type_text(&ctx, input, "abcdef")
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Interrupted(_)));
        assert_eq!(doc.read().count_events(input, &DomEvent::Change), 0);
        assert!(doc.read().count_events(input, &DomEvent::Input) < 6);
    }
}
