//! Checkbox and radio primitives
//!
//! Both are idempotent: the element is clicked only when its state differs
//! from the wanted one, otherwise the report is a no-op.

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx, PostSignals},
};
use chrono::Utc;
use dom_snapshot::NodeId;
use std::time::Instant;
use tracing::{debug, info};

pub async fn execute_set_checkbox(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    node: NodeId,
    checked: bool,
) -> Result<ActionReport, ActionError> {
    toggle_to(primitives, ctx, node, checked, "checkbox").await
}

pub async fn execute_check_radio(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    node: NodeId,
) -> Result<ActionReport, ActionError> {
    toggle_to(primitives, ctx, node, true, "radio").await
}

async fn toggle_to(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    node: NodeId,
    wanted: bool,
    kind: &'static str,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(action_id = %ctx.action_id, node = node.0, kind, wanted, "Executing toggle primitive");
    ctx.check()?;

    let before = primitives.event_count();
    let (clicked, checked_after) = primitives.step(node, |doc| {
        doc.focus(node)?;
        let clicked = doc.is_checked(node) != wanted;
        if clicked {
            doc.click(node)?;
        }
        Ok((clicked, doc.is_checked(node)))
    })?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    let report = if clicked {
        ActionReport::success(started_at, latency_ms)
    } else {
        debug!(action_id = %ctx.action_id, "Already in wanted state, no click");
        ActionReport::no_op(started_at, latency_ms)
    };
    Ok(report.with_signals(PostSignals {
        events_dispatched: primitives.event_count() - before,
        value_after: None,
        checked_after: Some(checked_after),
    }))
}
