//! Scroll primitive

use crate::{
    errors::ActionError,
    primitives::{pause, DefaultActionPrimitives},
    types::{ActionReport, ExecCtx},
};
use chrono::Utc;
use dom_snapshot::NodeId;
use std::time::Instant;
use tracing::debug;

/// Scroll the element into view, then wait for the scroll to settle
pub async fn execute_scroll(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    node: NodeId,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    ctx.check()?;

    debug!(action_id = %ctx.action_id, node = node.0, "Scrolling into view");
    primitives.step(node, |doc| doc.scroll_into_view(node))?;
    pause(ctx, primitives.timing().scroll_settle).await?;

    Ok(ActionReport::success(
        started_at,
        start_instant.elapsed().as_millis() as u64,
    ))
}

#[cfg(test)]
mod tests {
    use crate::primitives::test_support::*;
    use crate::primitives::ActionPrimitives;
    use crate::ExecCtx;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_scroll_waits_for_settle() {
        let (doc, body) = page();
        let div = add(&doc, body, "div", &[]);
        let start = tokio::time::Instant::now();
        primitives(&doc)
            .scroll_into_view(&ExecCtx::default(), div)
            .await
            .unwrap();
        assert_eq!(doc.read().scrolled_into_view(), Some(div));
        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
