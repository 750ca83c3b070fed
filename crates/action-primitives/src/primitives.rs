//! Action primitives implementation
//!
//! One primitive per recorded action kind, plus the two preparatory steps
//! applied before every effect:
//! 1. scroll_into_view - Bring the element into view and let it settle
//! 2. highlight - Transient outline and tint, restored in the background
//! 3. click - Native click
//! 4. type_text - Clear, then type one character at a time
//! 5. select - Choose an option by index or value
//! 6. set_checkbox / check_radio - Idempotent toggles
//! 7. press_key - Dispatch a keydown

mod click;
mod highlight;
mod keypress;
mod scroll;
mod select;
mod toggle;
mod type_text;

pub use click::*;
pub use highlight::*;
pub use keypress::*;
pub use scroll::*;
pub use select::*;
pub use toggle::*;
pub use type_text::*;

use highlight::HighlightTable;

use async_trait::async_trait;
use dom_snapshot::{DomError, NodeId, SharedDocument};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    errors::ActionError,
    types::{ActionReport, EffectTiming, ExecCtx, SelectTarget},
};

/// Action primitives trait
///
/// Every primitive checks the context first, applies its effect to an
/// already resolved node and returns a report. Page locks are never held
/// across a pause.
#[async_trait]
pub trait ActionPrimitives: Send + Sync {
    /// Scroll the element into view
    async fn scroll_into_view(&self, ctx: &ExecCtx, node: NodeId)
        -> Result<ActionReport, ActionError>;

    /// Apply the transient highlight
    async fn highlight(&self, ctx: &ExecCtx, node: NodeId) -> Result<ActionReport, ActionError>;

    /// Click an element
    async fn click(&self, ctx: &ExecCtx, node: NodeId) -> Result<ActionReport, ActionError>;

    /// Replace the value of a text control, one character at a time
    async fn type_text(
        &self,
        ctx: &ExecCtx,
        node: NodeId,
        text: &str,
    ) -> Result<ActionReport, ActionError>;

    /// Select from a dropdown
    async fn select(
        &self,
        ctx: &ExecCtx,
        node: NodeId,
        target: &SelectTarget,
    ) -> Result<ActionReport, ActionError>;

    /// Bring a checkbox to the wanted state
    async fn set_checkbox(
        &self,
        ctx: &ExecCtx,
        node: NodeId,
        checked: bool,
    ) -> Result<ActionReport, ActionError>;

    /// Check a radio button
    async fn check_radio(&self, ctx: &ExecCtx, node: NodeId) -> Result<ActionReport, ActionError>;

    /// Dispatch a keydown
    async fn press_key(
        &self,
        ctx: &ExecCtx,
        node: NodeId,
        key: &str,
    ) -> Result<ActionReport, ActionError>;
}

/// Default implementation over a shared page
pub struct DefaultActionPrimitives {
    /// Page the effects are applied to
    doc: SharedDocument,

    /// Pauses inside effects
    timing: EffectTiming,

    /// Highlights waiting to be restored, keyed by node
    highlights: Arc<Mutex<HighlightTable>>,
}

impl DefaultActionPrimitives {
    /// Create a new primitives implementation
    pub fn new(doc: SharedDocument, timing: EffectTiming) -> Self {
        Self {
            doc,
            timing,
            highlights: Arc::new(Mutex::new(HighlightTable::default())),
        }
    }

    /// Page the effects are applied to
    pub fn doc(&self) -> &SharedDocument {
        &self.doc
    }

    /// Pauses used inside effects
    pub fn timing(&self) -> &EffectTiming {
        &self.timing
    }

    pub(crate) fn highlights(&self) -> &Arc<Mutex<HighlightTable>> {
        &self.highlights
    }

    /// Run one synchronous step against a connected element.
    pub(crate) fn step<R>(
        &self,
        node: NodeId,
        f: impl FnOnce(&mut dom_snapshot::Document) -> Result<R, DomError>,
    ) -> Result<R, ActionError> {
        let mut doc = self.doc.write();
        doc.element(node)?;
        if !doc.is_connected(node) {
            return Err(ActionError::StaleElement(format!(
                "node {} is no longer attached",
                node.0
            )));
        }
        Ok(f(&mut *doc)?)
    }

    pub(crate) fn event_count(&self) -> usize {
        self.doc.read().events().len()
    }
}

/// Cancellable pause. A zero duration still checks the context.
pub(crate) async fn pause(ctx: &ExecCtx, duration: Duration) -> Result<(), ActionError> {
    ctx.check()?;
    if duration.is_zero() {
        return Ok(());
    }
    let (sleep_for, times_out) = match ctx.remaining_time() {
        Some(remaining) if remaining < duration => (remaining, true),
        _ => (duration, false),
    };
    tokio::select! {
        _ = ctx.cancel_token.cancelled() => {
            Err(ActionError::Interrupted("Cancelled during pause".to_string()))
        }
        _ = tokio::time::sleep(sleep_for) => {
            if times_out {
                Err(ActionError::WaitTimeout(format!(
                    "deadline reached {}ms into a {}ms pause",
                    sleep_for.as_millis(),
                    duration.as_millis()
                )))
            } else {
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ActionPrimitives for DefaultActionPrimitives {
    async fn scroll_into_view(
        &self,
        ctx: &ExecCtx,
        node: NodeId,
    ) -> Result<ActionReport, ActionError> {
        execute_scroll(self, ctx, node).await
    }

    async fn highlight(&self, ctx: &ExecCtx, node: NodeId) -> Result<ActionReport, ActionError> {
        execute_highlight(self, ctx, node).await
    }

    async fn click(&self, ctx: &ExecCtx, node: NodeId) -> Result<ActionReport, ActionError> {
        execute_click(self, ctx, node).await
    }

    async fn type_text(
        &self,
        ctx: &ExecCtx,
        node: NodeId,
        text: &str,
    ) -> Result<ActionReport, ActionError> {
        execute_type_text(self, ctx, node, text).await
    }

    async fn select(
        &self,
        ctx: &ExecCtx,
        node: NodeId,
        target: &SelectTarget,
    ) -> Result<ActionReport, ActionError> {
        execute_select(self, ctx, node, target).await
    }

    async fn set_checkbox(
        &self,
        ctx: &ExecCtx,
        node: NodeId,
        checked: bool,
    ) -> Result<ActionReport, ActionError> {
        execute_set_checkbox(self, ctx, node, checked).await
    }

    async fn check_radio(&self, ctx: &ExecCtx, node: NodeId) -> Result<ActionReport, ActionError> {
        execute_check_radio(self, ctx, node).await
    }

    async fn press_key(
        &self,
        ctx: &ExecCtx,
        node: NodeId,
        key: &str,
    ) -> Result<ActionReport, ActionError> {
        execute_press_key(self, ctx, node, key).await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_detached_element_is_stale() {
        let (doc, body) = page();
        let button = add(&doc, body, "button", &[]);
        doc.with_mut(|d| d.detach(button)).unwrap();
        let err = primitives(&doc)
            .click(&ExecCtx::default(), button)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::StaleElement(_)));
    }

    #[tokio::test]
    async fn test_cancelled_context_rejects_effect() {
        let (doc, body) = page();
        let button = add(&doc, body, "button", &[]);
        let ctx = ExecCtx::default();
        ctx.cancel_token.cancel();
        let err = primitives(&doc).click(&ctx, button).await.unwrap_err();
        assert!(matches!(err, ActionError::Interrupted(_)));
        assert!(doc.read().events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_at_deadline() {
        let (doc, body) = page();
        let div = add(&doc, body, "div", &[]);
        let started = tokio::time::Instant::now();
        let ctx = ExecCtx::default().with_deadline(started + Duration::from_millis(120));

        let err = primitives(&doc)
            .scroll_into_view(&ctx, div)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::WaitTimeout(_)));
        assert!(err.is_retryable());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(120) && elapsed < Duration::from_millis(300));
    }
}
