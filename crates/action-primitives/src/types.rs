//! Core data types for action primitives

use chrono::{DateTime, Utc};
use domreplay_core_types::ActionId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::ActionError;

/// Outline applied while an element is highlighted
pub const HIGHLIGHT_OUTLINE: &str = "3px solid #ff6600";

/// Background tint applied while an element is highlighted
pub const HIGHLIGHT_BACKGROUND: &str = "rgba(255, 102, 0, 0.1)";

/// Execution context for action primitives
///
/// Carries the identity used to correlate logs, the cancellation token
/// checked before every step, and an optional deadline.
#[derive(Clone, Debug)]
pub struct ExecCtx {
    /// Unique identifier for this action
    pub action_id: ActionId,

    /// Cancellation token for cooperative cancellation
    pub cancel_token: CancellationToken,

    /// Deadline for this operation
    pub deadline: Option<Instant>,
}

impl ExecCtx {
    /// Create a new execution context
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self {
            action_id: ActionId::new(),
            cancel_token,
            deadline: None,
        }
    }

    /// Bound every pause in this context by `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Check if this context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Check if this context has exceeded its deadline
    pub fn is_timeout(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Get remaining time until deadline
    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fails when the context can no longer make progress
    pub fn check(&self) -> Result<(), ActionError> {
        if self.is_cancelled() {
            return Err(ActionError::Interrupted("Context cancelled".to_string()));
        }
        if self.is_timeout() {
            return Err(ActionError::WaitTimeout(
                "Context deadline exceeded".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExecCtx {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

/// Fixed pauses inside a single effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectTiming {
    /// Pause after each typed character
    pub typing_delay: Duration,

    /// Pause after scrolling the target into view
    pub scroll_settle: Duration,

    /// How long the highlight stays on; `None` disables it
    pub highlight: Option<Duration>,
}

impl Default for EffectTiming {
    fn default() -> Self {
        Self {
            typing_delay: Duration::from_millis(50),
            scroll_settle: Duration::from_millis(300),
            highlight: Some(Duration::from_millis(500)),
        }
    }
}

impl EffectTiming {
    /// Every pause divided by `speed`; non-positive speeds are ignored.
    pub fn scaled(self, speed: f64) -> Self {
        if !(speed.is_finite() && speed > 0.0) {
            return self;
        }
        let scale = |d: Duration| d.div_f64(speed);
        Self {
            typing_delay: scale(self.typing_delay),
            scroll_settle: scale(self.scroll_settle),
            highlight: self.highlight.map(scale),
        }
    }
}

/// How a dropdown option is chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectTarget {
    /// Select by index (0-based)
    Index(usize),

    /// Select by value attribute
    Value(String),
}

impl SelectTarget {
    /// Index wins over value when both were captured
    pub fn from_capture(index: Option<usize>, value: Option<&str>) -> Option<Self> {
        match (index, value) {
            (Some(i), _) => Some(SelectTarget::Index(i)),
            (None, Some(v)) => Some(SelectTarget::Value(v.to_string())),
            (None, None) => None,
        }
    }
}

/// Post-action signals captured after execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSignals {
    /// Notifications dispatched at the page during the effect
    pub events_dispatched: usize,

    /// Control value after the effect, for value-bearing controls
    pub value_after: Option<String>,

    /// Checked state after the effect, for toggles
    pub checked_after: Option<bool>,
}

/// Action execution report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    /// Whether the action succeeded
    pub ok: bool,

    /// Whether the page was changed; false for idempotent no-ops
    pub applied: bool,

    /// When the action started
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,

    /// When the action finished
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub finished_at: DateTime<Utc>,

    /// Total latency in milliseconds
    pub latency_ms: u64,

    /// Post-execution signals
    pub post_signals: PostSignals,

    /// Error details (if failed)
    pub error: Option<String>,
}

impl ActionReport {
    /// Create a successful action report
    pub fn success(started_at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            ok: true,
            applied: true,
            started_at,
            finished_at: Utc::now(),
            latency_ms,
            post_signals: PostSignals::default(),
            error: None,
        }
    }

    /// Successful report for an effect that found nothing to change
    pub fn no_op(started_at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            applied: false,
            ..Self::success(started_at, latency_ms)
        }
    }

    /// Create a failed action report
    pub fn failure(started_at: DateTime<Utc>, latency_ms: u64, error: &ActionError) -> Self {
        Self {
            ok: false,
            applied: false,
            started_at,
            finished_at: Utc::now(),
            latency_ms,
            post_signals: PostSignals::default(),
            error: Some(error.to_string()),
        }
    }

    /// Add post signals
    pub fn with_signals(mut self, signals: PostSignals) -> Self {
        self.post_signals = signals;
        self
    }
}
