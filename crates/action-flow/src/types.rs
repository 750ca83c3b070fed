//! Core types for playback

use action_locator::ResolveStrategy;
use action_primitives::{ActionReport, EffectTiming};
use chrono::{DateTime, Utc};
use domreplay_core_types::RunId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Playing { position: usize },
    Done,
}

/// Failure strategy - how to handle a failed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FailureStrategy {
    /// Stop the run; later actions are skipped
    Abort,

    /// Record the failure and move on
    #[default]
    Continue,

    /// Retry the action with exponential backoff, then move on
    Retry { max_attempts: u32, backoff_ms: u64 },
}

/// Run options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackOptions {
    /// Playback speed multiplier; every pause is divided by it
    pub speed: f64,

    /// Pause after each typed character
    pub typing_delay_ms: u64,

    /// Pause after scrolling the target into view
    pub scroll_settle_ms: u64,

    /// Pause after every applied effect
    pub settle_delay_ms: u64,

    /// Whether targets are highlighted before the effect
    pub highlight: bool,

    /// How long the highlight stays on
    pub highlight_ms: u64,

    /// What to do when an action fails
    pub failure_strategy: FailureStrategy,

    /// Upper bound on the effect pauses of one attempt, not scaled by speed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_timeout_ms: Option<u64>,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            typing_delay_ms: 50,
            scroll_settle_ms: 300,
            settle_delay_ms: 200,
            highlight: true,
            highlight_ms: 500,
            failure_strategy: FailureStrategy::Continue,
            action_timeout_ms: None,
        }
    }
}

impl PlaybackOptions {
    fn speed(&self) -> f64 {
        if self.speed.is_finite() && self.speed > 0.0 {
            self.speed
        } else {
            1.0
        }
    }

    /// `ms` divided by the speed multiplier
    pub fn scaled(&self, ms: u64) -> Duration {
        Duration::from_millis(ms).div_f64(self.speed())
    }

    /// Pause after every applied effect
    pub fn settle_delay(&self) -> Duration {
        self.scaled(self.settle_delay_ms)
    }

    /// Deadline for an attempt starting now
    pub fn attempt_deadline(&self) -> Option<tokio::time::Instant> {
        self.action_timeout_ms
            .map(|ms| tokio::time::Instant::now() + Duration::from_millis(ms))
    }

    /// Pauses handed to the action primitives
    pub fn effect_timing(&self) -> EffectTiming {
        EffectTiming {
            typing_delay: Duration::from_millis(self.typing_delay_ms),
            scroll_settle: Duration::from_millis(self.scroll_settle_ms),
            highlight: self
                .highlight
                .then(|| Duration::from_millis(self.highlight_ms)),
        }
        .scaled(self.speed())
    }
}

/// Per-action result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The effect changed the page
    Applied,
    /// The element was already in the recorded state
    NoOp,
    /// No strategy resolved the element
    NotFound,
    /// The element rejected the effect
    Failed,
    /// The run was cancelled before or during this action
    Cancelled,
    /// An earlier failure aborted the run
    Skipped,
}

impl OutcomeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeStatus::Applied | OutcomeStatus::NoOp)
    }
}

/// Result of one action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub index: usize,
    pub kind: String,
    pub locator: String,
    pub status: OutcomeStatus,

    /// Resolver strategy that found the element
    pub strategy: Option<ResolveStrategy>,

    /// Attempts made, retries included
    pub attempts: u32,

    pub error: Option<String>,

    /// Report of the effect (if it ran)
    pub report: Option<ActionReport>,
}

impl ActionOutcome {
    pub fn new(index: usize, kind: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            index,
            kind: kind.into(),
            locator: locator.into(),
            status: OutcomeStatus::Skipped,
            strategy: None,
            attempts: 0,
            error: None,
            report: None,
        }
    }

    pub fn with_status(mut self, status: OutcomeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Playback run result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackReport {
    pub run_id: RunId,
    pub state: PlaybackState,
    pub outcomes: Vec<ActionOutcome>,

    /// Whether a failure stopped the run early
    pub aborted: bool,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
}

impl PlaybackReport {
    pub fn new(run_id: RunId) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            state: PlaybackState::Idle,
            outcomes: Vec::new(),
            aborted: false,
            started_at: now,
            finished_at: now,
            latency_ms: 0,
        }
    }

    /// Set finish time, latency and the terminal state
    pub fn finish(mut self) -> Self {
        self.state = PlaybackState::Done;
        self.finished_at = Utc::now();
        self.latency_ms = (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    pub fn statuses(&self) -> Vec<OutcomeStatus> {
        self.outcomes.iter().map(|o| o.status).collect()
    }
}
