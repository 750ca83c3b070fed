//! Playback engine
//!
//! Replays recorded actions one at a time against a page: wait the recorded
//! delay, resolve the element through the fallback chain, scroll, highlight,
//! apply the kind-specific effect, settle. Failures are handled per action by
//! a [`FailureHandler`] and surfaced in a [`PlaybackReport`].

pub mod errors;
pub mod executor;
pub mod strategies;
pub mod types;

pub use errors::PlaybackError;
pub use executor::{join_playback, PlaybackEngine, PlaybackExecutor};
pub use strategies::{DefaultFailureHandler, FailureDecision, FailureHandler};
pub use types::{
    ActionOutcome, FailureStrategy, OutcomeStatus, PlaybackOptions, PlaybackReport,
    PlaybackState,
};
