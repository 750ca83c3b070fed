//! Playback error types

use action_primitives::ActionError;
use thiserror::Error;

/// Playback errors
///
/// `EmptyScenario` is the only error returned to the caller of a run; the
/// others describe a single action and are recorded in its outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// Nothing to play
    #[error("Scenario has no actions")]
    EmptyScenario,

    /// Every resolver strategy came up empty
    #[error("Element not found for action {index}: {locator}")]
    ElementNotFound { index: usize, locator: String },

    /// The resolved element rejected the effect
    #[error("Action {index} failed: {source}")]
    Action {
        index: usize,
        #[source]
        source: ActionError,
    },

    /// The recorded payload cannot be replayed
    #[error("Action {index} is not replayable: {reason}")]
    InvalidAction { index: usize, reason: String },

    /// The run was cancelled
    #[error("Playback interrupted")]
    Interrupted,

    /// A spawned run did not complete
    #[error("Playback task failed: {0}")]
    Join(String),
}

impl PlaybackError {
    pub(crate) fn from_action(index: usize, err: ActionError) -> Self {
        match err {
            ActionError::Interrupted(_) => PlaybackError::Interrupted,
            source => PlaybackError::Action { index, source },
        }
    }

    /// Whether a later attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            PlaybackError::ElementNotFound { .. } => true,
            PlaybackError::Action { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_maps_to_run_error() {
        let err = PlaybackError::from_action(2, ActionError::Interrupted("stop".to_string()));
        assert_eq!(err, PlaybackError::Interrupted);
        let err = PlaybackError::from_action(2, ActionError::NotEnabled("button".to_string()));
        assert!(!err.is_retryable());
        assert!(PlaybackError::ElementNotFound {
            index: 0,
            locator: "#a".to_string()
        }
        .is_retryable());
    }
}
