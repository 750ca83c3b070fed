//! Failure handling strategies

use crate::errors::PlaybackError;
use crate::types::FailureStrategy;
use std::time::Duration;
use tracing::{info, warn};

/// Failure handler trait
///
/// Decides what happens after an action fails. The handler never sleeps;
/// the engine waits out the backoff so the wait stays cancellable.
pub trait FailureHandler: Send + Sync {
    /// Handle action failure according to strategy
    fn handle_failure(
        &self,
        index: usize,
        strategy: FailureStrategy,
        error: &PlaybackError,
        attempt: u32,
    ) -> FailureDecision;

    /// Check if retry should be attempted
    fn should_retry(&self, strategy: FailureStrategy, attempt: u32) -> bool;

    /// Calculate backoff duration for retry
    fn calculate_backoff(&self, strategy: FailureStrategy, attempt: u32) -> Duration;
}

/// Result of failure handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDecision {
    /// Stop the run
    Abort(String),

    /// Record the failure and go to the next action
    Continue(String),

    /// Run the same action again after the backoff
    Retry { attempt: u32, backoff_ms: u64 },
}

/// Default failure handler implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFailureHandler;

impl DefaultFailureHandler {
    pub fn new() -> Self {
        Self
    }
}

impl FailureHandler for DefaultFailureHandler {
    fn handle_failure(
        &self,
        index: usize,
        strategy: FailureStrategy,
        error: &PlaybackError,
        attempt: u32,
    ) -> FailureDecision {
        match strategy {
            FailureStrategy::Abort => {
                warn!(action_index = index, "Action failed, aborting run: {}", error);
                FailureDecision::Abort(error.to_string())
            }

            FailureStrategy::Continue => {
                warn!(action_index = index, "Action failed, continuing: {}", error);
                FailureDecision::Continue(error.to_string())
            }

            FailureStrategy::Retry { max_attempts, .. } => {
                if !error.is_retryable() {
                    warn!(action_index = index, "Action failed permanently, continuing: {}", error);
                    FailureDecision::Continue(error.to_string())
                } else if !self.should_retry(strategy, attempt) {
                    warn!(
                        action_index = index,
                        "Action failed after {} attempts, continuing: {}", attempt, error
                    );
                    FailureDecision::Continue(format!(
                        "Max retry attempts ({}) exceeded: {}",
                        max_attempts, error
                    ))
                } else {
                    let backoff = self.calculate_backoff(strategy, attempt);
                    info!(
                        action_index = index,
                        "Action failed (attempt {}), retrying after {}ms",
                        attempt,
                        backoff.as_millis()
                    );
                    FailureDecision::Retry {
                        attempt: attempt + 1,
                        backoff_ms: backoff.as_millis() as u64,
                    }
                }
            }
        }
    }

    fn should_retry(&self, strategy: FailureStrategy, attempt: u32) -> bool {
        match strategy {
            FailureStrategy::Retry { max_attempts, .. } => attempt < max_attempts,
            _ => false,
        }
    }

    fn calculate_backoff(&self, strategy: FailureStrategy, attempt: u32) -> Duration {
        match strategy {
            FailureStrategy::Retry { backoff_ms, .. } => {
                // Exponential backoff: backoff_ms * 2^(attempt-1)
                let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1));
                let total_ms = backoff_ms.saturating_mul(multiplier);
                // Cap at 60 seconds
                Duration::from_millis(total_ms.min(60_000))
            }
            _ => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::ActionError;

    fn not_found() -> PlaybackError {
        PlaybackError::ElementNotFound {
            index: 1,
            locator: "#missing".to_string(),
        }
    }

    #[test]
    fn test_should_retry() {
        let handler = DefaultFailureHandler::new();

        assert!(!handler.should_retry(FailureStrategy::Abort, 0));
        assert!(!handler.should_retry(FailureStrategy::Continue, 5));

        let retry_strategy = FailureStrategy::Retry {
            max_attempts: 3,
            backoff_ms: 100,
        };
        assert!(handler.should_retry(retry_strategy, 1));
        assert!(handler.should_retry(retry_strategy, 2));
        assert!(!handler.should_retry(retry_strategy, 3));
        assert!(!handler.should_retry(retry_strategy, 4));
    }

    #[test]
    fn test_calculate_backoff() {
        let handler = DefaultFailureHandler::new();
        let strategy = FailureStrategy::Retry {
            max_attempts: 5,
            backoff_ms: 1000,
        };

        assert_eq!(handler.calculate_backoff(strategy, 1).as_millis(), 1000);
        assert_eq!(handler.calculate_backoff(strategy, 2).as_millis(), 2000);
        assert_eq!(handler.calculate_backoff(strategy, 3).as_millis(), 4000);

        // Capped at 60 seconds
        assert_eq!(handler.calculate_backoff(strategy, 10).as_millis(), 60_000);
        assert_eq!(handler.calculate_backoff(strategy, 100).as_millis(), 60_000);
    }

    #[test]
    fn test_handle_failure_abort() {
        let handler = DefaultFailureHandler::new();
        match handler.handle_failure(1, FailureStrategy::Abort, &not_found(), 1) {
            FailureDecision::Abort(msg) => assert!(msg.contains("#missing")),
            other => panic!("Expected Abort, got {:?}", other),
        }
    }

    #[test]
    fn test_handle_failure_continue() {
        let handler = DefaultFailureHandler::new();
        match handler.handle_failure(1, FailureStrategy::Continue, &not_found(), 1) {
            FailureDecision::Continue(msg) => assert!(msg.contains("not found")),
            other => panic!("Expected Continue, got {:?}", other),
        }
    }

    #[test]
    fn test_handle_failure_retry() {
        let handler = DefaultFailureHandler::new();
        let strategy = FailureStrategy::Retry {
            max_attempts: 3,
            backoff_ms: 100,
        };

        assert_eq!(
            handler.handle_failure(1, strategy, &not_found(), 1),
            FailureDecision::Retry {
                attempt: 2,
                backoff_ms: 100
            }
        );
        assert_eq!(
            handler.handle_failure(1, strategy, &not_found(), 2),
            FailureDecision::Retry {
                attempt: 3,
                backoff_ms: 200
            }
        );
        assert!(matches!(
            handler.handle_failure(1, strategy, &not_found(), 3),
            FailureDecision::Continue(msg) if msg.contains("Max retry attempts (3)")
        ));
    }

    #[test]
    fn test_permanent_failure_is_not_retried() {
        let handler = DefaultFailureHandler::new();
        let error = PlaybackError::Action {
            index: 0,
            source: ActionError::NotEnabled("button is disabled".to_string()),
        };
        let strategy = FailureStrategy::Retry {
            max_attempts: 3,
            backoff_ms: 100,
        };
        assert!(matches!(
            handler.handle_failure(0, strategy, &error, 1),
            FailureDecision::Continue(_)
        ));
    }
}
