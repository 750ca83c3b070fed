//! Error types for action primitives

use dom_snapshot::DomError;
use thiserror::Error;

/// Failure applying an effect to a resolved element
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Wait operation timed out
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// Operation was cancelled or interrupted
    #[error("Operation interrupted: {0}")]
    Interrupted(String),

    /// Element is not enabled for interaction
    #[error("Element not enabled: {0}")]
    NotEnabled(String),

    /// Element does not accept text
    #[error("Element not typeable: {0}")]
    NotTypeable(String),

    /// Element is not a dropdown
    #[error("Element not selectable: {0}")]
    NotSelectable(String),

    /// Dropdown option was not found
    #[error("Option not found in dropdown: {0}")]
    OptionNotFound(String),

    /// Element left the document between resolution and effect
    #[error("Stale element: {0}")]
    StaleElement(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::WaitTimeout(_) | ActionError::StaleElement(_)
        )
    }
}

impl From<DomError> for ActionError {
    fn from(err: DomError) -> Self {
        let detail = err.to_string();
        match err {
            DomError::Disabled { .. } => ActionError::NotEnabled(detail),
            DomError::NotTextControl { .. } => ActionError::NotTypeable(detail),
            DomError::NotSelect { .. } => ActionError::NotSelectable(detail),
            DomError::OptionNotFound(_) => ActionError::OptionNotFound(detail),
            DomError::UnknownNode(_) | DomError::NotElement(_) => ActionError::StaleElement(detail),
            DomError::InvalidHierarchy { .. } | DomError::InvalidSnapshot(_) => {
                ActionError::Internal(detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_snapshot::NodeId;

    #[test]
    fn test_dom_error_mapping() {
        let err: ActionError = DomError::Disabled {
            tag: "button".to_string(),
        }
        .into();
        assert!(matches!(err, ActionError::NotEnabled(_)));
        assert!(!err.is_retryable());

        let err: ActionError = DomError::UnknownNode(NodeId(9)).into();
        assert!(err.is_retryable());
        assert!(!ActionError::Interrupted("stop".to_string()).is_retryable());
    }
}
