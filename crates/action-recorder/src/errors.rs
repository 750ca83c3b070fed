use dom_snapshot::{DomError, NodeId, SelectorError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("recorder is not armed")]
    NotArmed,

    #[error("event target {0:?} is not an element")]
    UnknownTarget(NodeId),

    #[error("script target '{0}' matched nothing")]
    TargetNotFound(String),

    #[error("invalid script target: {0}")]
    InvalidTarget(#[from] SelectorError),

    #[error("invalid script: {0}")]
    InvalidScript(String),

    #[error("page rejected the interaction: {0}")]
    Page(#[from] DomError),
}

impl RecorderError {
    /// Errors caused by the interaction script rather than the recorder
    pub fn is_script_error(&self) -> bool {
        matches!(
            self,
            RecorderError::TargetNotFound(_)
                | RecorderError::InvalidTarget(_)
                | RecorderError::InvalidScript(_)
        )
    }
}
