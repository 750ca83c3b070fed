use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreErrorKind {
    #[error("scenario not found: {0}")]
    ScenarioNotFound(String),
    #[error("scenario has no actions")]
    EmptyScenario,
    #[error("scenario name must not be empty")]
    InvalidName,
    #[error("invalid edit: {0}")]
    InvalidEdit(String),
    #[error("invalid import: {0}")]
    InvalidImport(String),
    #[error("storage io failed: {0}")]
    Io(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(transparent)]
pub struct StoreError(pub StoreErrorKind);

impl StoreError {
    pub fn new(kind: StoreErrorKind) -> Self {
        Self(kind)
    }

    pub fn kind(&self) -> &StoreErrorKind {
        &self.0
    }

    /// Rejections surfaced to the caller at the boundary, as opposed to
    /// storage failures.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self.0,
            StoreErrorKind::Io(_) | StoreErrorKind::Serialization(_)
        )
    }
}

impl From<StoreErrorKind> for StoreError {
    fn from(kind: StoreErrorKind) -> Self {
        StoreError(kind)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError(StoreErrorKind::Io(err.to_string()))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError(StoreErrorKind::Serialization(err.to_string()))
    }
}
