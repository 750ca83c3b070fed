//! Error types for locator system

use dom_snapshot::SelectorError;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Every strategy in the fallback chain came up empty
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Locator is not a valid live query
    #[error("Selector syntax error: {0}")]
    SelectorSyntax(String),

    /// Locator does not apply to this strategy's shape
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// No rule produced a locator for an element
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),
}

impl From<SelectorError> for LocatorError {
    fn from(err: SelectorError) -> Self {
        LocatorError::SelectorSyntax(err.to_string())
    }
}
