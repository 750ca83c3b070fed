//! Error types for the page model

use thiserror::Error;

use crate::document::NodeId;

/// Selector parse failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unsupported selector syntax '{selector}': {reason}")]
    Unsupported { selector: String, reason: String },

    #[error("invalid xpath '{expr}': {reason}")]
    XPath { expr: String, reason: String },
}

impl SelectorError {
    pub(crate) fn unsupported(selector: &str, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn xpath(expr: &str, reason: impl Into<String>) -> Self {
        Self::XPath {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}

/// Page model failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),

    #[error("node {0:?} is not an element")]
    NotElement(NodeId),

    #[error("element <{tag}> is disabled")]
    Disabled { tag: String },

    #[error("element <{tag}> does not accept text")]
    NotTextControl { tag: String },

    #[error("element <{tag}> is not a select")]
    NotSelect { tag: String },

    #[error("no option matches {0}")]
    OptionNotFound(String),

    #[error("cannot append {child:?} under {parent:?}")]
    InvalidHierarchy { parent: NodeId, child: NodeId },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}
