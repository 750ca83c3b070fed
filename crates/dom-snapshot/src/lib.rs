//! In-memory page model for recording and replaying interactions.
//!
//! The [`Document`] is an arena tree with live form state, an event log of
//! dispatched notifications, and query support for a CSS selector subset
//! ([`selector`]) and an XPath subset ([`xpath`]). Pages are loaded from and
//! saved to JSON via [`PageSnapshot`].

pub mod document;
pub mod errors;
pub mod selector;
pub mod shared;
pub mod snapshot;
pub mod xpath;

pub use document::{normalize_space, DispatchedEvent, Document, DomEvent, Element, NodeId, NodeType};
pub use errors::*;
pub use selector::{escape_ident, escape_string};
pub use shared::SharedDocument;
pub use snapshot::{PageSnapshot, SnapshotElement, SnapshotNode};
pub use xpath::escape_literal;
