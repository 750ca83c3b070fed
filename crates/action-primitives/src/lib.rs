//! Action primitives - per-kind DOM effects
//!
//! This crate provides the effects used to re-enact a recorded action once
//! its element has been resolved:
//! - click, type, select, checkbox, radio and keypress effects
//! - scroll-into-view with a settle pause and a transient highlight
//! - cooperative cancellation through [`ExecCtx`]
//! - a structured [`ActionReport`] per effect

pub mod errors;
mod primitives;
pub mod types;

pub use errors::*;
pub use primitives::*;
pub use types::*;
