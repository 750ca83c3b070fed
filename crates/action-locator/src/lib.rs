//! Element identification and replay resolution
//!
//! This crate implements the locator engine with:
//! - A stability classifier rejecting framework-generated ids and classes
//! - A selector synthesizer walking a tunable priority cascade
//! - A typed locator model serialized only at the storage boundary
//! - A resolver with a five-step fallback chain that never fails loudly

pub mod errors;
pub mod resolver;
pub mod stability;
pub mod strategies;
pub mod synthesizer;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use stability::*;
pub use strategies::*;
pub use synthesizer::*;
pub use types::*;
