//! domreplay library
//!
//! Exposes configuration and page loading for the binary and integration tests

pub mod config;
pub mod page;

pub use config::Config;
