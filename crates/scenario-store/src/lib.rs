//! Scenario persistence
//!
//! Recorded [`Action`]s are grouped into named [`Scenario`]s and stored
//! through a [`ScenarioStore`] backend. [`ScenarioCatalog`] carries the
//! user-facing operations: save, edit, duplicate, delete, export and import.

pub mod api;
pub mod catalog;
pub mod errors;
pub mod model;

pub use api::{InMemoryScenarioStore, JsonFileScenarioStore, ScenarioStore, StoreResult};
pub use catalog::{ScenarioCatalog, ScenarioEdit, COPY_SUFFIX};
pub use errors::{StoreError, StoreErrorKind};
pub use model::{Action, ActionKind, ActionPayload, Scenario};
