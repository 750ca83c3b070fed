use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Shared error type for identifiers that fail to parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("identifier must not be empty")]
    Empty,
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde-full", serde(transparent))]
        #[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn parse(raw: &str) -> Result<Self, IdError> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(IdError::Empty);
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identity of a stored scenario.
    ScenarioId
);
string_id!(
    /// Identity of one action execution, used to correlate logs.
    ActionId
);
string_id!(
    /// Identity of one playback run.
    RunId
);
string_id!(
    /// Identity of one recording session.
    SessionId
);
