//! Error types for policysim.
//!
//! All errors are strongly typed using thiserror. The population algebra and
//! the variable resolver never return them: unknown variables, unset values
//! and invalid references degrade to `None`, no-ops or `false`. Errors only
//! surface from constructors that opt into checking, the household builder
//! and metadata loading.

use thiserror::Error;

/// Validation errors that occur during input validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{kind} id cannot be empty")]
    EmptyId {
        kind: &'static str,
    },

    #[error("User population has no owning user")]
    MissingUser,

    #[error("Invalid year '{value}': must be a four-digit year string")]
    InvalidYear {
        value: String,
    },

    #[error("Unknown country '{value}'")]
    UnknownCountry {
        value: String,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },
}

/// Errors raised by explicit household edits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HouseholdError {
    #[error("Person {name} not found")]
    PersonNotFound {
        name: String,
    },

    #[error("Group {group} not found in {entity}")]
    GroupNotFound {
        entity: String,
        group: String,
    },

    #[error("Person {name} already exists")]
    DuplicatePerson {
        name: String,
    },
}

/// Errors raised while loading or checking country metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Failed to parse metadata: {message}")]
    Parse {
        message: String,
    },

    #[error("Variable '{variable}' references unknown entity '{entity}'")]
    UnknownEntity {
        variable: String,
        entity: String,
    },
}

impl From<serde_json::Error> for MetadataError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}

/// Top-level error type for policysim.
#[derive(Debug, Error)]
pub enum PolicySimError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Household error: {0}")]
    Household(#[from] HouseholdError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

impl PolicySimError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a household error.
    #[must_use]
    pub const fn is_household(&self) -> bool {
        matches!(self, Self::Household(_))
    }

    /// Returns true if this is a metadata error.
    #[must_use]
    pub const fn is_metadata(&self) -> bool {
        matches!(self, Self::Metadata(_))
    }
}

/// Result type alias for policysim operations.
pub type PolicySimResult<T> = Result<T, PolicySimError>;
