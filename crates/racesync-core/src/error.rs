//! Error types for racesync-core

use thiserror::Error;

use crate::schema::FieldError;

/// Result type alias using racesync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in racesync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Declared package checksum does not match the recomputed fingerprint
    #[error("Checksum mismatch: package declares {expected}, data hashes to {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// One or more fields failed schema validation
    #[error("Schema validation failed: {}", describe_field_errors(.0))]
    SchemaValidation(Vec<FieldError>),

    /// Checkpoint results belong to a different race than the active one
    #[error("Race identity mismatch: package is for race {package}, active race is {active}")]
    RaceIdentityMismatch { package: String, active: String },

    /// Envelope is missing required fields or has the wrong export type
    #[error("Invalid package: {0}")]
    MalformedPackage(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store-level failure while applying an import; all writes were rolled back
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Field-level view of the error, as reported by package validation.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            Self::SchemaValidation(errors) => errors.clone(),
            Self::ChecksumMismatch { .. } => vec![FieldError::new("checksum", self.to_string())],
            other => vec![FieldError::new("", other.to_string())],
        }
    }
}

fn describe_field_errors(errors: &[FieldError]) -> String {
    const SHOWN: usize = 3;

    let mut rendered = errors
        .iter()
        .take(SHOWN)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    if errors.len() > SHOWN {
        rendered.push_str(&format!(" (and {} more)", errors.len() - SHOWN));
    }
    rendered
}
