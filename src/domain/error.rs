//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent scoring failures.
/// None of them are retried: scoring is pure and deterministic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("malformed tree: {0}")]
    MalformedTree(String),

    #[error("attribute '{attribute}' missing on {location}")]
    AttributeMissing { location: String, attribute: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("empty selection: {0}")]
    EmptySelection(String),

    #[error("obstruction '{attribute}' on {edge} out of range [0, 1]: {value}")]
    ObstructionOutOfRange {
        edge: String,
        attribute: String,
        value: f64,
    },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
