//! Application-level errors (wraps domain errors)

use std::path::PathBuf;

use itertools::Itertools;
use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("could not find graph for patient '{patient_id}', tried: {}", format_paths(.tried))]
    GraphNotFound {
        patient_id: String,
        tried: Vec<PathBuf>,
    },

    #[error("invalid graph file {path}: {message}")]
    InvalidGraphFile { path: PathBuf, message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display()).join(", ")
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
