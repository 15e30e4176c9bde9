//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        CliError::from(ApplicationError::Domain(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(InfraError::Io { .. }) => exitcode::IOERR,
            CliError::Infra(InfraError::Application(e)) => match e {
                ApplicationError::Domain(DomainError::InvalidConfiguration(_)) => exitcode::CONFIG,
                ApplicationError::Domain(_) => exitcode::DATAERR,
                ApplicationError::GraphNotFound { .. } => exitcode::NOINPUT,
                ApplicationError::InvalidGraphFile { .. } => exitcode::DATAERR,
                ApplicationError::Config { .. } => exitcode::CONFIG,
                ApplicationError::OperationFailed { .. } => exitcode::IOERR,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let empty: CliError = DomainError::EmptySelection("no edges".into()).into();
        assert_eq!(empty.exit_code(), exitcode::DATAERR);

        let config: CliError = DomainError::InvalidConfiguration("thresholds".into()).into();
        assert_eq!(config.exit_code(), exitcode::CONFIG);

        let missing: CliError = ApplicationError::GraphNotFound {
            patient_id: "0055".into(),
            tried: vec![PathBuf::from("data/graphs/x.json")],
        }
        .into();
        assert_eq!(missing.exit_code(), exitcode::NOINPUT);

        assert_eq!(CliError::Usage("no command".into()).exit_code(), exitcode::USAGE);
    }
}
