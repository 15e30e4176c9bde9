//! Errors raised while talking to the file system on behalf of the CLI

use thiserror::Error;

use crate::application::ApplicationError;

/// Scoring and loading failures, plus I/O done outside the services
/// (resolving the working directory, writing config templates).
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("cannot {action}")]
    Io {
        action: String,
        #[source]
        source: std::io::Error,
    },
}

impl InfraError {
    /// `action` reads as a verb phrase, e.g. "write .graphscore.toml".
    pub fn io(action: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            action: action.into(),
            source,
        }
    }
}

pub type InfraResult<T> = Result<T, InfraError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_names_the_failed_action() {
        let err = InfraError::io(
            "write /tmp/.graphscore.toml",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "cannot write /tmp/.graphscore.toml");
    }
}
