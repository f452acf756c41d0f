//! Error types for modgate-validator.

use thiserror::Error;

/// Errors that can occur while validating a module package.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// The module path is missing, of the wrong type, or unreadable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Reading or copying the module failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The scoped workspace could not be created.
    #[error("workspace error: {0}")]
    Workspace(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ValidatorError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ValidatorError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for validator operations.
pub type ValidatorResult<T> = Result<T, ValidatorError>;
