//! Error types for modgate-compat.

use modgate_types::DatabaseKind;
use thiserror::Error;

use crate::case::CompatibilityStatus;

/// Errors that can occur while building or running the compatibility matrix.
#[derive(Debug, Error)]
pub enum CompatError {
    /// Bad module path or configuration; nothing was run.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `run_all_tests` was called before `initialize_tests`.
    #[error("compatibility tests have not been initialized")]
    NotInitialized,

    /// A test record was moved through an illegal status transition.
    #[error("illegal status transition {from} -> {to}")]
    InvalidTransition {
        from: CompatibilityStatus,
        to: CompatibilityStatus,
    },

    /// A database probe failed.
    #[error("{database} probe failed: {reason}")]
    Probe {
        database: DatabaseKind,
        reason: String,
    },

    /// Reading module data failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for compatibility operations.
pub type CompatResult<T> = Result<T, CompatError>;
