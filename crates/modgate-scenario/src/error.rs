//! Error types for modgate-scenario.

use modgate_compat::CompatError;
use modgate_perf::PerfError;
use thiserror::Error;

/// Errors that can occur while orchestrating a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Bad module path or scenario configuration; no phase was run.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The run workspace could not be created.
    #[error("workspace error: {0}")]
    Workspace(String),

    /// Compatibility phase failure.
    #[error(transparent)]
    Compatibility(#[from] CompatError),

    /// Performance phase failure.
    #[error(transparent)]
    Performance(#[from] PerfError),

    /// Reading or writing run artifacts failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serializing phase details failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for scenario operations.
pub type ScenarioResult<T> = Result<T, ScenarioError>;
