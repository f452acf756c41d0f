//! Error types for modgate-perf.

use modgate_monitor::MonitorError;
use thiserror::Error;

/// Errors that can occur while running performance tests.
#[derive(Debug, Error)]
pub enum PerfError {
    /// Bad module path or configuration; nothing was run.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `run_all_tests` was called before `initialize_tests`.
    #[error("performance tests have not been initialized")]
    NotInitialized,

    /// The resource monitor could not start.
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// The load driver failed a step.
    #[error("load driver error: {0}")]
    Driver(String),

    /// The load driver stopped the test on purpose.
    #[error("load aborted: {0}")]
    Aborted(String),

    /// The configured performance target did not answer.
    #[error("target {url} unreachable: {reason}")]
    TargetUnreachable { url: String, reason: String },
}

/// Result type for performance operations.
pub type PerfResult<T> = Result<T, PerfError>;
