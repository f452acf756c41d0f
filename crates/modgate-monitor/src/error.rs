//! Error types for modgate-monitor.

use thiserror::Error;

/// Errors raised while sampling host resources.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A procfs source could not be read.
    #[error("failed to read {source_path}: {source}")]
    Read {
        source_path: String,
        #[source]
        source: std::io::Error,
    },

    /// A procfs source had an unexpected layout.
    #[error("failed to parse {source_path}: {reason}")]
    Parse { source_path: String, reason: String },

    /// Sampling is not supported on this platform.
    #[error("resource sampling is not supported on {0}")]
    Unsupported(String),

    /// The monitor was started twice.
    #[error("system monitor already running")]
    AlreadyRunning,
}

/// Result type for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
