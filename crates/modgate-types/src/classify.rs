//! Turns raw execution errors into short, actionable messages.

/// Category of an execution error, derived from its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Timeout,
    Connection,
    Permission,
    Memory,
    Other,
}

impl ErrorCategory {
    /// Classify an error message by the substrings it contains.
    pub fn of(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("timeout") || lower.contains("timed out") {
            ErrorCategory::Timeout
        } else if lower.contains("connection") || lower.contains("connect") {
            ErrorCategory::Connection
        } else if lower.contains("permission") || lower.contains("access denied") {
            ErrorCategory::Permission
        } else if lower.contains("memory") {
            ErrorCategory::Memory
        } else {
            ErrorCategory::Other
        }
    }
}

/// Format an error for the report a user will read.
pub fn classify_error(context: &str, message: &str) -> String {
    match ErrorCategory::of(message) {
        ErrorCategory::Timeout => format!(
            "{} timed out: {}. Increase the timeout or check that the target is responsive",
            context, message
        ),
        ErrorCategory::Connection => format!(
            "{} could not connect: {}. Check network access and that the service is running",
            context, message
        ),
        ErrorCategory::Permission => format!(
            "{} was denied access: {}. Check file and service permissions",
            context, message
        ),
        ErrorCategory::Memory => format!(
            "{} ran out of memory: {}. Free memory or lower the load",
            context, message
        ),
        ErrorCategory::Other => format!("{} failed: {}", context, message),
    }
}
