//! Phase results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::phase::{PhaseStatus, TestPhase};

/// What one phase produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: TestPhase,
    pub status: PhaseStatus,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    /// Component report, as JSON.
    pub details: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl PhaseResult {
    pub fn new(phase: TestPhase, status: PhaseStatus) -> Self {
        let now = Utc::now();
        Self {
            phase,
            status,
            issues: Vec::new(),
            warnings: Vec::new(),
            details: serde_json::Value::Null,
            started_at: now,
            completed_at: now,
            duration_ms: 0,
        }
    }

    /// Result standing in for a phase that errored or crashed.
    pub fn error(phase: TestPhase, message: impl Into<String>) -> Self {
        let mut result = Self::new(phase, PhaseStatus::Error);
        result.issues.push(message.into());
        result
    }

    /// `failed` with issues, `warning` with warnings, else `passed`.
    pub fn from_findings(phase: TestPhase, issues: Vec<String>, warnings: Vec<String>) -> Self {
        let status = if !issues.is_empty() {
            PhaseStatus::Failed
        } else if !warnings.is_empty() {
            PhaseStatus::Warning
        } else {
            PhaseStatus::Passed
        };
        Self {
            issues,
            warnings,
            ..Self::new(phase, status)
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == PhaseStatus::Failed
    }
}
