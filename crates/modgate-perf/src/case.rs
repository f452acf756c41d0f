//! Performance test records.

use std::fmt;

use chrono::{DateTime, Utc};
use modgate_monitor::{MetricsPoint, ResourceSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::load::{LoadProfile, LoadStep};
use crate::suite::PerformanceTestKind;
use crate::threshold::{Metric, PerformanceThreshold, ThresholdEvaluation};

/// Lifecycle of a performance test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Aborted,
}

impl fmt::Display for PerformanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PerformanceStatus::Pending => "pending",
            PerformanceStatus::Running => "running",
            PerformanceStatus::Completed => "completed",
            PerformanceStatus::Failed => "failed",
            PerformanceStatus::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}

/// Load-driver statistics accumulated over a profile walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadStats {
    pub steps: u64,
    pub requests: u64,
    pub errors: u64,
    pub avg_response_ms: f64,
    pub peak_response_ms: f64,
    pub peak_users: u32,
}

impl LoadStats {
    pub fn record(&mut self, users: u32, step: &LoadStep) {
        // Mean per step, not per request.
        self.steps += 1;
        self.avg_response_ms += (step.avg_response_ms - self.avg_response_ms) / self.steps as f64;
        self.peak_response_ms = self.peak_response_ms.max(step.avg_response_ms);
        self.requests += step.requests;
        self.errors += step.errors;
        self.peak_users = self.peak_users.max(users);
    }

    pub fn error_rate_percent(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.errors as f64 / self.requests as f64 * 100.0
        }
    }
}

/// Summary metrics of one finished test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub resources: ResourceSummary,
    pub load: LoadStats,
    pub error_rate_percent: f64,
}

impl PerformanceSummary {
    pub fn new(resources: ResourceSummary, load: LoadStats) -> Self {
        Self {
            resources,
            load,
            error_rate_percent: load.error_rate_percent(),
        }
    }

    /// The value thresholds are checked against.
    pub fn value_of(&self, metric: Metric) -> f64 {
        match metric {
            Metric::CpuPercent => self.resources.avg_cpu_percent,
            Metric::MemoryPercent => self.resources.avg_memory_percent,
            Metric::ResponseTimeMs => self.load.avg_response_ms,
        }
    }
}

/// One test of the suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceTest {
    pub id: Uuid,
    pub kind: PerformanceTestKind,
    pub profile: LoadProfile,
    pub thresholds: Vec<PerformanceThreshold>,
    pub status: PerformanceStatus,
    pub summary: Option<PerformanceSummary>,
    pub evaluations: Vec<ThresholdEvaluation>,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics_history: Vec<MetricsPoint>,
    pub timeout_secs: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

impl PerformanceTest {
    pub fn new(kind: PerformanceTestKind, profile: LoadProfile, timeout_secs: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            profile,
            thresholds: kind.thresholds(),
            status: PerformanceStatus::Pending,
            summary: None,
            evaluations: Vec::new(),
            issues: Vec::new(),
            warnings: Vec::new(),
            metrics_history: Vec::new(),
            timeout_secs,
            started_at: None,
            completed_at: None,
            duration_ms: 0,
        }
    }

    /// Check every threshold against the summary.
    pub fn evaluate_thresholds(&mut self) {
        let Some(summary) = self.summary else {
            return;
        };
        self.evaluations = self
            .thresholds
            .iter()
            .map(|t| t.evaluate(summary.value_of(t.metric), &mut self.issues, &mut self.warnings))
            .collect();
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.status, PerformanceStatus::Pending | PerformanceStatus::Running)
    }
}
