//! Performance report.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use modgate_types::{export_report, ExportResult};
use serde::{Deserialize, Serialize};

use crate::case::{PerformanceStatus, PerformanceSummary, PerformanceTest};
use crate::suite::PerformanceTestKind;
use crate::threshold::{Metric, ThresholdOutcome};

/// CPU increase from baseline to stress that flags a scalability problem.
pub const SCALABILITY_CPU_DELTA: f64 = 50.0;

/// Overall verdict of the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceVerdict {
    Passed,
    Warning,
    Failed,
}

impl fmt::Display for PerformanceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceVerdict::Passed => write!(f, "passed"),
            PerformanceVerdict::Warning => write!(f, "warning"),
            PerformanceVerdict::Failed => write!(f, "failed"),
        }
    }
}

/// Stress summary against the baseline summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub baseline_cpu_percent: f64,
    pub stress_cpu_percent: f64,
    pub cpu_delta: f64,
    pub baseline_memory_percent: f64,
    pub stress_memory_percent: f64,
    pub memory_delta: f64,
    pub baseline_response_ms: f64,
    pub stress_response_ms: f64,
    pub stress_peak_users: u32,
}

impl BaselineComparison {
    pub fn between(baseline: &PerformanceSummary, stress: &PerformanceSummary) -> Self {
        let b_cpu = baseline.value_of(Metric::CpuPercent);
        let s_cpu = stress.value_of(Metric::CpuPercent);
        let b_mem = baseline.value_of(Metric::MemoryPercent);
        let s_mem = stress.value_of(Metric::MemoryPercent);
        Self {
            baseline_cpu_percent: b_cpu,
            stress_cpu_percent: s_cpu,
            cpu_delta: s_cpu - b_cpu,
            baseline_memory_percent: b_mem,
            stress_memory_percent: s_mem,
            memory_delta: s_mem - b_mem,
            baseline_response_ms: baseline.value_of(Metric::ResponseTimeMs),
            stress_response_ms: stress.value_of(Metric::ResponseTimeMs),
            stress_peak_users: stress.load.peak_users,
        }
    }

    pub fn exceeds_scalability_limit(&self) -> bool {
        self.cpu_delta > SCALABILITY_CPU_DELTA
    }
}

/// Everything a performance run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub module_path: PathBuf,
    pub overall_status: PerformanceVerdict,
    pub tests: Vec<PerformanceTest>,
    pub status_counts: BTreeMap<PerformanceStatus, usize>,
    /// One value per executed test, in execution order.
    pub trends: BTreeMap<Metric, Vec<Option<f64>>>,
    pub baseline_comparison: Option<BaselineComparison>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub test_timeout_secs: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl PerformanceReport {
    pub(crate) fn build(
        module_path: PathBuf,
        tests: Vec<PerformanceTest>,
        baseline_comparison: Option<BaselineComparison>,
        warnings: Vec<String>,
        test_timeout_secs: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut status_counts = BTreeMap::new();
        for test in &tests {
            *status_counts.entry(test.status).or_insert(0) += 1;
        }

        let trends = Metric::ALL
            .iter()
            .map(|metric| {
                let series = tests
                    .iter()
                    .map(|t| t.summary.map(|s| s.value_of(*metric)))
                    .collect();
                (*metric, series)
            })
            .collect();

        let completed_at = Utc::now();
        Self {
            module_path,
            overall_status: verdict(&tests, &warnings),
            recommendations: recommendations(&tests, baseline_comparison.as_ref()),
            status_counts,
            trends,
            baseline_comparison,
            warnings,
            tests,
            test_timeout_secs,
            duration_ms: (completed_at - started_at).num_milliseconds().max(0) as u64,
            started_at,
            completed_at,
        }
    }

    pub fn test(&self, kind: PerformanceTestKind) -> Option<&PerformanceTest> {
        self.tests.iter().find(|t| t.kind == kind)
    }

    pub fn count(&self, status: PerformanceStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    pub fn issue_count(&self) -> usize {
        self.tests.iter().map(|t| t.issues.len()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len() + self.tests.iter().map(|t| t.warnings.len()).sum::<usize>()
    }

    pub fn export_report(&self, path: Option<&Path>) -> ExportResult<serde_json::Value> {
        export_report(self, path)
    }
}

/// `failed` when any test did not complete or broke a maximum, `warning`
/// when anything warned, else `passed`.
pub fn verdict(tests: &[PerformanceTest], warnings: &[String]) -> PerformanceVerdict {
    let failed = tests
        .iter()
        .any(|t| t.status != PerformanceStatus::Completed || !t.issues.is_empty());
    if failed {
        PerformanceVerdict::Failed
    } else if !warnings.is_empty() || tests.iter().any(|t| !t.warnings.is_empty()) {
        PerformanceVerdict::Warning
    } else {
        PerformanceVerdict::Passed
    }
}

pub fn recommendations(tests: &[PerformanceTest], comparison: Option<&BaselineComparison>) -> Vec<String> {
    let mut out = Vec::new();

    for test in tests.iter().filter(|t| t.status != PerformanceStatus::Completed) {
        let cause = test.issues.first().map(String::as_str).unwrap_or("no details recorded");
        out.push(format!(
            "The {} test did not complete ({}): {}; fix the failure and rerun the suite",
            test.kind, test.status, cause
        ));
    }

    let mut violated: BTreeMap<Metric, BTreeSet<PerformanceTestKind>> = BTreeMap::new();
    for test in tests {
        for eval in test.evaluations.iter().filter(|e| e.outcome == ThresholdOutcome::Fail) {
            violated.entry(eval.metric).or_default().insert(test.kind);
        }
    }
    for (metric, kinds) in violated {
        let kinds = kinds.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ");
        let advice = match metric {
            Metric::CpuPercent => "profile the module's tag change and script handlers",
            Metric::MemoryPercent => "look for leaks and unbounded caches in the module",
            Metric::ResponseTimeMs => "move blocking work and slow queries off request threads",
        };
        out.push(format!(
            "{} exceeded its limit under the {} test(s); {}",
            metric.label(),
            kinds,
            advice
        ));
    }

    if let Some(cmp) = comparison.filter(|c| c.exceeds_scalability_limit()) {
        out.push(format!(
            "CPU rises by {:.1} points from baseline to stress ({:.1}% -> {:.1}%); the module may not scale to {} concurrent users",
            cmp.cpu_delta, cmp.baseline_cpu_percent, cmp.stress_cpu_percent, cmp.stress_peak_users
        ));
    }

    if out.is_empty() {
        if tests.iter().any(|t| !t.warnings.is_empty()) {
            out.push("Performance is within limits but close to them; monitor resource usage after deployment".to_string());
        } else {
            out.push("Module performance is within budget for every load profile".to_string());
        }
    }
    out
}
