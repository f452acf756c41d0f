//! Compatibility report.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use modgate_types::{export_report, DatabaseKind, ExportResult};
use serde::{Deserialize, Serialize};

use crate::case::{CompatibilityStatus, CompatibilityTest};
use crate::matrix::{overall_status, CompatibilityMatrix};

/// Everything a compatibility run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub module_path: PathBuf,
    pub overall_status: CompatibilityStatus,
    pub matrix: CompatibilityMatrix,
    pub tests: Vec<CompatibilityTest>,
    pub status_counts: BTreeMap<CompatibilityStatus, usize>,
    /// Environment problems that reduced the test set.
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub parallel_tests: usize,
    pub peak_running_tests: usize,
    pub test_timeout_secs: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl CompatibilityReport {
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    pub fn count(&self, status: CompatibilityStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    pub fn export_report(&self, path: Option<&Path>) -> ExportResult<serde_json::Value> {
        export_report(self, path)
    }
}

/// Builds a report from finished tests.
pub(crate) struct ReportInput {
    pub module_path: PathBuf,
    pub tests: Vec<CompatibilityTest>,
    pub warnings: Vec<String>,
    pub parallel_tests: usize,
    pub peak_running_tests: usize,
    pub test_timeout_secs: u64,
    pub started_at: DateTime<Utc>,
}

impl From<ReportInput> for CompatibilityReport {
    fn from(input: ReportInput) -> Self {
        let statuses: Vec<CompatibilityStatus> = input.tests.iter().map(|t| t.status()).collect();
        let overall = overall_status(&statuses);

        let mut status_counts = BTreeMap::new();
        for status in &statuses {
            *status_counts.entry(*status).or_insert(0) += 1;
        }

        let completed_at = Utc::now();
        let duration_ms = (completed_at - input.started_at).num_milliseconds().max(0) as u64;

        Self {
            module_path: input.module_path,
            overall_status: overall,
            matrix: CompatibilityMatrix::from_tests(&input.tests),
            recommendations: recommendations(&input.tests, overall),
            tests: input.tests,
            status_counts,
            warnings: input.warnings,
            parallel_tests: input.parallel_tests,
            peak_running_tests: input.peak_running_tests,
            test_timeout_secs: input.test_timeout_secs,
            started_at: input.started_at,
            completed_at,
            duration_ms,
        }
    }
}

/// Recommendations derived from the finished tests, in a stable order.
pub fn recommendations(tests: &[CompatibilityTest], overall: CompatibilityStatus) -> Vec<String> {
    let mut out = Vec::new();

    let incompatible: BTreeSet<String> = tests
        .iter()
        .filter(|t| t.status() == CompatibilityStatus::Incompatible && t.database.is_none())
        .map(|t| t.version.to_string())
        .collect();
    if !incompatible.is_empty() {
        out.push(format!(
            "Module is incompatible with runtime {}; raise the minimum supported version or ship a separate build",
            incompatible.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }

    let mut by_platform: BTreeMap<String, bool> = BTreeMap::new();
    for test in tests {
        let any_compatible = by_platform.entry(test.platform.key()).or_insert(false);
        *any_compatible |= test.status() == CompatibilityStatus::Compatible;
    }
    for (platform, _) in by_platform.iter().filter(|(_, ok)| !**ok) {
        out.push(format!(
            "No compatible results on platform {}; review platform-specific dependencies",
            platform
        ));
    }

    let failing_databases: BTreeMap<DatabaseKind, CompatibilityStatus> = tests
        .iter()
        .filter_map(|t| t.database.map(|db| (db, t.status())))
        .filter(|(_, s)| *s != CompatibilityStatus::Compatible)
        .collect();
    for (db, status) in failing_databases {
        match status {
            CompatibilityStatus::Partial => out.push(format!(
                "Database {} is only partially supported; review the reported limitations",
                db
            )),
            other => out.push(format!(
                "Database support for {} could not be confirmed ({}); verify drivers before deploying",
                db, other
            )),
        }
    }

    let errored = tests
        .iter()
        .filter(|t| t.status() == CompatibilityStatus::Error)
        .count();
    if errored > 0 {
        out.push(format!(
            "{} compatibility test(s) errored; resolve the reported problems and rerun",
            errored
        ));
    }

    if out.is_empty() && overall == CompatibilityStatus::Compatible {
        out.push("Module is compatible with every tested combination".to_string());
    }
    out
}
