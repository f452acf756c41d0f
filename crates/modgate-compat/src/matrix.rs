//! Compatibility matrix and overall verdict.

use std::collections::{BTreeMap, BTreeSet};

use modgate_types::DatabaseKind;
use serde::{Deserialize, Serialize};

use crate::case::{CompatibilityStatus, CompatibilityTest};

/// Versions, platforms and databases exercised, with one verdict per cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityMatrix {
    pub versions: BTreeSet<String>,
    pub platforms: BTreeSet<String>,
    pub databases: BTreeSet<DatabaseKind>,
    pub results: BTreeMap<String, CompatibilityStatus>,
    /// Share of cells with a definite verdict, in percent.
    pub coverage_percent: f64,
}

impl CompatibilityMatrix {
    pub fn from_tests(tests: &[CompatibilityTest]) -> Self {
        let mut matrix = Self::default();
        for test in tests {
            matrix.versions.insert(test.version.to_string());
            matrix.platforms.insert(test.platform.key());
            if let Some(db) = test.database {
                matrix.databases.insert(db);
            }
            matrix.results.insert(test.key(), test.status());
        }

        if !matrix.results.is_empty() {
            let definitive = matrix.results.values().filter(|s| s.is_definitive()).count();
            matrix.coverage_percent = definitive as f64 / matrix.results.len() as f64 * 100.0;
        }
        matrix
    }

    pub fn status_of(&self, key: &str) -> Option<CompatibilityStatus> {
        self.results.get(key).copied()
    }
}

/// Reduce test verdicts to one overall verdict.
///
/// | condition                          | result         |
/// |------------------------------------|----------------|
/// | more than half the tests errored   | `error`        |
/// | any test incompatible              | `incompatible` |
/// | more partial than compatible       | `partial`      |
/// | any test compatible                | `compatible`   |
/// | otherwise                          | `unknown`      |
pub fn overall_status(statuses: &[CompatibilityStatus]) -> CompatibilityStatus {
    let count = |wanted: CompatibilityStatus| statuses.iter().filter(|s| **s == wanted).count();

    let errors = count(CompatibilityStatus::Error);
    let compatible = count(CompatibilityStatus::Compatible);
    let partial = count(CompatibilityStatus::Partial);

    if !statuses.is_empty() && errors * 2 > statuses.len() {
        CompatibilityStatus::Error
    } else if count(CompatibilityStatus::Incompatible) > 0 {
        CompatibilityStatus::Incompatible
    } else if partial > compatible {
        CompatibilityStatus::Partial
    } else if compatible > 0 {
        CompatibilityStatus::Compatible
    } else {
        CompatibilityStatus::Unknown
    }
}
