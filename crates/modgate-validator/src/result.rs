//! Validation result record.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one smoke sub-test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTestOutcome {
    pub name: String,
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl SubTestOutcome {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            metrics: BTreeMap::new(),
            details: BTreeMap::new(),
        }
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.passed = false;
        self.errors.push(error.into());
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Result of validating one module package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub module_path: String,
    pub success: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub performance_metrics: BTreeMap<String, f64>,
    /// Textual facts recorded by the sub-tests, such as the package digest.
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    /// Runtime release line -> whether the module is expected to load on it.
    pub compatibility_results: BTreeMap<String, bool>,
    /// Pass/fail of each smoke sub-test that ran.
    pub sub_tests: BTreeMap<String, bool>,
    pub duration_ms: u64,
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    pub fn new(module_path: &Path) -> Self {
        Self {
            module_path: module_path.display().to_string(),
            success: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            performance_metrics: BTreeMap::new(),
            details: BTreeMap::new(),
            compatibility_results: BTreeMap::new(),
            sub_tests: BTreeMap::new(),
            duration_ms: 0,
            validated_at: Utc::now(),
        }
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.success = false;
        self.errors.push(error.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Fold a smoke sub-test into this result.
    pub fn merge(&mut self, outcome: SubTestOutcome) {
        if !outcome.passed {
            self.success = false;
        }
        for error in outcome.errors {
            self.errors.push(format!("{}: {}", outcome.name, error));
        }
        for warning in outcome.warnings {
            self.warnings.push(format!("{}: {}", outcome.name, warning));
        }
        self.performance_metrics.extend(outcome.metrics);
        self.details.extend(outcome.details);
        self.sub_tests.insert(outcome.name, outcome.passed);
    }
}
