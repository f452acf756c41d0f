//! Compatibility tester configuration.

use std::time::Duration;

use modgate_types::{DatabaseKind, Version};
use serde::{Deserialize, Serialize};

use crate::error::{CompatError, CompatResult};

/// Configuration for [`crate::CompatibilityTester`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityConfig {
    /// Runtime versions the module is checked against.
    #[serde(default = "default_target_versions")]
    pub target_versions: Vec<String>,

    /// Maximum number of tests running at once.
    #[serde(default = "default_parallel_tests")]
    pub parallel_tests: usize,

    /// Per-test time budget. Recorded in the report; enforcement is up to the caller.
    #[serde(default = "default_test_timeout_secs")]
    pub test_timeout_secs: u64,

    /// Database backends exercised against the newest target version.
    #[serde(default = "default_databases")]
    pub databases: Vec<DatabaseKind>,

    /// Image repository used for container tests.
    #[serde(default = "default_container_registry")]
    pub container_registry: String,

    /// Simulated environment-probe latency per test.
    #[serde(default = "default_probe_delay_ms")]
    pub probe_delay_ms: u64,
}

fn default_target_versions() -> Vec<String> {
    vec!["8.0.17".to_string(), "8.1.15".to_string(), "8.1.25".to_string()]
}

fn default_parallel_tests() -> usize {
    3
}

fn default_test_timeout_secs() -> u64 {
    300
}

fn default_databases() -> Vec<DatabaseKind> {
    DatabaseKind::ALL.to_vec()
}

fn default_container_registry() -> String {
    "inductiveautomation/ignition".to_string()
}

fn default_probe_delay_ms() -> u64 {
    50
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            target_versions: default_target_versions(),
            parallel_tests: default_parallel_tests(),
            test_timeout_secs: default_test_timeout_secs(),
            databases: default_databases(),
            container_registry: default_container_registry(),
            probe_delay_ms: default_probe_delay_ms(),
        }
    }
}

impl CompatibilityConfig {
    pub fn with_versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_versions = versions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parallel_tests(mut self, parallel_tests: usize) -> Self {
        self.parallel_tests = parallel_tests;
        self
    }

    pub fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }

    /// Parse the target versions, dropping duplicates but keeping order.
    pub fn parsed_versions(&self) -> CompatResult<Vec<Version>> {
        if self.target_versions.is_empty() {
            return Err(CompatError::InvalidInput("no target versions configured".to_string()));
        }

        let mut seen = std::collections::BTreeSet::new();
        let mut versions = Vec::with_capacity(self.target_versions.len());
        for raw in &self.target_versions {
            let version: Version = raw
                .parse()
                .map_err(|e| CompatError::InvalidInput(format!("invalid target version '{}': {}", raw, e)))?;
            if seen.insert(version.to_string()) {
                versions.push(version);
            }
        }
        Ok(versions)
    }

    /// Image reference for a runtime version.
    pub fn image_for(&self, version: &Version) -> String {
        format!("{}:{}", self.container_registry, version)
    }
}
