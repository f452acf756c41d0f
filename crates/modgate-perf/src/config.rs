//! Performance tester configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::ModulePerformanceTester`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// URL of the gateway under test. `None` runs synthetic load only.
    #[serde(default)]
    pub target_url: Option<String>,

    /// Upper bound on simulated users for every profile.
    #[serde(default = "default_max_concurrent_users")]
    pub max_concurrent_users: u32,

    /// Resource sampling interval.
    #[serde(default = "default_monitoring_interval_ms")]
    pub monitoring_interval_ms: u64,

    /// Longest sleep of one load-profile step.
    #[serde(default = "default_max_step_ms")]
    pub max_step_ms: u64,

    /// Requests per user per second handed to the load driver.
    #[serde(default = "default_request_rate")]
    pub request_rate: f64,

    /// Timeout of the target reachability check.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Per-test time budget. Recorded in the report; enforcement is up to the caller.
    #[serde(default = "default_test_timeout_secs")]
    pub test_timeout_secs: u64,
}

fn default_max_concurrent_users() -> u32 {
    100
}

fn default_monitoring_interval_ms() -> u64 {
    1000
}

fn default_max_step_ms() -> u64 {
    1000
}

fn default_request_rate() -> f64 {
    2.0
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

fn default_test_timeout_secs() -> u64 {
    600
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            target_url: None,
            max_concurrent_users: default_max_concurrent_users(),
            monitoring_interval_ms: default_monitoring_interval_ms(),
            max_step_ms: default_max_step_ms(),
            request_rate: default_request_rate(),
            probe_timeout_ms: default_probe_timeout_ms(),
            test_timeout_secs: default_test_timeout_secs(),
        }
    }
}

impl PerformanceConfig {
    pub fn monitoring_interval(&self) -> Duration {
        Duration::from_millis(self.monitoring_interval_ms)
    }

    pub fn max_step(&self) -> Duration {
        Duration::from_millis(self.max_step_ms.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
