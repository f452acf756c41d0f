//! Validator configuration.

use std::time::Duration;

use modgate_types::MODULE_EXTENSION;
use serde::{Deserialize, Serialize};

/// Configuration for structural module validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Expected file extension, without the dot.
    #[serde(default = "default_extension")]
    pub module_extension: String,

    /// Largest accepted module size in megabytes.
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,

    /// Lowest runtime major version the module is expected to support.
    #[serde(default = "default_min_runtime_major")]
    pub min_runtime_major: u32,

    /// Budget for reading and digesting the module before a warning is raised.
    #[serde(default = "default_read_budget_ms")]
    pub read_budget_ms: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            module_extension: default_extension(),
            max_size_mb: default_max_size_mb(),
            min_runtime_major: default_min_runtime_major(),
            read_budget_ms: default_read_budget_ms(),
        }
    }
}

impl ValidatorConfig {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }

    pub fn read_budget(&self) -> Duration {
        Duration::from_millis(self.read_budget_ms)
    }
}

fn default_extension() -> String {
    MODULE_EXTENSION.to_string()
}

fn default_max_size_mb() -> u64 {
    100
}

fn default_min_runtime_major() -> u32 {
    8
}

fn default_read_budget_ms() -> u64 {
    2_000
}
