//! Scenario configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ScenarioError, ScenarioResult};
use crate::phase::{TestPhase, TestSuite};

/// How a scenario runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub suite: TestSuite,

    /// Phases for the `custom` suite.
    #[serde(default)]
    pub phases: Vec<TestPhase>,

    /// Run validation and QA concurrently.
    #[serde(default)]
    pub parallel: bool,

    /// Stop after the first failed phase.
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,

    /// Scenario time budget, shared by all phases of a run.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_fail_fast() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    3600
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            suite: TestSuite::default(),
            phases: Vec::new(),
            parallel: false,
            fail_fast: default_fail_fast(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ScenarioConfig {
    pub fn for_suite(suite: TestSuite) -> Self {
        Self {
            suite,
            ..Self::default()
        }
    }

    pub fn custom(phases: Vec<TestPhase>) -> Self {
        Self {
            suite: TestSuite::Custom,
            phases,
            ..Self::default()
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Enabled phases in declaration order, without duplicates.
    pub fn enabled_phases(&self) -> ScenarioResult<Vec<TestPhase>> {
        let mut phases = match self.suite {
            TestSuite::Custom => self.phases.clone(),
            suite => suite.default_phases(),
        };
        if phases.is_empty() {
            return Err(ScenarioError::InvalidInput(
                "custom suite needs at least one phase".to_string(),
            ));
        }
        phases.sort();
        phases.dedup();
        Ok(phases)
    }
}
