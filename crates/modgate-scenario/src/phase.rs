//! Phases, suites and phase statuses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One stage of a test scenario. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPhase {
    Validation,
    QualityAssurance,
    Compatibility,
    Performance,
    UserAcceptance,
}

impl TestPhase {
    pub const ALL: [TestPhase; 5] = [
        TestPhase::Validation,
        TestPhase::QualityAssurance,
        TestPhase::Compatibility,
        TestPhase::Performance,
        TestPhase::UserAcceptance,
    ];

    /// Phases that touch no shared host or module state and may run together.
    pub fn is_independent(&self) -> bool {
        matches!(self, TestPhase::Validation | TestPhase::QualityAssurance)
    }
}

impl fmt::Display for TestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestPhase::Validation => "validation",
            TestPhase::QualityAssurance => "quality_assurance",
            TestPhase::Compatibility => "compatibility",
            TestPhase::Performance => "performance",
            TestPhase::UserAcceptance => "user_acceptance",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TestPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "validation" => Ok(TestPhase::Validation),
            "quality_assurance" | "qa" => Ok(TestPhase::QualityAssurance),
            "compatibility" | "compat" => Ok(TestPhase::Compatibility),
            "performance" | "perf" => Ok(TestPhase::Performance),
            "user_acceptance" | "uat" => Ok(TestPhase::UserAcceptance),
            other => Err(format!("unknown phase: {}", other)),
        }
    }
}

/// Named phase selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSuite {
    Quick,
    #[default]
    Standard,
    Comprehensive,
    /// Phases listed explicitly in the scenario configuration.
    Custom,
}

impl TestSuite {
    /// Phases the suite enables. `Custom` has none of its own.
    pub fn default_phases(&self) -> Vec<TestPhase> {
        match self {
            TestSuite::Quick => vec![TestPhase::Validation, TestPhase::QualityAssurance],
            TestSuite::Standard => vec![
                TestPhase::Validation,
                TestPhase::QualityAssurance,
                TestPhase::Compatibility,
                TestPhase::Performance,
            ],
            TestSuite::Comprehensive => TestPhase::ALL.to_vec(),
            TestSuite::Custom => Vec::new(),
        }
    }
}

impl fmt::Display for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestSuite::Quick => write!(f, "quick"),
            TestSuite::Standard => write!(f, "standard"),
            TestSuite::Comprehensive => write!(f, "comprehensive"),
            TestSuite::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for TestSuite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quick" => Ok(TestSuite::Quick),
            "standard" => Ok(TestSuite::Standard),
            "comprehensive" => Ok(TestSuite::Comprehensive),
            "custom" => Ok(TestSuite::Custom),
            other => Err(format!("unknown suite: {}", other)),
        }
    }
}

/// Outcome of one phase, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Passed,
    Skipped,
    Warning,
    Failed,
    Error,
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhaseStatus::Passed => "passed",
            PhaseStatus::Skipped => "skipped",
            PhaseStatus::Warning => "warning",
            PhaseStatus::Failed => "failed",
            PhaseStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}
