//! Scenario orchestration for modgate.
//!
//! A scenario takes one module package through the phases of a test suite
//! (validation, quality assurance, compatibility, performance, user
//! acceptance) and folds their results into a single deployment verdict.

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod phase;
pub mod qa;
pub mod report;
pub mod result;
pub mod runner;
pub mod status;
pub mod uat;

pub use config::ScenarioConfig;
pub use context::RunContext;
pub use error::{ScenarioError, ScenarioResult};
pub use executor::{
    compatibility_phase_status, CompatibilityPhase, PerformancePhase, PhaseExecutor, QualityAssurancePhase,
    ScenarioComponents, UserAcceptancePhase, ValidationPhase,
};
pub use phase::{PhaseStatus, TestPhase, TestSuite};
pub use qa::{ChecksumQaPipeline, QaConfig, QaPipeline, QaReport};
pub use report::{PhaseSummary, ScenarioReport};
pub use result::PhaseResult;
pub use runner::TestScenarioRunner;
pub use status::{reduce_phase_statuses, PHASE_STATUS_PRECEDENCE};
pub use uat::{AcceptanceCriterion, CriteriaUatManager, CriterionOutcome, CriterionResult, UatManager, UatReport};
