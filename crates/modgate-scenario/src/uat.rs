//! User-acceptance evaluation.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::RunContext;
use crate::error::ScenarioResult;
use crate::phase::{PhaseStatus, TestPhase};
use crate::result::PhaseResult;

/// A condition the run must satisfy before the module is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceCriterion {
    ModuleValidated,
    QualityChecked,
    RuntimeCompatible,
    PerformanceWithinBudget,
}

impl AcceptanceCriterion {
    /// Phase whose result decides the criterion.
    pub fn phase(&self) -> TestPhase {
        match self {
            AcceptanceCriterion::ModuleValidated => TestPhase::Validation,
            AcceptanceCriterion::QualityChecked => TestPhase::QualityAssurance,
            AcceptanceCriterion::RuntimeCompatible => TestPhase::Compatibility,
            AcceptanceCriterion::PerformanceWithinBudget => TestPhase::Performance,
        }
    }
}

impl fmt::Display for AcceptanceCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceptanceCriterion::ModuleValidated => write!(f, "module validated"),
            AcceptanceCriterion::QualityChecked => write!(f, "quality checked"),
            AcceptanceCriterion::RuntimeCompatible => write!(f, "runtime compatible"),
            AcceptanceCriterion::PerformanceWithinBudget => write!(f, "performance within budget"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionOutcome {
    Met,
    NotMet,
    NotEvaluated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionResult {
    pub criterion: AcceptanceCriterion,
    pub required: bool,
    pub outcome: CriterionOutcome,
    pub phase_status: Option<PhaseStatus>,
}

/// Verdict of a UAT evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UatReport {
    pub criteria: Vec<CriterionResult>,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl UatReport {
    pub fn accepted(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Decides acceptance from what the run has produced so far.
#[async_trait]
pub trait UatManager: Send + Sync {
    async fn evaluate(&self, ctx: &RunContext, prior: &[PhaseResult]) -> ScenarioResult<UatReport>;
}

/// Checks a fixed list of criteria against earlier phase results.
#[derive(Debug, Clone)]
pub struct CriteriaUatManager {
    criteria: Vec<(AcceptanceCriterion, bool)>,
}

impl Default for CriteriaUatManager {
    fn default() -> Self {
        Self {
            criteria: vec![
                (AcceptanceCriterion::ModuleValidated, true),
                (AcceptanceCriterion::QualityChecked, false),
                (AcceptanceCriterion::RuntimeCompatible, true),
                (AcceptanceCriterion::PerformanceWithinBudget, true),
            ],
        }
    }
}

impl CriteriaUatManager {
    /// `(criterion, required)` pairs.
    pub fn new(criteria: Vec<(AcceptanceCriterion, bool)>) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &[(AcceptanceCriterion, bool)] {
        &self.criteria
    }

    pub fn judge(&self, prior: &[PhaseResult]) -> UatReport {
        let mut report = UatReport::default();

        for (criterion, required) in &self.criteria {
            let phase_status = prior
                .iter()
                .find(|r| r.phase == criterion.phase())
                .map(|r| r.status);
            let outcome = match phase_status {
                Some(PhaseStatus::Passed | PhaseStatus::Warning) => CriterionOutcome::Met,
                Some(PhaseStatus::Failed | PhaseStatus::Error) => CriterionOutcome::NotMet,
                Some(PhaseStatus::Skipped) | None => CriterionOutcome::NotEvaluated,
            };

            match (outcome, required) {
                (CriterionOutcome::NotMet, true) => report
                    .issues
                    .push(format!("Required criterion '{}' not met", criterion)),
                (CriterionOutcome::NotMet, false) => report
                    .warnings
                    .push(format!("Optional criterion '{}' not met", criterion)),
                (CriterionOutcome::NotEvaluated, _) => report.warnings.push(format!(
                    "Criterion '{}' not evaluated: the {} phase did not run",
                    criterion,
                    criterion.phase()
                )),
                (CriterionOutcome::Met, _) => {}
            }

            report.criteria.push(CriterionResult {
                criterion: *criterion,
                required: *required,
                outcome,
                phase_status,
            });
        }

        report
    }
}

#[async_trait]
impl UatManager for CriteriaUatManager {
    async fn evaluate(&self, _ctx: &RunContext, prior: &[PhaseResult]) -> ScenarioResult<UatReport> {
        Ok(self.judge(prior))
    }
}
