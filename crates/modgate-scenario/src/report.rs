//! Unified scenario report.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use modgate_types::{export_report, ExportResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::{PhaseStatus, TestPhase, TestSuite};
use crate::result::PhaseResult;
use crate::status::reduce_phase_statuses;

/// One line of the per-phase table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub phase: TestPhase,
    pub status: PhaseStatus,
    pub duration_ms: u64,
    pub issue_count: usize,
    pub warning_count: usize,
}

impl From<&PhaseResult> for PhaseSummary {
    fn from(result: &PhaseResult) -> Self {
        Self {
            phase: result.phase,
            status: result.status,
            duration_ms: result.duration_ms,
            issue_count: result.issues.len(),
            warning_count: result.warnings.len(),
        }
    }
}

/// Verdict of a full scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub run_id: Uuid,
    pub module_path: PathBuf,
    pub suite: TestSuite,
    pub parallel: bool,
    pub fail_fast: bool,
    pub overall_status: PhaseStatus,
    pub enabled_phases: Vec<TestPhase>,
    pub executed_phases: Vec<TestPhase>,
    pub phases: Vec<PhaseResult>,
    pub summaries: Vec<PhaseSummary>,
    /// Passed phases as a percentage of executed phases.
    pub success_rate: f64,
    pub recommendations: Vec<String>,
    pub timeout_secs: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

pub(crate) struct ReportInput {
    pub run_id: Uuid,
    pub module_path: PathBuf,
    pub suite: TestSuite,
    pub parallel: bool,
    pub fail_fast: bool,
    pub timeout_secs: u64,
    pub enabled_phases: Vec<TestPhase>,
    pub phases: Vec<PhaseResult>,
    pub started_at: DateTime<Utc>,
}

impl From<ReportInput> for ScenarioReport {
    fn from(input: ReportInput) -> Self {
        let mut phases = input.phases;
        phases.sort_by_key(|r| r.phase);

        let statuses: Vec<PhaseStatus> = phases.iter().map(|r| r.status).collect();
        let overall_status = reduce_phase_statuses(&statuses, input.enabled_phases.len());
        let passed = statuses.iter().filter(|s| **s == PhaseStatus::Passed).count();
        let success_rate = if phases.is_empty() {
            0.0
        } else {
            passed as f64 / phases.len() as f64 * 100.0
        };

        let executed_phases: Vec<TestPhase> = phases.iter().map(|r| r.phase).collect();
        let recommendations = recommendations(&phases, &input.enabled_phases);
        let summaries = phases.iter().map(PhaseSummary::from).collect();

        let completed_at = Utc::now();
        let duration_ms = (completed_at - input.started_at).num_milliseconds().max(0) as u64;

        Self {
            run_id: input.run_id,
            module_path: input.module_path,
            suite: input.suite,
            parallel: input.parallel,
            fail_fast: input.fail_fast,
            overall_status,
            enabled_phases: input.enabled_phases,
            executed_phases,
            phases,
            summaries,
            success_rate,
            recommendations,
            timeout_secs: input.timeout_secs,
            started_at: input.started_at,
            completed_at,
            duration_ms,
        }
    }
}

impl ScenarioReport {
    pub fn phase(&self, phase: TestPhase) -> Option<&PhaseResult> {
        self.phases.iter().find(|r| r.phase == phase)
    }

    pub fn status_of(&self, phase: TestPhase) -> Option<PhaseStatus> {
        self.phase(phase).map(|r| r.status)
    }

    /// Serialize to JSON, also writing it to `path` when one is given.
    pub fn export_report(&self, path: Option<&Path>) -> ExportResult<serde_json::Value> {
        export_report(self, path)
    }
}

/// Guidance ordered by urgency: earlier phases gate later ones.
fn recommendations(phases: &[PhaseResult], enabled: &[TestPhase]) -> Vec<String> {
    let status = |phase: TestPhase| phases.iter().find(|r| r.phase == phase).map(|r| r.status);
    let mut out = Vec::new();

    if status(TestPhase::Validation) == Some(PhaseStatus::Failed) {
        out.push("URGENT: fix module validation errors before any further testing".to_string());
    }
    if status(TestPhase::QualityAssurance) == Some(PhaseStatus::Failed) {
        out.push("Resolve quality assurance findings before release".to_string());
    }
    match status(TestPhase::Compatibility) {
        Some(PhaseStatus::Failed) => out.push(
            "Module is incompatible with at least one target runtime; restrict the supported versions or fix the incompatibility"
                .to_string(),
        ),
        Some(PhaseStatus::Warning) => out.push(
            "Compatibility is partial or unconfirmed for some targets; review the compatibility matrix".to_string(),
        ),
        _ => {}
    }
    match status(TestPhase::Performance) {
        Some(PhaseStatus::Failed) => {
            out.push("Performance limits were exceeded; optimize the module before deployment".to_string())
        }
        Some(PhaseStatus::Warning) => {
            out.push("Performance is near its limits; monitor resource usage after deployment".to_string())
        }
        _ => {}
    }
    if status(TestPhase::UserAcceptance) == Some(PhaseStatus::Failed) {
        out.push("User acceptance criteria were not met; the module is not ready for deployment".to_string());
    }

    let errored: Vec<String> = phases
        .iter()
        .filter(|r| r.status == PhaseStatus::Error)
        .map(|r| r.phase.to_string())
        .collect();
    if !errored.is_empty() {
        out.push(format!(
            "Phase(s) {} did not complete; check the test environment and rerun",
            errored.join(", ")
        ));
    }

    let not_run: Vec<String> = enabled
        .iter()
        .filter(|p| status(**p).is_none())
        .map(|p| p.to_string())
        .collect();
    if !not_run.is_empty() {
        out.push(format!(
            "Phase(s) {} were not run; rerun without fail-fast for a complete assessment",
            not_run.join(", ")
        ));
    }

    if out.is_empty() && phases.iter().all(|r| r.status == PhaseStatus::Passed) {
        out.push("All phases passed; the module is ready for deployment".to_string());
    }
    out
}
