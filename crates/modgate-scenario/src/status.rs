//! Overall scenario status.

use crate::phase::PhaseStatus;

/// Phase statuses from best to worst. The overall status is driven by the
/// worst status present.
pub const PHASE_STATUS_PRECEDENCE: [PhaseStatus; 5] = [
    PhaseStatus::Passed,
    PhaseStatus::Skipped,
    PhaseStatus::Warning,
    PhaseStatus::Failed,
    PhaseStatus::Error,
];

/// Reduce phase statuses to the scenario status.
///
/// `error` and `failed` pass through; `skipped` and `warning` become
/// `warning`; all-passed becomes `warning` when fewer than `enabled` phases
/// ran.
pub fn reduce_phase_statuses(statuses: &[PhaseStatus], enabled: usize) -> PhaseStatus {
    let worst = statuses.iter().copied().max().unwrap_or(PhaseStatus::Passed);
    match worst {
        PhaseStatus::Error | PhaseStatus::Failed => worst,
        PhaseStatus::Warning | PhaseStatus::Skipped => PhaseStatus::Warning,
        PhaseStatus::Passed if statuses.len() < enabled => PhaseStatus::Warning,
        PhaseStatus::Passed => PhaseStatus::Passed,
    }
}
