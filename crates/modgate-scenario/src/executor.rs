//! Phase executors.
//!
//! Each phase wraps one component behind [`PhaseExecutor`] and maps the
//! component's report onto a [`PhaseResult`].

use std::sync::Arc;

use async_trait::async_trait;
use modgate_compat::{
    CompatibilityConfig, CompatibilityStatus, CompatibilityTester, DatabaseProbeFactory, EnvironmentProbe,
    StaticProbeFactory,
};
use modgate_monitor::ResourceSampler;
use modgate_perf::{LoadDriver, ModulePerformanceTester, PerformanceConfig, PerformanceVerdict, SyntheticLoadDriver};
use modgate_validator::{ModuleValidator, ValidatorConfig};

use crate::context::RunContext;
use crate::error::ScenarioResult;
use crate::phase::{PhaseStatus, TestPhase};
use crate::qa::{ChecksumQaPipeline, QaConfig, QaPipeline};
use crate::result::PhaseResult;
use crate::uat::{CriteriaUatManager, UatManager};

/// Runs one phase of a scenario.
#[async_trait]
pub trait PhaseExecutor: Send + Sync {
    fn phase(&self) -> TestPhase;

    /// Run the phase. `prior` holds the results of phases already finished
    /// in this run.
    async fn execute(&self, ctx: &RunContext, prior: &[PhaseResult]) -> ScenarioResult<PhaseResult>;
}

// ── Validation ──

pub struct ValidationPhase {
    validator: ModuleValidator,
}

impl ValidationPhase {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            validator: ModuleValidator::new(config),
        }
    }
}

#[async_trait]
impl PhaseExecutor for ValidationPhase {
    fn phase(&self) -> TestPhase {
        TestPhase::Validation
    }

    async fn execute(&self, ctx: &RunContext, _prior: &[PhaseResult]) -> ScenarioResult<PhaseResult> {
        let result = self.validator.validate(ctx.module_path()).await;
        let details = serde_json::to_value(&result)?;

        let mut phase = PhaseResult::from_findings(TestPhase::Validation, result.errors, result.warnings);
        if !result.success && phase.status != PhaseStatus::Failed {
            phase.status = PhaseStatus::Failed;
            phase.issues.push("module validation did not succeed".to_string());
        }
        Ok(phase.with_details(details))
    }
}

// ── Quality assurance ──

pub struct QualityAssurancePhase {
    pipeline: Arc<dyn QaPipeline>,
}

impl QualityAssurancePhase {
    pub fn new(pipeline: Arc<dyn QaPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl PhaseExecutor for QualityAssurancePhase {
    fn phase(&self) -> TestPhase {
        TestPhase::QualityAssurance
    }

    async fn execute(&self, ctx: &RunContext, _prior: &[PhaseResult]) -> ScenarioResult<PhaseResult> {
        let report = self.pipeline.run(ctx.module_path(), ctx.workspace()).await?;
        let details = serde_json::to_value(&report)?;
        Ok(PhaseResult::from_findings(TestPhase::QualityAssurance, report.issues, report.warnings).with_details(details))
    }
}

// ── Compatibility ──

pub struct CompatibilityPhase {
    config: CompatibilityConfig,
    environment: Arc<dyn EnvironmentProbe>,
    probes: Arc<dyn DatabaseProbeFactory>,
}

impl CompatibilityPhase {
    pub fn new(config: CompatibilityConfig, environment: Arc<dyn EnvironmentProbe>) -> Self {
        Self {
            config,
            environment,
            probes: Arc::new(StaticProbeFactory),
        }
    }

    pub fn with_probe_factory(mut self, probes: Arc<dyn DatabaseProbeFactory>) -> Self {
        self.probes = probes;
        self
    }
}

/// Phase status for an overall compatibility verdict.
pub fn compatibility_phase_status(status: CompatibilityStatus) -> PhaseStatus {
    match status {
        CompatibilityStatus::Compatible => PhaseStatus::Passed,
        CompatibilityStatus::Partial | CompatibilityStatus::Unknown => PhaseStatus::Warning,
        CompatibilityStatus::Incompatible => PhaseStatus::Failed,
        CompatibilityStatus::Error | CompatibilityStatus::Pending | CompatibilityStatus::Running => PhaseStatus::Error,
    }
}

#[async_trait]
impl PhaseExecutor for CompatibilityPhase {
    fn phase(&self) -> TestPhase {
        TestPhase::Compatibility
    }

    async fn execute(&self, ctx: &RunContext, _prior: &[PhaseResult]) -> ScenarioResult<PhaseResult> {
        let mut tester = CompatibilityTester::new(self.config.clone(), self.environment.clone())
            .with_probe_factory(self.probes.clone());
        tester.initialize_tests(ctx.module_path()).await?;
        let report = tester.run_all_tests().await?;

        let mut phase = PhaseResult::new(TestPhase::Compatibility, compatibility_phase_status(report.overall_status));
        phase.warnings.extend(report.warnings.iter().cloned());
        for test in &report.tests {
            let key = test.key();
            phase
                .issues
                .extend(test.issues.iter().map(|i| format!("{} [{}]: {}", key, test.status(), i)));
            phase
                .warnings
                .extend(test.warnings.iter().map(|w| format!("{}: {}", key, w)));
        }
        Ok(phase.with_details(serde_json::to_value(&report)?))
    }
}

// ── Performance ──

pub struct PerformancePhase {
    config: PerformanceConfig,
    sampler: Arc<dyn ResourceSampler>,
    driver: Arc<dyn LoadDriver>,
}

impl PerformancePhase {
    pub fn new(config: PerformanceConfig, sampler: Arc<dyn ResourceSampler>) -> Self {
        Self {
            config,
            sampler,
            driver: Arc::new(SyntheticLoadDriver::default()),
        }
    }

    pub fn with_driver(mut self, driver: Arc<dyn LoadDriver>) -> Self {
        self.driver = driver;
        self
    }
}

#[async_trait]
impl PhaseExecutor for PerformancePhase {
    fn phase(&self) -> TestPhase {
        TestPhase::Performance
    }

    async fn execute(&self, ctx: &RunContext, _prior: &[PhaseResult]) -> ScenarioResult<PhaseResult> {
        let mut tester =
            ModulePerformanceTester::new(self.config.clone(), self.sampler.clone()).with_driver(self.driver.clone());
        tester.initialize_tests(ctx.module_path()).await?;
        let report = tester.run_all_tests().await?;

        let status = match report.overall_status {
            PerformanceVerdict::Passed => PhaseStatus::Passed,
            PerformanceVerdict::Warning => PhaseStatus::Warning,
            PerformanceVerdict::Failed => PhaseStatus::Failed,
        };
        let mut phase = PhaseResult::new(TestPhase::Performance, status);
        phase.warnings.extend(report.warnings.iter().cloned());
        for test in &report.tests {
            phase
                .issues
                .extend(test.issues.iter().map(|i| format!("{}: {}", test.kind, i)));
            phase
                .warnings
                .extend(test.warnings.iter().map(|w| format!("{}: {}", test.kind, w)));
        }
        Ok(phase.with_details(serde_json::to_value(&report)?))
    }
}

// ── User acceptance ──

pub struct UserAcceptancePhase {
    manager: Arc<dyn UatManager>,
}

impl UserAcceptancePhase {
    pub fn new(manager: Arc<dyn UatManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl PhaseExecutor for UserAcceptancePhase {
    fn phase(&self) -> TestPhase {
        TestPhase::UserAcceptance
    }

    async fn execute(&self, ctx: &RunContext, prior: &[PhaseResult]) -> ScenarioResult<PhaseResult> {
        let report = self.manager.evaluate(ctx, prior).await?;
        let details = serde_json::to_value(&report)?;
        if report.criteria.is_empty() {
            return Ok(PhaseResult::new(TestPhase::UserAcceptance, PhaseStatus::Skipped).with_details(details));
        }
        Ok(PhaseResult::from_findings(TestPhase::UserAcceptance, report.issues, report.warnings).with_details(details))
    }
}

/// Component settings and collaborators behind the default executors.
pub struct ScenarioComponents {
    pub validator: ValidatorConfig,
    pub qa: QaConfig,
    pub compatibility: CompatibilityConfig,
    pub performance: PerformanceConfig,
    pub environment: Arc<dyn EnvironmentProbe>,
    pub sampler: Arc<dyn ResourceSampler>,
    pub driver: Arc<dyn LoadDriver>,
}

impl ScenarioComponents {
    pub fn new(environment: Arc<dyn EnvironmentProbe>, sampler: Arc<dyn ResourceSampler>) -> Self {
        Self {
            validator: ValidatorConfig::default(),
            qa: QaConfig::default(),
            compatibility: CompatibilityConfig::default(),
            performance: PerformanceConfig::default(),
            environment,
            sampler,
            driver: Arc::new(SyntheticLoadDriver::default()),
        }
    }

    /// One executor per phase.
    pub fn into_executors(self) -> Vec<Arc<dyn PhaseExecutor>> {
        vec![
            Arc::new(ValidationPhase::new(self.validator)),
            Arc::new(QualityAssurancePhase::new(Arc::new(ChecksumQaPipeline::new(self.qa)))),
            Arc::new(CompatibilityPhase::new(self.compatibility, self.environment)),
            Arc::new(PerformancePhase::new(self.performance, self.sampler).with_driver(self.driver)),
            Arc::new(UserAcceptancePhase::new(Arc::new(CriteriaUatManager::default()))),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_verdicts_map_to_phase_statuses() {
        assert_eq!(compatibility_phase_status(CompatibilityStatus::Compatible), PhaseStatus::Passed);
        assert_eq!(compatibility_phase_status(CompatibilityStatus::Partial), PhaseStatus::Warning);
        assert_eq!(compatibility_phase_status(CompatibilityStatus::Unknown), PhaseStatus::Warning);
        assert_eq!(compatibility_phase_status(CompatibilityStatus::Incompatible), PhaseStatus::Failed);
        assert_eq!(compatibility_phase_status(CompatibilityStatus::Error), PhaseStatus::Error);
    }
}
