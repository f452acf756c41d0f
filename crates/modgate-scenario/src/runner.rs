//! Scenario runner.
//!
//! Drives the enabled phases of a suite through their executors and folds
//! the phase results into one [`ScenarioReport`]. Every phase runs on its own
//! task; an executor error or panic becomes an `error` phase result.
//!
//! The scenario timeout is one deadline shared by all phases. A phase still
//! running at the deadline is aborted and reported as `error`; phases not yet
//! started are reported as `skipped`. A run always ends with a report.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use modgate_types::classify_error;
use tokio::time::Instant as Deadline;
use tracing::{info, instrument, warn};

use crate::config::ScenarioConfig;
use crate::context::RunContext;
use crate::error::{ScenarioError, ScenarioResult};
use crate::executor::{PhaseExecutor, ScenarioComponents};
use crate::phase::{PhaseStatus, TestPhase};
use crate::report::{ReportInput, ScenarioReport};
use crate::result::PhaseResult;

pub struct TestScenarioRunner {
    config: ScenarioConfig,
    executors: BTreeMap<TestPhase, Arc<dyn PhaseExecutor>>,
}

impl TestScenarioRunner {
    /// Runner with no executors registered.
    pub fn new(config: ScenarioConfig) -> Self {
        Self {
            config,
            executors: BTreeMap::new(),
        }
    }

    /// Runner with the standard executor for every phase.
    pub fn with_components(config: ScenarioConfig, components: ScenarioComponents) -> Self {
        components
            .into_executors()
            .into_iter()
            .fold(Self::new(config), |runner, executor| runner.with_executor(executor))
    }

    /// Register `executor` for its phase, replacing any previous one.
    pub fn with_executor(mut self, executor: Arc<dyn PhaseExecutor>) -> Self {
        self.executors.insert(executor.phase(), executor);
        self
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    #[instrument(skip(self), fields(module = %module_path.display(), suite = %self.config.suite))]
    pub async fn run(&self, module_path: &Path) -> ScenarioResult<ScenarioReport> {
        let enabled = self.config.enabled_phases()?;
        if let Some(missing) = enabled.iter().find(|p| !self.executors.contains_key(p)) {
            return Err(ScenarioError::InvalidInput(format!(
                "no executor registered for the {} phase",
                missing
            )));
        }

        let ctx = Arc::new(RunContext::new(module_path)?);
        let started_at = Utc::now();
        let deadline = Deadline::now() + self.config.timeout();
        info!(
            run_id = %ctx.run_id(),
            phases = enabled.len(),
            parallel = self.config.parallel,
            fail_fast = self.config.fail_fast,
            timeout_secs = self.config.timeout_secs,
            "Scenario started"
        );

        let phases = if self.config.parallel {
            self.run_parallel(&enabled, &ctx, deadline).await
        } else {
            self.run_sequential(&enabled, &ctx, deadline, Vec::new()).await
        };

        let report = ScenarioReport::from(ReportInput {
            run_id: ctx.run_id(),
            module_path: ctx.module_path().to_path_buf(),
            suite: self.config.suite,
            parallel: self.config.parallel,
            fail_fast: self.config.fail_fast,
            timeout_secs: self.config.timeout_secs,
            enabled_phases: enabled,
            phases,
            started_at,
        });

        match Arc::try_unwrap(ctx) {
            Ok(ctx) => ctx.release(),
            Err(_) => warn!(run_id = %report.run_id, "Run context still shared; workspace released on drop"),
        }

        info!(
            run_id = %report.run_id,
            overall = %report.overall_status,
            executed = report.executed_phases.len(),
            success_rate = report.success_rate,
            duration_ms = report.duration_ms,
            "Scenario complete"
        );
        Ok(report)
    }

    async fn run_sequential(
        &self,
        phases: &[TestPhase],
        ctx: &Arc<RunContext>,
        deadline: Deadline,
        mut results: Vec<PhaseResult>,
    ) -> Vec<PhaseResult> {
        for phase in phases {
            let result = self.run_phase(*phase, ctx, deadline, &results).await;
            let failed = result.is_failed();
            results.push(result);
            if failed && self.config.fail_fast {
                info!(phase = %phase, "Phase failed; stopping (fail-fast)");
                break;
            }
        }
        results
    }

    async fn run_parallel(&self, phases: &[TestPhase], ctx: &Arc<RunContext>, deadline: Deadline) -> Vec<PhaseResult> {
        let (independent, dependent): (Vec<TestPhase>, Vec<TestPhase>) =
            phases.iter().partition(|p| p.is_independent());

        let results: Vec<PhaseResult> =
            join_all(independent.iter().map(|phase| self.run_phase(*phase, ctx, deadline, &[]))).await;

        if self.config.fail_fast && results.iter().any(PhaseResult::is_failed) {
            info!(skipped = dependent.len(), "Independent phase failed; skipping dependent phases (fail-fast)");
            return results;
        }
        self.run_sequential(&dependent, ctx, deadline, results).await
    }

    async fn run_phase(
        &self,
        phase: TestPhase,
        ctx: &Arc<RunContext>,
        deadline: Deadline,
        prior: &[PhaseResult],
    ) -> PhaseResult {
        let Some(executor) = self.executors.get(&phase).cloned() else {
            return PhaseResult::error(phase, format!("no executor registered for the {} phase", phase));
        };
        if Deadline::now() >= deadline {
            warn!(phase = %phase, timeout_secs = self.config.timeout_secs, "Scenario timeout elapsed; phase not started");
            let mut result = PhaseResult::new(phase, PhaseStatus::Skipped);
            result.issues.push(format!(
                "{} phase was not started: the {}s scenario timeout had elapsed",
                phase, self.config.timeout_secs
            ));
            return result;
        }

        info!(phase = %phase, "Phase started");
        let started_at = Utc::now();
        let start = Instant::now();

        let task_ctx = ctx.clone();
        let prior = prior.to_vec();
        let mut handle = tokio::spawn(async move { executor.execute(&task_ctx, &prior).await });

        let context = format!("{} phase", phase);
        let mut result = match tokio::time::timeout_at(deadline, &mut handle).await {
            Err(_) => {
                handle.abort();
                warn!(phase = %phase, timeout_secs = self.config.timeout_secs, "Phase aborted at scenario timeout");
                PhaseResult::error(
                    phase,
                    classify_error(
                        &context,
                        &format!("no result within the {}s scenario timeout", self.config.timeout_secs),
                    ),
                )
            }
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => {
                warn!(phase = %phase, error = %e, "Phase errored");
                PhaseResult::error(phase, classify_error(&context, &e.to_string()))
            }
            Ok(Err(e)) => {
                warn!(phase = %phase, error = %e, "Phase task failed");
                PhaseResult::error(phase, classify_error(&context, &e.to_string()))
            }
        };
        result.phase = phase;
        result.started_at = started_at;
        result.completed_at = Utc::now();
        result.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            phase = %phase,
            status = %result.status,
            issues = result.issues.len(),
            warnings = result.warnings.len(),
            duration_ms = result.duration_ms,
            "Phase complete"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::{PhaseStatus, TestSuite};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Gauge {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    enum Behavior {
        Status(PhaseStatus),
        Fail,
        Panic,
    }

    struct FakePhase {
        phase: TestPhase,
        behavior: Behavior,
        delay: Duration,
        gauge: Arc<Gauge>,
        seen_prior: Arc<AtomicUsize>,
    }

    impl FakePhase {
        fn new(phase: TestPhase, behavior: Behavior) -> Self {
            Self {
                phase,
                behavior,
                delay: Duration::from_millis(100),
                gauge: Arc::new(Gauge::default()),
                seen_prior: Arc::new(AtomicUsize::new(usize::MAX)),
            }
        }

        fn with_gauge(mut self, gauge: Arc<Gauge>) -> Self {
            self.gauge = gauge;
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl PhaseExecutor for FakePhase {
        fn phase(&self) -> TestPhase {
            self.phase
        }

        async fn execute(&self, _ctx: &RunContext, prior: &[PhaseResult]) -> ScenarioResult<PhaseResult> {
            self.seen_prior.store(prior.len(), Ordering::SeqCst);
            let now = self.gauge.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.gauge.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.gauge.running.fetch_sub(1, Ordering::SeqCst);

            match self.behavior {
                Behavior::Status(status) => Ok(PhaseResult::new(self.phase, status)),
                Behavior::Fail => Err(ScenarioError::Workspace("connection refused by remote host".to_string())),
                Behavior::Panic => panic!("executor crashed"),
            }
        }
    }

    fn module() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo.modl");
        std::fs::write(&path, b"PK\x03\x04").unwrap();
        (dir, path)
    }

    fn all_passing(config: ScenarioConfig) -> TestScenarioRunner {
        TestPhase::ALL.iter().fold(TestScenarioRunner::new(config), |r, phase| {
            r.with_executor(Arc::new(FakePhase::new(*phase, Behavior::Status(PhaseStatus::Passed))))
        })
    }

    #[tokio::test(start_paused = true)]
    async fn quick_suite_runs_only_its_phases() {
        let (_dir, path) = module();
        let report = all_passing(ScenarioConfig::for_suite(TestSuite::Quick))
            .run(&path)
            .await
            .unwrap();

        assert_eq!(report.executed_phases, vec![TestPhase::Validation, TestPhase::QualityAssurance]);
        assert_eq!(report.overall_status, PhaseStatus::Passed);
        assert_eq!(report.success_rate, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn comprehensive_suite_runs_everything_in_order() {
        let (_dir, path) = module();
        let report = all_passing(ScenarioConfig::for_suite(TestSuite::Comprehensive))
            .run(&path)
            .await
            .unwrap();

        assert_eq!(report.executed_phases, TestPhase::ALL.to_vec());
        assert_eq!(report.summaries.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn later_phases_see_earlier_results() {
        let (_dir, path) = module();
        let uat = FakePhase::new(TestPhase::UserAcceptance, Behavior::Status(PhaseStatus::Passed));
        let seen = uat.seen_prior.clone();
        let report = all_passing(ScenarioConfig::for_suite(TestSuite::Comprehensive))
            .with_executor(Arc::new(uat))
            .run(&path)
            .await
            .unwrap();

        assert_eq!(report.overall_status, PhaseStatus::Passed);
        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_fail_fast_stops_after_first_failure() {
        let (_dir, path) = module();
        let report = all_passing(ScenarioConfig::for_suite(TestSuite::Standard))
            .with_executor(Arc::new(FakePhase::new(
                TestPhase::QualityAssurance,
                Behavior::Status(PhaseStatus::Failed),
            )))
            .run(&path)
            .await
            .unwrap();

        assert_eq!(report.executed_phases, vec![TestPhase::Validation, TestPhase::QualityAssurance]);
        assert_eq!(report.overall_status, PhaseStatus::Failed);
        assert!(report.recommendations.iter().any(|r| r.contains("were not run")));
    }

    #[tokio::test(start_paused = true)]
    async fn without_fail_fast_every_phase_runs() {
        let (_dir, path) = module();
        let report = all_passing(ScenarioConfig::for_suite(TestSuite::Standard).with_fail_fast(false))
            .with_executor(Arc::new(FakePhase::new(
                TestPhase::Validation,
                Behavior::Status(PhaseStatus::Failed),
            )))
            .run(&path)
            .await
            .unwrap();

        assert_eq!(report.executed_phases.len(), 4);
        assert_eq!(report.overall_status, PhaseStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn warning_phase_does_not_trigger_fail_fast() {
        let (_dir, path) = module();
        let report = all_passing(ScenarioConfig::for_suite(TestSuite::Standard))
            .with_executor(Arc::new(FakePhase::new(
                TestPhase::Validation,
                Behavior::Status(PhaseStatus::Warning),
            )))
            .run(&path)
            .await
            .unwrap();

        assert_eq!(report.executed_phases.len(), 4);
        assert_eq!(report.overall_status, PhaseStatus::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_fail_fast_skips_dependent_phases() {
        let (_dir, path) = module();
        let report = all_passing(ScenarioConfig::for_suite(TestSuite::Comprehensive).with_parallel(true))
            .with_executor(Arc::new(FakePhase::new(
                TestPhase::Validation,
                Behavior::Status(PhaseStatus::Failed),
            )))
            .run(&path)
            .await
            .unwrap();

        assert_eq!(report.executed_phases, vec![TestPhase::Validation, TestPhase::QualityAssurance]);
        assert_eq!(report.overall_status, PhaseStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_mode_overlaps_only_independent_phases() {
        let (_dir, path) = module();
        let independent = Arc::new(Gauge::default());
        let dependent = Arc::new(Gauge::default());

        let mut runner = TestScenarioRunner::new(ScenarioConfig::for_suite(TestSuite::Comprehensive).with_parallel(true));
        for phase in TestPhase::ALL {
            let gauge = if phase.is_independent() { independent.clone() } else { dependent.clone() };
            runner = runner.with_executor(Arc::new(
                FakePhase::new(phase, Behavior::Status(PhaseStatus::Passed)).with_gauge(gauge),
            ));
        }
        let report = runner.run(&path).await.unwrap();

        assert_eq!(report.executed_phases, TestPhase::ALL.to_vec());
        assert_eq!(independent.peak.load(Ordering::SeqCst), 2);
        assert_eq!(dependent.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn executor_error_and_panic_become_error_results() {
        let (_dir, path) = module();
        let report = all_passing(ScenarioConfig::for_suite(TestSuite::Standard))
            .with_executor(Arc::new(FakePhase::new(TestPhase::QualityAssurance, Behavior::Fail)))
            .with_executor(Arc::new(FakePhase::new(TestPhase::Performance, Behavior::Panic)))
            .run(&path)
            .await
            .unwrap();

        assert_eq!(report.executed_phases.len(), 4);
        assert_eq!(report.status_of(TestPhase::QualityAssurance), Some(PhaseStatus::Error));
        assert_eq!(report.status_of(TestPhase::Performance), Some(PhaseStatus::Error));
        assert!(report.phase(TestPhase::QualityAssurance).unwrap().issues[0].contains("could not connect"));
        assert_eq!(report.overall_status, PhaseStatus::Error);
    }

    fn hanging(phase: TestPhase) -> Arc<FakePhase> {
        Arc::new(
            FakePhase::new(phase, Behavior::Status(PhaseStatus::Passed)).with_delay(Duration::from_secs(10 * 3600)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_phase_is_cut_off_at_the_scenario_timeout() {
        let (_dir, path) = module();
        let config = ScenarioConfig {
            timeout_secs: 60,
            ..ScenarioConfig::for_suite(TestSuite::Standard)
        };
        let started = Deadline::now();

        let report = all_passing(config)
            .with_executor(hanging(TestPhase::QualityAssurance))
            .run(&path)
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61), "{:?}", elapsed);
        assert_eq!(report.executed_phases, TestSuite::Standard.default_phases());
        assert_eq!(report.status_of(TestPhase::Validation), Some(PhaseStatus::Passed));
        assert_eq!(report.status_of(TestPhase::QualityAssurance), Some(PhaseStatus::Error));
        assert!(report.phase(TestPhase::QualityAssurance).unwrap().issues[0]
            .starts_with("quality_assurance phase timed out"));
        for phase in [TestPhase::Compatibility, TestPhase::Performance] {
            let result = report.phase(phase).unwrap();
            assert_eq!(result.status, PhaseStatus::Skipped);
            assert!(result.issues[0].contains("60s scenario timeout had elapsed"));
        }
        assert_eq!(report.overall_status, PhaseStatus::Error);
        assert!(report.recommendations.iter().any(|r| r.contains("did not complete")));
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_run_still_reports_after_the_timeout() {
        let (_dir, path) = module();
        let config = ScenarioConfig {
            timeout_secs: 5,
            ..ScenarioConfig::for_suite(TestSuite::Comprehensive).with_parallel(true)
        };

        let report = all_passing(config)
            .with_executor(hanging(TestPhase::Validation))
            .run(&path)
            .await
            .unwrap();

        assert_eq!(report.executed_phases, TestPhase::ALL.to_vec());
        assert_eq!(report.status_of(TestPhase::Validation), Some(PhaseStatus::Error));
        assert_eq!(report.status_of(TestPhase::QualityAssurance), Some(PhaseStatus::Passed));
        for phase in [TestPhase::Compatibility, TestPhase::Performance, TestPhase::UserAcceptance] {
            assert_eq!(report.status_of(phase), Some(PhaseStatus::Skipped));
        }
        assert_eq!(report.overall_status, PhaseStatus::Error);
    }

    #[tokio::test]
    async fn missing_executor_or_module_is_invalid_input() {
        let (_dir, path) = module();
        let err = TestScenarioRunner::new(ScenarioConfig::default()).run(&path).await.unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidInput(_)));

        let err = all_passing(ScenarioConfig::default())
            .run(Path::new("/no/such/module.modl"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidInput(_)));

        let err = all_passing(ScenarioConfig::custom(Vec::new())).run(&path).await.unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidInput(_)));
    }
}
