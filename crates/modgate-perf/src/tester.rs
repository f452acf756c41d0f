//! Module performance tester.
//!
//! Runs baseline, load, stress and spike one after another. Each test gets
//! its own [`SystemMonitor`], started before the profile walk and cancelled
//! as soon as the walk ends, whatever the outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use modgate_monitor::{ResourceSampler, ResourceSummary, SystemMonitor};
use modgate_types::classify_error;
use tracing::{debug, info, instrument, warn};

use crate::case::{LoadStats, PerformanceStatus, PerformanceSummary, PerformanceTest};
use crate::config::PerformanceConfig;
use crate::error::{PerfError, PerfResult};
use crate::load::{LoadDriver, LoadProfile, LoadRequest, SyntheticLoadDriver};
use crate::report::{BaselineComparison, PerformanceReport};
use crate::suite::PerformanceTestKind;
use crate::target::{HttpTargetProbe, TargetProbe};

/// Walk ramp-up, hold and ramp-down, handing every step to `driver`.
///
/// Each step lasts at least its planned length on the tokio clock, so a
/// driver that returns early still leaves the monitor time to sample.
pub async fn walk_profile(profile: &LoadProfile, driver: &dyn LoadDriver, max_step: Duration) -> PerfResult<LoadStats> {
    let mut stats = LoadStats::default();

    for (phase, duration) in profile.phases() {
        if duration.is_zero() {
            continue;
        }
        let step = (duration / 10).clamp(Duration::from_millis(1), max_step.max(Duration::from_millis(1)));

        let mut elapsed = Duration::ZERO;
        while elapsed < duration {
            let users = profile.users_at(phase, elapsed, duration);
            let this_step = step.min(duration - elapsed);
            let step_started = tokio::time::Instant::now();
            let outcome = driver
                .drive(LoadRequest {
                    phase,
                    users,
                    request_rate: profile.request_rate,
                    step: this_step,
                })
                .await?;
            tokio::time::sleep_until(step_started + this_step).await;
            stats.record(users, &outcome);
            elapsed += this_step;
        }
    }

    Ok(stats)
}

/// Runs the fixed load suite against a module.
pub struct ModulePerformanceTester {
    config: PerformanceConfig,
    sampler: Arc<dyn ResourceSampler>,
    driver: Arc<dyn LoadDriver>,
    target_probe: Option<Arc<dyn TargetProbe>>,
    module_path: Option<PathBuf>,
    tests: Vec<PerformanceTest>,
}

impl ModulePerformanceTester {
    pub fn new(config: PerformanceConfig, sampler: Arc<dyn ResourceSampler>) -> Self {
        Self {
            config,
            sampler,
            driver: Arc::new(SyntheticLoadDriver::default()),
            target_probe: None,
            module_path: None,
            tests: Vec::new(),
        }
    }

    pub fn with_driver(mut self, driver: Arc<dyn LoadDriver>) -> Self {
        self.driver = driver;
        self
    }

    /// Replace the HTTP reachability check used when a target URL is set.
    pub fn with_target_probe(mut self, probe: Arc<dyn TargetProbe>) -> Self {
        self.target_probe = Some(probe);
        self
    }

    pub fn config(&self) -> &PerformanceConfig {
        &self.config
    }

    pub fn tests(&self) -> &[PerformanceTest] {
        &self.tests
    }

    /// Build the four-test suite. Returns the number of tests.
    #[instrument(skip(self), fields(module = %module_path.display()))]
    pub async fn initialize_tests(&mut self, module_path: &Path) -> PerfResult<usize> {
        if !module_path.is_file() {
            return Err(PerfError::InvalidInput(format!(
                "module path {} does not exist or is not a file",
                module_path.display()
            )));
        }
        if self.config.max_concurrent_users == 0 {
            return Err(PerfError::InvalidInput("max_concurrent_users must be at least 1".to_string()));
        }

        self.module_path = Some(module_path.to_path_buf());
        self.tests = PerformanceTestKind::ORDER
            .iter()
            .map(|kind| {
                let profile = kind
                    .profile(self.config.request_rate)
                    .capped(self.config.max_concurrent_users);
                PerformanceTest::new(*kind, profile, self.config.test_timeout_secs)
            })
            .collect();

        info!(
            tests = self.tests.len(),
            max_users = self.config.max_concurrent_users,
            "Performance suite initialized"
        );
        Ok(self.tests.len())
    }

    /// Run the suite strictly in order and build the report.
    #[instrument(skip(self))]
    pub async fn run_all_tests(&mut self) -> PerfResult<PerformanceReport> {
        let Some(module_path) = self.module_path.clone() else {
            return Err(PerfError::NotInitialized);
        };
        let started_at = Utc::now();

        let mut warnings = Vec::new();
        if let Some(url) = self.config.target_url.clone() {
            if let Err(e) = self.check_target(&url).await {
                warn!(url = %url, error = %e, "Performance target unreachable; using synthetic load");
                warnings.push(format!("{}; continuing with synthetic load", e));
            }
        }

        let mut baseline: Option<PerformanceSummary> = None;
        let mut comparison = None;
        let pending = std::mem::take(&mut self.tests);
        let mut finished = Vec::with_capacity(pending.len());

        for test in pending {
            let kind = test.kind;
            let test = self.run_test(test).await;

            match kind {
                PerformanceTestKind::Baseline if test.status == PerformanceStatus::Completed => {
                    baseline = test.summary;
                }
                PerformanceTestKind::Stress => {
                    comparison = match (&baseline, &test.summary) {
                        (Some(b), Some(s)) => Some(BaselineComparison::between(b, s)),
                        _ => None,
                    };
                }
                _ => {}
            }
            finished.push(test);
        }

        let report = PerformanceReport::build(
            module_path,
            finished.clone(),
            comparison,
            warnings,
            self.config.test_timeout_secs,
            started_at,
        );
        self.tests = finished;

        info!(
            overall = %report.overall_status,
            issues = report.issue_count(),
            duration_ms = report.duration_ms,
            "Performance tests complete"
        );
        Ok(report)
    }

    async fn check_target(&self, url: &str) -> PerfResult<()> {
        match &self.target_probe {
            Some(probe) => probe.check(url).await,
            None => HttpTargetProbe::new(self.config.probe_timeout())?.check(url).await,
        }
    }

    /// Run one test on its own task so a panicking driver fails only that test.
    async fn run_test(&self, test: PerformanceTest) -> PerformanceTest {
        let mut fallback = test.clone();
        let sampler = self.sampler.clone();
        let driver = self.driver.clone();
        let interval = self.config.monitoring_interval();
        let max_step = self.config.max_step();

        let handle = tokio::spawn(execute_test(test, sampler, driver, interval, max_step));
        match handle.await {
            Ok(test) => test,
            Err(e) => {
                warn!(test = %fallback.kind, error = %e, "Performance test task failed");
                fallback.status = PerformanceStatus::Failed;
                fallback
                    .issues
                    .push(classify_error(&format!("{} test", fallback.kind), &e.to_string()));
                fallback.completed_at = Some(Utc::now());
                fallback
            }
        }
    }
}

async fn execute_test(
    mut test: PerformanceTest,
    sampler: Arc<dyn ResourceSampler>,
    driver: Arc<dyn LoadDriver>,
    interval: Duration,
    max_step: Duration,
) -> PerformanceTest {
    info!(
        test = %test.kind,
        target_users = test.profile.target_users,
        driver = driver.name(),
        "Performance test started"
    );
    test.status = PerformanceStatus::Running;
    test.started_at = Some(Utc::now());
    let started = Instant::now();

    let mut monitor = SystemMonitor::new(sampler, interval);
    let outcome = match monitor.start() {
        Ok(()) => walk_profile(&test.profile, driver.as_ref(), max_step).await,
        Err(e) => Err(PerfError::from(e)),
    };
    let history = monitor.stop();

    test.duration_ms = started.elapsed().as_millis() as u64;
    test.completed_at = Some(Utc::now());

    match outcome {
        Ok(stats) => {
            test.summary = Some(PerformanceSummary::new(ResourceSummary::from_points(&history), stats));
            if history.is_empty() {
                warn!(test = %test.kind, "No resource samples collected");
                test.issues
                    .push(format!("no resource samples were collected during the {} test", test.kind));
            } else {
                test.evaluate_thresholds();
            }
            test.status = PerformanceStatus::Completed;
        }
        Err(PerfError::Aborted(reason)) => {
            test.issues.push(format!("{} test aborted: {}", test.kind, reason));
            test.status = PerformanceStatus::Aborted;
        }
        Err(e) => {
            test.issues
                .push(classify_error(&format!("{} test", test.kind), &e.to_string()));
            test.status = PerformanceStatus::Failed;
        }
    }
    test.metrics_history = history;

    debug!(
        test = %test.kind,
        status = %test.status,
        samples = test.metrics_history.len(),
        issues = test.issues.len(),
        warnings = test.warnings.len(),
        "Performance test finished"
    );
    test
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::LoadStep;
    use crate::report::PerformanceVerdict;
    use async_trait::async_trait;
    use modgate_monitor::testing::ScriptedSampler;
    use modgate_monitor::{MonitorResult, ResourceSnapshot};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::TempDir;

    fn module() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo.modl");
        std::fs::write(&path, b"PK\x03\x04demo").unwrap();
        (dir, path)
    }

    fn calm_sampler() -> Arc<ScriptedSampler> {
        Arc::new(ScriptedSampler::constant(ResourceSnapshot {
            cpu_percent: 20.0,
            memory_percent: 30.0,
            memory_mb: 1024.0,
            ..Default::default()
        }))
    }

    async fn run_suite(tester: &mut ModulePerformanceTester) -> PerformanceReport {
        let (_dir, path) = module();
        tester.initialize_tests(&path).await.unwrap();
        tester.run_all_tests().await.unwrap()
    }

    #[tokio::test]
    async fn missing_module_is_invalid_input() {
        let mut tester = ModulePerformanceTester::new(PerformanceConfig::default(), calm_sampler());
        let err = tester.initialize_tests(Path::new("/no/such/module.modl")).await.unwrap_err();
        assert!(matches!(err, PerfError::InvalidInput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn suite_runs_in_fixed_order_and_passes_when_calm() {
        let mut tester = ModulePerformanceTester::new(PerformanceConfig::default(), calm_sampler())
            .with_driver(Arc::new(SyntheticLoadDriver::deterministic()));

        let report = run_suite(&mut tester).await;

        let kinds: Vec<PerformanceTestKind> = report.tests.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, PerformanceTestKind::ORDER.to_vec());

        let peaks: Vec<u32> = report
            .tests
            .iter()
            .map(|t| t.summary.unwrap().load.peak_users)
            .collect();
        assert_eq!(peaks, vec![1, 10, 50, 100]);

        // Each test starts after the previous one finished.
        for pair in report.tests.windows(2) {
            assert!(pair[0].completed_at.unwrap() <= pair[1].started_at.unwrap());
        }

        assert_eq!(report.count(PerformanceStatus::Completed), 4);
        assert_eq!(report.overall_status, PerformanceVerdict::Passed);
        assert!(report.tests.iter().all(|t| !t.metrics_history.is_empty()));
        assert_eq!(report.trends[&crate::threshold::Metric::CpuPercent].len(), 4);
        assert!(!report.baseline_comparison.unwrap().exceeds_scalability_limit());
    }

    #[tokio::test(start_paused = true)]
    async fn max_users_caps_every_profile() {
        let config = PerformanceConfig {
            max_concurrent_users: 20,
            ..PerformanceConfig::default()
        };
        let mut tester = ModulePerformanceTester::new(config, calm_sampler())
            .with_driver(Arc::new(SyntheticLoadDriver::deterministic()));

        let report = run_suite(&mut tester).await;

        assert!(report.tests.iter().all(|t| t.summary.unwrap().load.peak_users <= 20));
    }

    /// Sampler whose CPU reading is set by the driver below.
    struct SharedCpu(Arc<AtomicU64>);

    impl ResourceSampler for SharedCpu {
        fn sample(&self) -> MonitorResult<ResourceSnapshot> {
            Ok(ResourceSnapshot {
                cpu_percent: f64::from_bits(self.0.load(Ordering::SeqCst)),
                memory_percent: 30.0,
                ..Default::default()
            })
        }

        fn name(&self) -> &str {
            "shared-cpu"
        }
    }

    /// CPU jumps to 95% whenever more than 20 users are active.
    struct CpuHeavyDriver(Arc<AtomicU64>);

    #[async_trait]
    impl LoadDriver for CpuHeavyDriver {
        async fn drive(&self, request: LoadRequest) -> PerfResult<LoadStep> {
            let cpu: f64 = if request.users > 20 { 95.0 } else { 5.0 };
            self.0.store(cpu.to_bits(), Ordering::SeqCst);
            SyntheticLoadDriver::deterministic().drive(request).await
        }

        fn name(&self) -> &str {
            "cpu-heavy"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stress_cpu_jump_triggers_scalability_recommendation() {
        let cpu = Arc::new(AtomicU64::new(5.0f64.to_bits()));
        let mut tester = ModulePerformanceTester::new(PerformanceConfig::default(), Arc::new(SharedCpu(cpu.clone())))
            .with_driver(Arc::new(CpuHeavyDriver(cpu)));

        let report = run_suite(&mut tester).await;

        let cmp = report.baseline_comparison.unwrap();
        assert!(cmp.cpu_delta > 50.0, "delta was {}", cmp.cpu_delta);
        assert!(report.recommendations.iter().any(|r| r.contains("may not scale")));

        // Spike holds 100 users at 95% CPU, above its 85% maximum.
        let spike = report.test(PerformanceTestKind::Spike).unwrap();
        assert_eq!(spike.status, PerformanceStatus::Completed);
        assert!(spike.issues.iter().any(|i| i.starts_with("CPU usage")));
        assert_eq!(report.overall_status, PerformanceVerdict::Failed);
    }

    /// Fails, aborts or panics once the user count reaches 100.
    struct BreaksAtPeak(&'static str);

    #[async_trait]
    impl LoadDriver for BreaksAtPeak {
        async fn drive(&self, request: LoadRequest) -> PerfResult<LoadStep> {
            if request.users >= 100 {
                match self.0 {
                    "abort" => return Err(PerfError::Aborted("operator stop".to_string())),
                    "panic" => panic!("driver crashed"),
                    _ => return Err(PerfError::Driver("connection refused by gateway".to_string())),
                }
            }
            SyntheticLoadDriver::deterministic().drive(request).await
        }

        fn name(&self) -> &str {
            "breaks-at-peak"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn driver_failures_end_only_the_affected_test() {
        for (mode, expected) in [
            ("error", PerformanceStatus::Failed),
            ("abort", PerformanceStatus::Aborted),
            ("panic", PerformanceStatus::Failed),
        ] {
            let mut tester = ModulePerformanceTester::new(PerformanceConfig::default(), calm_sampler())
                .with_driver(Arc::new(BreaksAtPeak(mode)));

            let report = run_suite(&mut tester).await;

            let statuses: Vec<PerformanceStatus> = report.tests.iter().map(|t| t.status).collect();
            assert_eq!(
                statuses,
                vec![
                    PerformanceStatus::Completed,
                    PerformanceStatus::Completed,
                    PerformanceStatus::Completed,
                    expected
                ],
                "mode {}",
                mode
            );
            let spike = report.test(PerformanceTestKind::Spike).unwrap();
            assert_eq!(spike.issues.len(), 1);
            assert!(spike.summary.is_none());
            assert_eq!(report.overall_status, PerformanceVerdict::Failed);
            assert!(report.recommendations[0].starts_with("The spike test did not complete"));
        }
    }

    struct Unreachable;

    #[async_trait]
    impl TargetProbe for Unreachable {
        async fn check(&self, url: &str) -> PerfResult<()> {
            Err(PerfError::TargetUnreachable {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_target_degrades_to_warning() {
        let config = PerformanceConfig {
            target_url: Some("http://gateway.local:8088/".to_string()),
            ..PerformanceConfig::default()
        };
        let mut tester = ModulePerformanceTester::new(config, calm_sampler())
            .with_driver(Arc::new(SyntheticLoadDriver::deterministic()))
            .with_target_probe(Arc::new(Unreachable));

        let report = run_suite(&mut tester).await;

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("continuing with synthetic load"));
        assert_eq!(report.count(PerformanceStatus::Completed), 4);
        assert_eq!(report.overall_status, PerformanceVerdict::Warning);
    }

    /// Returns as soon as it is called, without waiting out the step.
    struct InstantDriver;

    #[async_trait]
    impl LoadDriver for InstantDriver {
        async fn drive(&self, request: LoadRequest) -> PerfResult<LoadStep> {
            Ok(LoadStep {
                requests: request.users as u64,
                errors: 0,
                avg_response_ms: 10.0,
            })
        }

        fn name(&self) -> &str {
            "instant"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn walk_paces_steps_when_the_driver_returns_early() {
        let profile = PerformanceTestKind::Baseline.profile(1.0);
        let started = tokio::time::Instant::now();

        walk_profile(&profile, &InstantDriver, Duration::from_secs(1)).await.unwrap();

        assert_eq!(started.elapsed(), profile.total_duration());
    }

    #[tokio::test(start_paused = true)]
    async fn hot_host_fails_even_with_an_instant_driver() {
        let hot = Arc::new(ScriptedSampler::constant(ResourceSnapshot {
            cpu_percent: 99.0,
            memory_percent: 99.0,
            memory_mb: 8192.0,
            ..Default::default()
        }));
        let mut tester =
            ModulePerformanceTester::new(PerformanceConfig::default(), hot).with_driver(Arc::new(InstantDriver));

        let report = run_suite(&mut tester).await;

        for test in &report.tests {
            assert!(!test.metrics_history.is_empty(), "{} collected no samples", test.kind);
            assert_eq!(test.summary.unwrap().resources.peak_cpu_percent, 99.0);
            assert!(test.issues.iter().any(|i| i.starts_with("CPU usage")), "{:?}", test.issues);
        }
        assert_eq!(report.overall_status, PerformanceVerdict::Failed);
    }

    /// Answers the baseline read, then fails every periodic sample.
    struct BaselineOnly(AtomicU64);

    impl ResourceSampler for BaselineOnly {
        fn sample(&self) -> MonitorResult<ResourceSnapshot> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(ResourceSnapshot::default())
            } else {
                Err(modgate_monitor::MonitorError::Unsupported("test host".to_string()))
            }
        }

        fn name(&self) -> &str {
            "baseline-only"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_samples_is_not_reported_as_passing() {
        let mut tester = ModulePerformanceTester::new(PerformanceConfig::default(), calm_sampler())
            .with_driver(Arc::new(SyntheticLoadDriver::deterministic()));
        let (_dir, path) = module();
        tester.initialize_tests(&path).await.unwrap();
        tester.tests.truncate(1);
        tester.sampler = Arc::new(BaselineOnly(AtomicU64::new(0)));

        let report = tester.run_all_tests().await.unwrap();

        let baseline = report.test(PerformanceTestKind::Baseline).unwrap();
        assert!(baseline.metrics_history.is_empty());
        assert!(baseline.evaluations.is_empty());
        assert_eq!(
            baseline.issues,
            vec!["no resource samples were collected during the baseline test".to_string()]
        );
        assert_eq!(report.overall_status, PerformanceVerdict::Failed);
    }

    #[tokio::test]
    async fn run_before_initialize_is_rejected() {
        let mut tester = ModulePerformanceTester::new(PerformanceConfig::default(), calm_sampler());
        assert!(matches!(tester.run_all_tests().await, Err(PerfError::NotInitialized)));
    }
}
