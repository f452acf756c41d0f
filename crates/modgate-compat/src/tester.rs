//! Compatibility tester.
//!
//! [`CompatibilityTester::initialize_tests`] builds the matrix for a module;
//! [`CompatibilityTester::run_all_tests`] runs every test on its own task,
//! bounded by a semaphore of `parallel_tests` permits. A test that errors or
//! panics ends as `error` without touching its siblings.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use modgate_types::{classify_error, PlatformDescriptor, Version};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::case::{CompatibilityStatus, CompatibilityTest, TestKind};
use crate::config::CompatibilityConfig;
use crate::database::{DatabaseProbe, DatabaseProbeFactory, ProbeOutcome, StaticProbeFactory, VALIDATION_STATEMENT};
use crate::environment::EnvironmentProbe;
use crate::error::{CompatError, CompatResult};
use crate::report::{CompatibilityReport, ReportInput};
use crate::rules::{evaluate_basic, evaluate_docker, Verdict};

/// Counts tests in the running state and remembers the peak.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    fn enter(self: &Arc<Self>) -> GaugeGuard {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(self.clone())
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct GaugeGuard(Arc<ConcurrencyGauge>);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared, read-only inputs of one run.
struct ExecutionContext {
    module_path: PathBuf,
    probe_delay: Duration,
    probes: Arc<dyn DatabaseProbeFactory>,
    gauge: Arc<ConcurrencyGauge>,
}

/// Builds and runs the version x platform x database matrix.
pub struct CompatibilityTester {
    config: CompatibilityConfig,
    environment: Arc<dyn EnvironmentProbe>,
    probes: Arc<dyn DatabaseProbeFactory>,
    module_path: Option<PathBuf>,
    workspace: Option<TempDir>,
    tests: Vec<CompatibilityTest>,
    warnings: Vec<String>,
    gauge: Arc<ConcurrencyGauge>,
}

impl CompatibilityTester {
    pub fn new(config: CompatibilityConfig, environment: Arc<dyn EnvironmentProbe>) -> Self {
        Self {
            config,
            environment,
            probes: Arc::new(StaticProbeFactory),
            module_path: None,
            workspace: None,
            tests: Vec::new(),
            warnings: Vec::new(),
            gauge: Arc::new(ConcurrencyGauge::default()),
        }
    }

    /// Replace the built-in database probes.
    pub fn with_probe_factory(mut self, probes: Arc<dyn DatabaseProbeFactory>) -> Self {
        self.probes = probes;
        self
    }

    pub fn config(&self) -> &CompatibilityConfig {
        &self.config
    }

    pub fn tests(&self) -> &[CompatibilityTest] {
        &self.tests
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Highest number of tests observed running at once.
    pub fn peak_running(&self) -> usize {
        self.gauge.peak()
    }

    /// Scratch directory of the current run, if one is held.
    pub fn workspace_path(&self) -> Option<&Path> {
        self.workspace.as_ref().map(|w| w.path())
    }

    /// Build the test matrix for `module_path`. Returns the number of tests.
    #[instrument(skip(self), fields(module = %module_path.display()))]
    pub async fn initialize_tests(&mut self, module_path: &Path) -> CompatResult<usize> {
        if !module_path.is_file() {
            return Err(CompatError::InvalidInput(format!(
                "module path {} does not exist or is not a file",
                module_path.display()
            )));
        }
        if self.config.parallel_tests == 0 {
            return Err(CompatError::InvalidInput("parallel_tests must be at least 1".to_string()));
        }
        let versions = self.config.parsed_versions()?;

        self.cleanup();
        self.tests.clear();
        self.warnings.clear();
        self.workspace = Some(
            tempfile::Builder::new()
                .prefix("modgate-compat-")
                .tempdir()
                .map_err(|e| CompatError::Io {
                    path: std::env::temp_dir().display().to_string(),
                    source: e,
                })?,
        );
        self.module_path = Some(module_path.to_path_buf());

        let platform = self.environment.detect_platform().await;
        let container_available = self.environment.container_engine_available().await;
        if !container_available {
            info!("Container engine unavailable; skipping container tests");
            self.warnings
                .push("Container engine unavailable; docker compatibility tests were skipped".to_string());
        }

        for version in &versions {
            self.tests.push(CompatibilityTest::basic(*version, platform.clone()));
            if container_available {
                let image = self.config.image_for(version);
                let container = PlatformDescriptor::container(image, platform.architecture.clone());
                self.tests.push(CompatibilityTest::docker(*version, container));
            }
        }

        if let Some(newest) = versions.iter().max() {
            for db in &self.config.databases {
                self.tests
                    .push(CompatibilityTest::database(*newest, platform.clone(), *db));
            }
        }

        info!(
            tests = self.tests.len(),
            platform = %platform,
            container_available,
            "Compatibility matrix initialized"
        );
        Ok(self.tests.len())
    }

    /// Run every initialized test and build the report. The workspace is
    /// released before returning.
    #[instrument(skip(self))]
    pub async fn run_all_tests(&mut self) -> CompatResult<CompatibilityReport> {
        let Some(module_path) = self.module_path.clone() else {
            return Err(CompatError::NotInitialized);
        };

        let started_at = Utc::now();
        let ctx = Arc::new(ExecutionContext {
            module_path: module_path.clone(),
            probe_delay: self.config.probe_delay(),
            probes: self.probes.clone(),
            gauge: self.gauge.clone(),
        });
        let semaphore = Arc::new(Semaphore::new(self.config.parallel_tests.max(1)));

        let handles: Vec<(CompatibilityTest, JoinHandle<CompatibilityTest>)> = std::mem::take(&mut self.tests)
            .into_iter()
            .map(|test| {
                let fallback = test.clone();
                let semaphore = semaphore.clone();
                let ctx = ctx.clone();
                let handle = tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            let mut test = test;
                            test.force_error(classify_error("Compatibility test", &e.to_string()));
                            return test;
                        }
                    };
                    run_single_test(test, &ctx).await
                });
                (fallback, handle)
            })
            .collect();

        let mut finished = Vec::with_capacity(handles.len());
        for (mut fallback, handle) in handles {
            match handle.await {
                Ok(test) => finished.push(test),
                Err(e) => {
                    warn!(test = %fallback.key(), error = %e, "Compatibility test task failed");
                    fallback.force_error(classify_error(&format!("{} test", fallback.kind), &e.to_string()));
                    finished.push(fallback);
                }
            }
        }

        let report = CompatibilityReport::from(ReportInput {
            module_path,
            tests: finished.clone(),
            warnings: self.warnings.clone(),
            parallel_tests: self.config.parallel_tests,
            peak_running_tests: self.gauge.peak(),
            test_timeout_secs: self.config.test_timeout_secs,
            started_at,
        });
        self.tests = finished;
        self.cleanup();

        info!(
            overall = %report.overall_status,
            tests = report.test_count(),
            peak_running = report.peak_running_tests,
            duration_ms = report.duration_ms,
            "Compatibility tests complete"
        );
        Ok(report)
    }

    /// Release the scratch workspace.
    pub fn cleanup(&mut self) {
        if let Some(workspace) = self.workspace.take() {
            let path = workspace.path().to_path_buf();
            if let Err(e) = workspace.close() {
                warn!(path = %path.display(), error = %e, "Failed to remove compatibility workspace");
            }
        }
    }
}

impl Drop for CompatibilityTester {
    fn drop(&mut self) {
        self.cleanup();
    }
}

async fn run_single_test(mut test: CompatibilityTest, ctx: &ExecutionContext) -> CompatibilityTest {
    let _running = ctx.gauge.enter();
    let started = Instant::now();

    if let Err(e) = test.start() {
        test.force_error(e.to_string());
        return test;
    }
    debug!(test = %test.key(), kind = %test.kind, "Compatibility test started");

    let status = match execute_test(&mut test, ctx).await {
        Ok(verdict) => {
            test.issues.extend(verdict.issues);
            test.warnings.extend(verdict.warnings);
            verdict.status
        }
        Err(e) => {
            test.issues
                .push(classify_error(&format!("{} test", test.kind), &e.to_string()));
            CompatibilityStatus::Error
        }
    };

    test.execution_time_ms = started.elapsed().as_millis() as u64;
    if let Err(e) = test.finish(status) {
        test.force_error(e.to_string());
    }
    debug!(test = %test.key(), status = %test.status(), "Compatibility test finished");
    test
}

async fn execute_test(test: &mut CompatibilityTest, ctx: &ExecutionContext) -> CompatResult<Verdict> {
    match test.kind {
        TestKind::Basic => {
            tokio::time::sleep(ctx.probe_delay).await;
            let metadata = tokio::fs::metadata(&ctx.module_path)
                .await
                .map_err(|e| CompatError::Io {
                    path: ctx.module_path.display().to_string(),
                    source: e,
                })?;
            test.result_data
                .insert("module_size_bytes".to_string(), json!(metadata.len()));
            test.result_data
                .insert("runtime_line".to_string(), json!(test.version.line()));
            Ok(evaluate_basic(&test.version, &test.platform))
        }
        TestKind::Docker => {
            tokio::time::sleep(ctx.probe_delay).await;
            if let Some(image) = &test.platform.image {
                test.result_data.insert("image".to_string(), json!(image));
            }
            Ok(evaluate_docker(&test.version))
        }
        TestKind::Database => {
            let kind = test
                .database
                .ok_or_else(|| CompatError::Internal("database test without a database kind".to_string()))?;
            let mut probe = ctx.probes.create(kind);
            let outcome = run_probe(probe.as_mut(), &test.version).await?;
            for (key, value) in outcome.details {
                test.result_data.insert(key, json!(value));
            }
            Ok(Verdict {
                status: outcome.status,
                issues: Vec::new(),
                warnings: outcome.warnings,
            })
        }
    }
}

async fn run_probe(probe: &mut dyn DatabaseProbe, version: &Version) -> CompatResult<ProbeOutcome> {
    probe.connect().await?;
    let outcome = probe.execute(VALIDATION_STATEMENT).await;
    if let Err(e) = probe.close().await {
        warn!(database = %probe.kind(), runtime = %version, error = %e, "Database probe close failed");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::StaticEnvironment;
    use async_trait::async_trait;
    use modgate_types::{Architecture, DatabaseKind, OsFamily};

    fn linux_env(container: bool) -> Arc<StaticEnvironment> {
        Arc::new(StaticEnvironment::new(
            PlatformDescriptor::os(OsFamily::Linux, "22.04", Architecture::X86_64).with_runtime(17),
            container,
        ))
    }

    fn module() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = modgate_validator::testing::write_valid_module(dir.path());
        (dir, path)
    }

    #[tokio::test]
    async fn missing_module_is_invalid_input() {
        let mut tester = CompatibilityTester::new(CompatibilityConfig::default(), linux_env(false));
        let err = tester
            .initialize_tests(Path::new("/nonexistent/thing.modl"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompatError::InvalidInput(_)));
        assert!(tester.tests().is_empty());
    }

    #[tokio::test]
    async fn run_before_initialize_is_rejected() {
        let mut tester = CompatibilityTester::new(CompatibilityConfig::default(), linux_env(false));
        assert!(matches!(tester.run_all_tests().await, Err(CompatError::NotInitialized)));
    }

    #[tokio::test]
    async fn matrix_shape_follows_container_availability() {
        let (_dir, path) = module();
        let config = CompatibilityConfig::default().with_versions(["8.0.17", "8.1.15"]);

        let mut without = CompatibilityTester::new(config.clone(), linux_env(false));
        assert_eq!(without.initialize_tests(&path).await.unwrap(), 2 + 4);
        assert_eq!(without.warnings().len(), 1);

        let mut with = CompatibilityTester::new(config, linux_env(true));
        assert_eq!(with.initialize_tests(&path).await.unwrap(), 2 + 2 + 4);
        assert!(with.warnings().is_empty());

        let db_versions: Vec<String> = with
            .tests()
            .iter()
            .filter(|t| t.kind == TestKind::Database)
            .map(|t| t.version.to_string())
            .collect();
        assert!(db_versions.iter().all(|v| v == "8.1.15"));
    }

    #[tokio::test(start_paused = true)]
    async fn verdicts_for_known_versions() {
        let (_dir, path) = module();
        let config = CompatibilityConfig::default().with_versions(["7.9.0", "8.1.15", "8.1.25"]);
        let mut tester = CompatibilityTester::new(config, linux_env(false));
        tester.initialize_tests(&path).await.unwrap();

        let report = tester.run_all_tests().await.unwrap();

        let basic = |v: &str| {
            report
                .tests
                .iter()
                .find(|t| t.kind == TestKind::Basic && t.version.to_string() == v)
                .unwrap()
                .status()
        };
        assert_eq!(basic("7.9.0"), CompatibilityStatus::Incompatible);
        assert_eq!(basic("8.1.15"), CompatibilityStatus::Compatible);
        assert_eq!(basic("8.1.25"), CompatibilityStatus::Compatible);
        assert_eq!(report.overall_status, CompatibilityStatus::Incompatible);
        assert_eq!(report.count(CompatibilityStatus::Incompatible), 1);
        assert!(report.tests.iter().all(|t| t.status().is_terminal()));
    }

    #[tokio::test(start_paused = true)]
    async fn container_runs_leave_the_version_verdict_to_the_basic_test() {
        let (_dir, path) = module();
        let config = CompatibilityConfig::default().with_versions(["7.9.0", "8.1.15"]);
        let mut tester = CompatibilityTester::new(config, linux_env(true));
        assert_eq!(tester.initialize_tests(&path).await.unwrap(), 2 + 2 + 4);

        let report = tester.run_all_tests().await.unwrap();

        let incompatible: Vec<String> = report
            .tests
            .iter()
            .filter(|t| t.status() == CompatibilityStatus::Incompatible)
            .map(|t| t.key())
            .collect();
        assert_eq!(incompatible, vec!["7.9.0_linux-x86_64".to_string()]);

        let old_container = report
            .tests
            .iter()
            .find(|t| t.kind == TestKind::Docker && t.version.to_string() == "7.9.0")
            .unwrap();
        assert_eq!(old_container.status(), CompatibilityStatus::Unknown);
        assert_eq!(old_container.warnings.len(), 1);
        assert_eq!(report.overall_status, CompatibilityStatus::Incompatible);
    }

    #[tokio::test(start_paused = true)]
    async fn parallelism_is_bounded_by_semaphore() {
        let (_dir, path) = module();
        let config = CompatibilityConfig {
            target_versions: vec!["8.0.17".to_string(), "8.1.15".to_string()],
            databases: vec![DatabaseKind::Mysql, DatabaseKind::Postgresql, DatabaseKind::Mssql],
            ..CompatibilityConfig::default()
        }
        .with_parallel_tests(2);
        let mut tester = CompatibilityTester::new(config, linux_env(false)).with_probe_factory(Arc::new(SlowProbes));
        assert_eq!(tester.initialize_tests(&path).await.unwrap(), 5);

        let report = tester.run_all_tests().await.unwrap();

        assert_eq!(report.test_count(), 5);
        assert!(tester.peak_running() <= 2, "peak was {}", tester.peak_running());
        assert_eq!(tester.peak_running(), 2);
        assert_eq!(report.peak_running_tests, tester.peak_running());
    }

    #[tokio::test]
    async fn failing_and_panicking_probes_do_not_affect_siblings() {
        let (_dir, path) = module();
        let config = CompatibilityConfig {
            target_versions: vec!["8.1.15".to_string()],
            databases: vec![DatabaseKind::Mysql, DatabaseKind::Mssql, DatabaseKind::Oracle],
            probe_delay_ms: 0,
            ..CompatibilityConfig::default()
        };
        let mut tester =
            CompatibilityTester::new(config, linux_env(false)).with_probe_factory(Arc::new(BrokenProbes));
        tester.initialize_tests(&path).await.unwrap();

        let report = tester.run_all_tests().await.unwrap();

        let db = |kind: DatabaseKind| report.tests.iter().find(|t| t.database == Some(kind)).unwrap();
        assert_eq!(db(DatabaseKind::Mysql).status(), CompatibilityStatus::Compatible);

        let refused = db(DatabaseKind::Mssql);
        assert_eq!(refused.status(), CompatibilityStatus::Error);
        assert!(refused.issues[0].contains("could not connect"), "{:?}", refused.issues);

        let crashed = db(DatabaseKind::Oracle);
        assert_eq!(crashed.status(), CompatibilityStatus::Error);
        assert_eq!(crashed.issues.len(), 1);

        let basic = report.tests.iter().find(|t| t.kind == TestKind::Basic).unwrap();
        assert_eq!(basic.status(), CompatibilityStatus::Compatible);
        assert_eq!(report.count(CompatibilityStatus::Error), 2);
        assert_eq!(tester.gauge.running(), 0);
    }

    #[tokio::test]
    async fn workspace_is_released_after_run() {
        let (_dir, path) = module();
        let config = CompatibilityConfig {
            target_versions: vec!["8.1.15".to_string()],
            probe_delay_ms: 0,
            ..CompatibilityConfig::default()
        };
        let mut tester = CompatibilityTester::new(config, linux_env(false));
        tester.initialize_tests(&path).await.unwrap();

        let workspace = tester.workspace_path().unwrap().to_path_buf();
        assert!(workspace.exists());

        tester.run_all_tests().await.unwrap();
        assert!(tester.workspace_path().is_none());
        assert!(!workspace.exists());
    }

    /// Every probe sleeps, so tests overlap long enough to observe the bound.
    struct SlowProbes;

    impl DatabaseProbeFactory for SlowProbes {
        fn create(&self, kind: DatabaseKind) -> Box<dyn DatabaseProbe> {
            Box::new(SlowProbe(kind))
        }
    }

    struct SlowProbe(DatabaseKind);

    #[async_trait]
    impl DatabaseProbe for SlowProbe {
        fn kind(&self) -> DatabaseKind {
            self.0
        }

        async fn connect(&mut self) -> CompatResult<()> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        }

        async fn execute(&mut self, _statement: &str) -> CompatResult<ProbeOutcome> {
            Ok(ProbeOutcome::new(CompatibilityStatus::Compatible))
        }

        async fn close(&mut self) -> CompatResult<()> {
            Ok(())
        }
    }

    /// MySQL works, MSSQL refuses connections, Oracle panics mid-query.
    struct BrokenProbes;

    impl DatabaseProbeFactory for BrokenProbes {
        fn create(&self, kind: DatabaseKind) -> Box<dyn DatabaseProbe> {
            match kind {
                DatabaseKind::Mysql => StaticProbeFactory.create(kind),
                other => Box::new(BrokenProbe(other)),
            }
        }
    }

    struct BrokenProbe(DatabaseKind);

    #[async_trait]
    impl DatabaseProbe for BrokenProbe {
        fn kind(&self) -> DatabaseKind {
            self.0
        }

        async fn connect(&mut self) -> CompatResult<()> {
            if self.0 == DatabaseKind::Mssql {
                return Err(CompatError::Probe {
                    database: self.0,
                    reason: "connection refused".to_string(),
                });
            }
            Ok(())
        }

        async fn execute(&mut self, _statement: &str) -> CompatResult<ProbeOutcome> {
            panic!("driver crashed");
        }

        async fn close(&mut self) -> CompatResult<()> {
            Ok(())
        }
    }
}
