//! Subcommand implementations
//!
//! Each command runs one component (or the whole scenario), prints the
//! report and returns the verdict as a phase status.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use modgate_compat::{CompatibilityTester, HostEnvironment};
use modgate_monitor::ProcfsSampler;
use modgate_perf::{ModulePerformanceTester, PerformanceVerdict};
use modgate_scenario::{
    compatibility_phase_status, PhaseResult, PhaseStatus, ScenarioComponents, TestPhase, TestScenarioRunner, TestSuite,
};
use modgate_validator::ModuleValidator;
use serde::Serialize;
use tracing::info;

use crate::config::ModgateConfig;
use crate::output::{self, OutputFormat};

/// Settings shared by every subcommand
pub struct CommandContext {
    pub config: ModgateConfig,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

pub async fn validate(ctx: &CommandContext, module: &Path) -> anyhow::Result<PhaseStatus> {
    let result = ModuleValidator::new(ctx.config.validator.clone()).validate(module).await;
    let status = PhaseResult::from_findings(TestPhase::Validation, result.errors.clone(), result.warnings.clone()).status;
    let status = if result.success { status } else { PhaseStatus::Failed };

    emit(ctx, "validation", &result, || {
        output::print_verdict("Validation", status, &result.errors, &result.warnings)
    })?;
    Ok(status)
}

pub async fn compat(ctx: &CommandContext, module: &Path, versions: Vec<String>) -> anyhow::Result<PhaseStatus> {
    let mut config = ctx.config.compatibility.clone();
    if !versions.is_empty() {
        config = config.with_versions(versions);
    }

    let mut tester = CompatibilityTester::new(config, Arc::new(HostEnvironment::new()));
    tester.initialize_tests(module).await?;
    let report = tester.run_all_tests().await?;
    let status = compatibility_phase_status(report.overall_status);

    emit(ctx, "compatibility", &report, || {
        let issues: Vec<String> = report
            .tests
            .iter()
            .flat_map(|t| t.issues.iter().map(move |i| format!("{}: {}", t.key(), i)))
            .collect();
        output::print_verdict(
            &format!("Compatibility ({} tests)", report.test_count()),
            status,
            &issues,
            &report.warnings,
        );
        for recommendation in &report.recommendations {
            output::print_info(recommendation);
        }
    })?;
    Ok(status)
}

pub async fn perf(ctx: &CommandContext, module: &Path) -> anyhow::Result<PhaseStatus> {
    let mut tester = ModulePerformanceTester::new(ctx.config.performance.clone(), Arc::new(ProcfsSampler::new()));
    tester.initialize_tests(module).await?;
    let report = tester.run_all_tests().await?;
    let status = match report.overall_status {
        PerformanceVerdict::Passed => PhaseStatus::Passed,
        PerformanceVerdict::Warning => PhaseStatus::Warning,
        PerformanceVerdict::Failed => PhaseStatus::Failed,
    };

    emit(ctx, "performance", &report, || {
        let issues: Vec<String> = report
            .tests
            .iter()
            .flat_map(|t| t.issues.iter().map(move |i| format!("{}: {}", t.kind, i)))
            .collect();
        output::print_verdict("Performance", status, &issues, &report.warnings);
        for recommendation in &report.recommendations {
            output::print_info(recommendation);
        }
    })?;
    Ok(status)
}

/// Options of the `run` subcommand after CLI parsing
pub struct RunOptions {
    pub suite: Option<TestSuite>,
    pub phases: Vec<TestPhase>,
    pub parallel: bool,
    pub no_fail_fast: bool,
}

pub async fn run(ctx: &CommandContext, module: &Path, options: RunOptions) -> anyhow::Result<PhaseStatus> {
    let mut scenario = ctx.config.scenario.clone();
    if !options.phases.is_empty() {
        scenario.suite = TestSuite::Custom;
        scenario.phases = options.phases;
    } else if let Some(suite) = options.suite {
        scenario.suite = suite;
    }
    if options.parallel {
        scenario.parallel = true;
    }
    if options.no_fail_fast {
        scenario.fail_fast = false;
    }

    let mut components = ScenarioComponents::new(Arc::new(HostEnvironment::new()), Arc::new(ProcfsSampler::new()));
    components.validator = ctx.config.validator.clone();
    components.qa = ctx.config.qa.clone();
    components.compatibility = ctx.config.compatibility.clone();
    components.performance = ctx.config.performance.clone();

    let runner = TestScenarioRunner::with_components(scenario, components);
    let report = runner.run(module).await?;

    emit(ctx, "scenario", &report, || output::print_scenario_summary(&report))?;
    Ok(report.overall_status)
}

/// Print `report` in the chosen format and export it.
fn emit<T: Serialize>(ctx: &CommandContext, name: &str, report: &T, table: impl FnOnce()) -> anyhow::Result<()> {
    match ctx.format {
        OutputFormat::Json => output::print_json(report)?,
        OutputFormat::Table => table(),
    }

    let results_dir = ctx
        .config
        .output
        .export
        .then_some(ctx.config.output.results_dir.as_path());
    if let Some(path) = output::export(report, name, ctx.output.as_deref(), results_dir)? {
        info!(path = %path.display(), "Report exported");
        if matches!(ctx.format, OutputFormat::Table) {
            output::print_success(&format!("Report written to {}", path.display()));
        }
    }
    Ok(())
}
