//! Output formatting utilities

use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::*;
use modgate_scenario::{PhaseStatus, ScenarioReport};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON report
    #[default]
    Json,
    /// Human-readable summary
    Table,
}

/// Print a full report as pretty JSON
pub fn print_json<T: Serialize>(report: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Write `report` to `explicit`, or to a timestamped file under `results_dir`
/// when no path was given. Returns the path written.
pub fn export<T: Serialize>(
    report: &T,
    name: &str,
    explicit: Option<&Path>,
    results_dir: Option<&Path>,
) -> anyhow::Result<Option<PathBuf>> {
    let path = match (explicit, results_dir) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(dir)) => dir.join(format!("{}-{}.json", name, chrono::Utc::now().format("%Y%m%dT%H%M%S"))),
        (None, None) => return Ok(None),
    };
    modgate_types::export_report(report, Some(&path))
        .with_context(|| format!("failed to export report to {}", path.display()))?;
    Ok(Some(path))
}

/// Table row for one scenario phase
#[derive(Debug, Serialize, Tabled)]
struct PhaseRow {
    phase: String,
    status: String,
    duration: String,
    issues: usize,
    warnings: usize,
}

/// Print the per-phase table and recommendations of a scenario run
pub fn print_scenario_summary(report: &ScenarioReport) {
    let rows: Vec<PhaseRow> = report
        .summaries
        .iter()
        .map(|s| PhaseRow {
            phase: s.phase.to_string(),
            status: colorize_status(s.status).to_string(),
            duration: format!("{:.1}s", s.duration_ms as f64 / 1000.0),
            issues: s.issue_count,
            warnings: s.warning_count,
        })
        .collect();

    println!("{}", Table::new(rows));
    println!(
        "Overall: {}  ({:.0}% of {} phase(s) passed)",
        colorize_status(report.overall_status).bold(),
        report.success_rate,
        report.executed_phases.len()
    );
    for recommendation in &report.recommendations {
        print_info(recommendation);
    }
}

/// Print a one-line verdict for a single component run
pub fn print_verdict(label: &str, status: PhaseStatus, issues: &[String], warnings: &[String]) {
    println!("{}: {}", label, colorize_status(status).bold());
    for issue in issues {
        print_error(issue);
    }
    for warning in warnings {
        print_warning(warning);
    }
}

fn colorize_status(status: PhaseStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        PhaseStatus::Passed => text.green(),
        PhaseStatus::Warning | PhaseStatus::Skipped => text.yellow(),
        PhaseStatus::Failed | PhaseStatus::Error => text.red(),
    }
}

/// Print an error message
pub fn print_error(message: &str) {
    println!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}
