//! modgate - module deployment testing
//!
//! The CLI runs the deployment checks for a gateway module package:
//! - structural validation
//! - runtime/platform/database compatibility matrix
//! - load and performance suite
//! - full test scenarios with a unified verdict

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use modgate_scenario::{PhaseStatus, TestPhase, TestSuite};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::{CommandContext, RunOptions};
use config::ModgateConfig;
use output::OutputFormat;

/// modgate CLI application
#[derive(Parser)]
#[command(name = "modgate")]
#[command(about = "modgate - Module deployment testing for industrial gateways", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MODGATE_CONFIG", global = true)]
    config: Option<String>,

    /// Log level
    #[arg(long, env = "MODGATE_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "MODGATE_LOG_JSON", global = true)]
    json: bool,

    /// Report format on stdout
    #[arg(short, long, value_enum, default_value = "json", global = true)]
    format: OutputFormat,

    /// Write the report to this path instead of the results directory
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Validate a module package
    Validate {
        /// Module package path
        module: PathBuf,
    },

    /// Run the compatibility matrix
    #[command(alias = "compatibility")]
    Compat {
        /// Module package path
        module: PathBuf,

        /// Runtime versions to test, comma separated
        #[arg(long, value_delimiter = ',')]
        versions: Vec<String>,
    },

    /// Run the performance suite
    #[command(alias = "performance")]
    Perf {
        /// Module package path
        module: PathBuf,
    },

    /// Run a full test scenario
    Run {
        /// Module package path
        module: PathBuf,

        /// Test suite (quick, standard, comprehensive)
        #[arg(short, long)]
        suite: Option<TestSuite>,

        /// Explicit phases, comma separated; implies the custom suite
        #[arg(long, value_delimiter = ',')]
        phases: Vec<TestPhase>,

        /// Run validation and QA concurrently
        #[arg(long)]
        parallel: bool,

        /// Keep going after a failed phase
        #[arg(long)]
        no_fail_fast: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Load configuration
    let config = ModgateConfig::load(cli.config.as_deref())?;
    let ctx = CommandContext {
        config,
        format: cli.format,
        output: cli.output,
    };

    let status = match cli.command {
        Commands::Validate { module } => commands::validate(&ctx, &module).await?,
        Commands::Compat { module, versions } => commands::compat(&ctx, &module, versions).await?,
        Commands::Perf { module } => commands::perf(&ctx, &module).await?,
        Commands::Run {
            module,
            suite,
            phases,
            parallel,
            no_fail_fast,
        } => {
            let options = RunOptions {
                suite,
                phases,
                parallel,
                no_fail_fast,
            };
            commands::run(&ctx, &module, options).await?
        }
    };

    if is_acceptable(status) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn is_acceptable(status: PhaseStatus) -> bool {
    matches!(status, PhaseStatus::Passed | PhaseStatus::Warning)
}
