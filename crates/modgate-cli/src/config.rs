//! Configuration for the modgate CLI

use std::path::PathBuf;

use modgate_compat::CompatibilityConfig;
use modgate_perf::PerformanceConfig;
use modgate_scenario::{QaConfig, ScenarioConfig};
use modgate_validator::ValidatorConfig;
use serde::{Deserialize, Serialize};

/// Settings for every component, layered from defaults, an optional file
/// and `MODGATE_*` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModgateConfig {
    #[serde(default)]
    pub validator: ValidatorConfig,

    #[serde(default)]
    pub qa: QaConfig,

    #[serde(default)]
    pub compatibility: CompatibilityConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub scenario: ScenarioConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Where exported reports go
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for reports when no `--output` path is given
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Export reports to `results_dir` at all
    #[serde(default = "default_true")]
    pub export: bool,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("test-results")
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            export: true,
        }
    }
}

impl ModgateConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// Nested keys use `__` in variable names, e.g.
    /// `MODGATE_SCENARIO__FAIL_FAST=false`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&ModgateConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MODGATE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("compatibility.target_versions")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgate_scenario::TestSuite;
    use std::io::Write;

    #[test]
    fn defaults_round_trip_through_the_loader() {
        let config = ModgateConfig::load(None).unwrap();
        assert_eq!(config.compatibility.parallel_tests, 3);
        assert_eq!(config.scenario.suite, TestSuite::Standard);
        assert!(config.scenario.fail_fast);
        assert_eq!(config.output.results_dir, PathBuf::from("test-results"));
        assert!(config.performance.target_url.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[scenario]\nsuite = \"quick\"\nparallel = true\n\n[compatibility]\ntarget_versions = [\"8.1.25\"]\n"
        )
        .unwrap();

        let config = ModgateConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.scenario.suite, TestSuite::Quick);
        assert!(config.scenario.parallel);
        assert_eq!(config.compatibility.target_versions, vec!["8.1.25".to_string()]);
        assert_eq!(config.compatibility.parallel_tests, 3);
    }
}
