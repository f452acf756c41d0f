//! Quality-assurance pipeline.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{ScenarioError, ScenarioResult};

/// Findings of a QA run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaReport {
    pub digest: String,
    pub size_bytes: u64,
    pub checks: BTreeMap<String, bool>,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Release checks on a module package.
#[async_trait]
pub trait QaPipeline: Send + Sync {
    fn name(&self) -> &str;

    /// Check the module. Artifacts go under `workspace`.
    async fn run(&self, module_path: &Path, workspace: &Path) -> ScenarioResult<QaReport>;
}

/// Settings for [`ChecksumQaPipeline`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaConfig {
    /// BLAKE3 hex digest the package must match, when known.
    #[serde(default)]
    pub expected_digest: Option<String>,

    /// Packages larger than this draw a warning.
    #[serde(default = "default_size_budget_mb")]
    pub size_budget_mb: u64,
}

fn default_size_budget_mb() -> u64 {
    25
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            expected_digest: None,
            size_budget_mb: default_size_budget_mb(),
        }
    }
}

/// Digest, naming and size checks.
#[derive(Debug, Clone, Default)]
pub struct ChecksumQaPipeline {
    config: QaConfig,
}

impl ChecksumQaPipeline {
    pub fn new(config: QaConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl QaPipeline for ChecksumQaPipeline {
    fn name(&self) -> &str {
        "checksum"
    }

    #[instrument(skip(self, workspace), fields(module = %module_path.display()))]
    async fn run(&self, module_path: &Path, workspace: &Path) -> ScenarioResult<QaReport> {
        let io_err = |path: &Path| {
            let path = path.display().to_string();
            move |source| ScenarioError::Io { path, source }
        };

        let bytes = tokio::fs::read(module_path).await.map_err(io_err(module_path))?;
        let digest = blake3::hash(&bytes).to_hex().to_string();

        let mut report = QaReport {
            digest: digest.clone(),
            size_bytes: bytes.len() as u64,
            ..Default::default()
        };

        let file_name = module_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let conventional = follows_naming_convention(file_name);
        report.checks.insert("naming_convention".to_string(), conventional);
        if !conventional {
            report.warnings.push(format!(
                "Package name '{}' should be lowercase letters, digits, '-', '_' or '.'",
                file_name
            ));
        }

        if let Some(expected) = &self.config.expected_digest {
            let matches = expected.eq_ignore_ascii_case(&digest);
            report.checks.insert("digest_match".to_string(), matches);
            if !matches {
                report
                    .issues
                    .push(format!("Package digest {} does not match expected {}", digest, expected));
            }
        }

        let within_budget = report.size_bytes <= self.config.size_budget_mb * 1024 * 1024;
        report.checks.insert("size_budget".to_string(), within_budget);
        if !within_budget {
            report.warnings.push(format!(
                "Package is {:.1}MB, above the {}MB release budget",
                report.size_bytes as f64 / (1024.0 * 1024.0),
                self.config.size_budget_mb
            ));
        }

        let digest_file = workspace.join(format!("{}.blake3", file_name));
        tokio::fs::write(&digest_file, format!("{}  {}\n", digest, file_name))
            .await
            .map_err(io_err(&digest_file))?;
        debug!(digest = %digest, artifact = %digest_file.display(), "QA digest recorded");

        Ok(report)
    }
}

fn follows_naming_convention(file_name: &str) -> bool {
    !file_name.is_empty()
        && file_name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture(name: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, b"PK\x03\x04module").unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn clean_package_passes_and_leaves_digest_artifact() {
        let (dir, path) = fixture("demo-module.modl");
        let workspace = TempDir::new().unwrap();

        let report = ChecksumQaPipeline::default().run(&path, workspace.path()).await.unwrap();

        assert!(report.issues.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(report.digest, blake3::hash(b"PK\x03\x04module").to_hex().to_string());
        assert!(workspace.path().join("demo-module.modl.blake3").is_file());
        drop(dir);
    }

    #[tokio::test]
    async fn digest_mismatch_is_an_issue_and_bad_name_a_warning() {
        let (_dir, path) = fixture("Demo Module.modl");
        let workspace = TempDir::new().unwrap();
        let pipeline = ChecksumQaPipeline::new(QaConfig {
            expected_digest: Some("00".repeat(32)),
            ..QaConfig::default()
        });

        let report = pipeline.run(&path, workspace.path()).await.unwrap();

        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(!report.checks["digest_match"]);
        assert!(!report.checks["naming_convention"]);
    }

    #[test]
    fn naming_convention() {
        assert!(follows_naming_convention("opc-bridge_1.2.modl"));
        assert!(!follows_naming_convention("OpcBridge.modl"));
        assert!(!follows_naming_convention(""));
    }
}
