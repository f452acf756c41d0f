//! Structural gate for module packages.

use std::path::Path;

use modgate_types::classify_error;
use tokio::io::AsyncReadExt;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::ValidatorConfig;
use crate::error::{ValidatorError, ValidatorResult};
use crate::result::ValidationResult;
use crate::smoke::{self, END_OF_ARCHIVE_SIGNATURE, LOCAL_HEADER_SIGNATURE};

/// Runtime release lines every module is pre-checked against.
pub const PRECHECK_LINES: [(u32, u32); 3] = [(7, 9), (8, 0), (8, 1)];

/// Validates that a module package is structurally sound before any
/// compatibility or load testing is spent on it.
#[derive(Debug, Clone, Default)]
pub struct ModuleValidator {
    config: ValidatorConfig,
}

impl ModuleValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a module package.
    ///
    /// Never returns an error: every failure is folded into the result as a
    /// formatted message.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn validate(&self, path: &Path) -> ValidationResult {
        let started = Instant::now();
        let mut result = ValidationResult::new(path);

        if let Err(e) = self.run_checks(path, &mut result).await {
            let message = match &e {
                ValidatorError::InvalidInput(_) => e.to_string(),
                other => classify_error("Module validation", &other.to_string()),
            };
            warn!(error = %e, "Module validation aborted");
            result.add_error(message);
        }

        result.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            success = result.success,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            duration_ms = result.duration_ms,
            "Module validation finished"
        );
        result
    }

    async fn run_checks(&self, path: &Path, result: &mut ValidationResult) -> ValidatorResult<()> {
        let size = self.check_input(path).await?;

        let workspace = tempfile::Builder::new()
            .prefix("modgate-validate-")
            .tempdir()
            .map_err(|e| ValidatorError::Workspace(e.to_string()))?;
        debug!(workspace = %workspace.path().display(), "Acquired validation workspace");

        let structural_errors = self.structural_checks(path, size).await?;
        let structural_ok = structural_errors.is_empty();
        for error in structural_errors {
            result.add_error(error);
        }
        if !structural_ok {
            return Ok(());
        }

        for (major, minor) in PRECHECK_LINES {
            result
                .compatibility_results
                .insert(format!("{}.{}", major, minor), major >= self.config.min_runtime_major);
        }

        let (performance, security, integration) = tokio::join!(
            smoke::performance_smoke(path, &self.config),
            smoke::security_smoke(path),
            smoke::integration_smoke(path, workspace.path()),
        );
        for outcome in [performance, security, integration] {
            result.merge(outcome?);
        }

        Ok(())
    }

    /// Check the path is an existing, readable file with the right extension.
    /// Returns the file size.
    async fn check_input(&self, path: &Path) -> ValidatorResult<u64> {
        let metadata = tokio::fs::metadata(path).await.map_err(|_| {
            ValidatorError::InvalidInput(format!("module file not found: {}", path.display()))
        })?;

        if !metadata.is_file() {
            return Err(ValidatorError::InvalidInput(format!(
                "module path is not a file: {}",
                path.display()
            )));
        }

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if !extension.eq_ignore_ascii_case(&self.config.module_extension) {
            return Err(ValidatorError::InvalidInput(format!(
                "expected a .{} file, got {}",
                self.config.module_extension,
                path.display()
            )));
        }

        tokio::fs::File::open(path).await.map_err(|e| {
            ValidatorError::InvalidInput(format!("module file is not readable: {} ({})", path.display(), e))
        })?;

        Ok(metadata.len())
    }

    async fn structural_checks(&self, path: &Path, size: u64) -> ValidatorResult<Vec<String>> {
        let mut errors = Vec::new();

        if size == 0 {
            errors.push("module file is empty".to_string());
            return Ok(errors);
        }

        if size > self.config.max_size_bytes() {
            errors.push(format!(
                "module is {:.1}MB, above the {}MB limit",
                size as f64 / (1024.0 * 1024.0),
                self.config.max_size_mb
            ));
        }

        let mut header = [0u8; 4];
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ValidatorError::io(path, e))?;
        let read = file
            .read(&mut header)
            .await
            .map_err(|e| ValidatorError::io(path, e))?;

        if read < header.len() {
            errors.push("module is too small to be a package archive".to_string());
        } else if header == END_OF_ARCHIVE_SIGNATURE {
            errors.push("module archive contains no entries".to_string());
        } else if header != LOCAL_HEADER_SIGNATURE {
            errors.push("module does not start with a package archive signature".to_string());
        }

        Ok(errors)
    }
}
