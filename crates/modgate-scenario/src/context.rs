//! Run-scoped context.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ScenarioError, ScenarioResult};

/// State owned by one scenario run: its id, the module under test and a
/// scratch workspace. Dropping the context removes the workspace.
#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    module_path: PathBuf,
    workspace: TempDir,
    started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(module_path: &Path) -> ScenarioResult<Self> {
        if !module_path.is_file() {
            return Err(ScenarioError::InvalidInput(format!(
                "module path {} does not exist or is not a file",
                module_path.display()
            )));
        }

        let run_id = Uuid::new_v4();
        let workspace = tempfile::Builder::new()
            .prefix(&format!("modgate-run-{}-", run_id.simple()))
            .tempdir()
            .map_err(|e| ScenarioError::Workspace(e.to_string()))?;
        debug!(run_id = %run_id, workspace = %workspace.path().display(), "Run workspace created");

        Ok(Self {
            run_id,
            module_path: module_path.to_path_buf(),
            workspace,
            started_at: Utc::now(),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn module_path(&self) -> &Path {
        &self.module_path
    }

    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Remove the workspace now, logging instead of failing.
    pub fn release(self) {
        let path = self.workspace.path().to_path_buf();
        if let Err(e) = self.workspace.close() {
            warn!(run_id = %self.run_id, path = %path.display(), error = %e, "Failed to remove run workspace");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_lives_as_long_as_the_context() {
        let dir = TempDir::new().unwrap();
        let module = dir.path().join("m.modl");
        std::fs::write(&module, b"PK\x03\x04").unwrap();

        let ctx = RunContext::new(&module).unwrap();
        let workspace = ctx.workspace().to_path_buf();
        assert!(workspace.is_dir());
        assert_eq!(ctx.module_path(), module.as_path());

        ctx.release();
        assert!(!workspace.exists());
    }

    #[test]
    fn missing_module_is_invalid_input() {
        let err = RunContext::new(Path::new("/definitely/not/here.modl")).unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidInput(_)));
    }
}
