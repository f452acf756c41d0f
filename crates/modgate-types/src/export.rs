//! JSON report sink shared by every report type.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Errors raised while exporting a report.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Serialize a report to JSON, writing it to `path` when one is supplied.
pub fn export_report<T: Serialize>(report: &T, path: Option<&Path>) -> ExportResult<serde_json::Value> {
    let value = serde_json::to_value(report)?;

    if let Some(path) = path {
        let io_err = |source| ExportError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(&value)?;
        std::fs::write(path, text).map_err(io_err)?;
        info!(path = %path.display(), "Report exported");
    }

    Ok(value)
}
