//! Smoke sub-tests run after the structural checks pass.
//!
//! Each sub-test is cheap and independent: performance (read + digest time),
//! security (archive entry names, file permissions) and integration
//! (workspace copy round trip, manifest presence).

use std::path::Path;

use tokio::time::Instant;
use tracing::debug;

use crate::config::ValidatorConfig;
use crate::error::{ValidatorError, ValidatorResult};
use crate::result::SubTestOutcome;

/// Signature of a ZIP local file header.
pub const LOCAL_HEADER_SIGNATURE: [u8; 4] = *b"PK\x03\x04";

/// Signature of a ZIP end-of-central-directory record.
pub const END_OF_ARCHIVE_SIGNATURE: [u8; 4] = *b"PK\x05\x06";

/// Manifest every gateway module ships at its root.
pub const MANIFEST_ENTRY: &str = "module.xml";

const LOCAL_HEADER_LEN: usize = 30;

/// List the entry names of the local file headers found in `bytes`.
///
/// Only the headers are walked; entry data is never decompressed.
pub fn archive_entries(bytes: &[u8]) -> Vec<String> {
    let mut entries = Vec::new();
    let mut offset = 0;

    while offset + LOCAL_HEADER_LEN <= bytes.len() {
        if bytes[offset..offset + 4] != LOCAL_HEADER_SIGNATURE {
            offset += 1;
            continue;
        }

        let name_len = u16::from_le_bytes([bytes[offset + 26], bytes[offset + 27]]) as usize;
        let extra_len = u16::from_le_bytes([bytes[offset + 28], bytes[offset + 29]]) as usize;
        let name_start = offset + LOCAL_HEADER_LEN;
        let name_end = name_start + name_len;
        if name_end > bytes.len() {
            break;
        }

        entries.push(String::from_utf8_lossy(&bytes[name_start..name_end]).into_owned());
        offset = name_end + extra_len;
    }

    entries
}

fn is_unsafe_entry(name: &str) -> bool {
    let normalized = name.replace('\\', "/");
    normalized.starts_with('/')
        || normalized.split('/').any(|part| part == "..")
        || normalized.as_bytes().get(1) == Some(&b':')
}

pub(crate) async fn performance_smoke(path: &Path, config: &ValidatorConfig) -> ValidatorResult<SubTestOutcome> {
    let mut outcome = SubTestOutcome::new("performance");
    let started = Instant::now();

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ValidatorError::io(path, e))?;
    let digest = blake3::hash(&bytes);

    let elapsed = started.elapsed();
    let size_mb = bytes.len() as f64 / (1024.0 * 1024.0);
    let load_time_ms = elapsed.as_secs_f64() * 1000.0;

    outcome.metrics.insert("load_time_ms".into(), load_time_ms);
    outcome.metrics.insert("file_size_mb".into(), size_mb);
    outcome
        .details
        .insert("blake3_digest".into(), digest.to_hex().to_string());
    if elapsed.as_secs_f64() > 0.0 {
        outcome
            .metrics
            .insert("read_throughput_mb_s".into(), size_mb / elapsed.as_secs_f64());
    }

    if elapsed > config.read_budget() {
        outcome.warn(format!(
            "reading the module took {:.0}ms, above the {}ms budget",
            load_time_ms, config.read_budget_ms
        ));
    }

    debug!(load_time_ms, size_mb, "Performance smoke test finished");
    Ok(outcome)
}

pub(crate) async fn security_smoke(path: &Path) -> ValidatorResult<SubTestOutcome> {
    let mut outcome = SubTestOutcome::new("security");

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ValidatorError::io(path, e))?;
    let entries = archive_entries(&bytes);
    outcome.metrics.insert("archive_entries".into(), entries.len() as f64);

    for entry in entries.iter().filter(|e| is_unsafe_entry(e)) {
        outcome.fail(format!("archive entry '{}' escapes the install directory", entry));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ValidatorError::io(path, e))?;
        if metadata.permissions().mode() & 0o002 != 0 {
            outcome.warn("module file is world-writable");
        }
    }

    Ok(outcome)
}

pub(crate) async fn integration_smoke(path: &Path, workspace: &Path) -> ValidatorResult<SubTestOutcome> {
    let mut outcome = SubTestOutcome::new("integration");

    let file_name = path
        .file_name()
        .ok_or_else(|| ValidatorError::Internal("module path has no file name".into()))?;
    let staged = workspace.join(file_name);

    tokio::fs::copy(path, &staged)
        .await
        .map_err(|e| ValidatorError::io(&staged, e))?;

    let original = tokio::fs::read(path)
        .await
        .map_err(|e| ValidatorError::io(path, e))?;
    let copy = tokio::fs::read(&staged)
        .await
        .map_err(|e| ValidatorError::io(&staged, e))?;

    if original.len() != copy.len() || blake3::hash(&original) != blake3::hash(&copy) {
        outcome.fail("staged copy of the module does not match the original");
    }

    if !archive_entries(&original).iter().any(|e| e == MANIFEST_ENTRY) {
        outcome.warn(format!("no {} manifest found at the archive root", MANIFEST_ENTRY));
    }

    Ok(outcome)
}
