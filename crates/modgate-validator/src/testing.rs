//! Fixture helpers for building module packages in tests.

use std::path::{Path, PathBuf};

use crate::smoke::{END_OF_ARCHIVE_SIGNATURE, LOCAL_HEADER_SIGNATURE};

/// Build a minimal archive with one empty, stored entry per name.
pub fn module_bytes(entries: &[&str]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for name in entries {
        bytes.extend_from_slice(&LOCAL_HEADER_SIGNATURE);
        // version, flags, method, time, date, crc, sizes
        bytes.extend_from_slice(&[0u8; 22]);
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(name.as_bytes());
    }
    bytes.extend_from_slice(&END_OF_ARCHIVE_SIGNATURE);
    bytes.extend_from_slice(&[0u8; 18]);
    bytes
}

/// Write a module package into `dir` and return its path.
pub fn write_module(dir: &Path, file_name: &str, entries: &[&str]) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, module_bytes(entries)).expect("write fixture module");
    path
}

/// Write a well-formed module with a manifest and one library.
pub fn write_valid_module(dir: &Path) -> PathBuf {
    write_module(dir, "demo-module.modl", &["module.xml", "lib/demo-gateway.jar"])
}
