//! Storage-layer configuration and snapshot naming.

use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Directory snapshots are exported to when none is configured.
pub const DEFAULT_OUT_DIR: &str = ".slotguard";

/// Snapshot name used when none is configured.
pub const DEFAULT_REPORT_NAME: &str = "report";

/// Where an export writes its snapshot document.
///
/// Built by the caller from flags and environment; the storage layer never
/// reads process state itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub out_dir: PathBuf,
    pub name: String,
}

impl ExportConfig {
    pub fn new(out_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        ExportConfig {
            out_dir: out_dir.into(),
            name: name.into(),
        }
    }

    /// `<out_dir>/<name>.json`
    pub fn output_path(&self) -> PathBuf {
        snapshot_path(&self.out_dir, &self.name)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig::new(DEFAULT_OUT_DIR, DEFAULT_REPORT_NAME)
    }
}

pub(crate) fn snapshot_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

/// Rejects names that are empty, hidden, or would escape the store directory.
pub fn validate_snapshot_name(name: &str) -> Result<(), StorageError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if invalid {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
