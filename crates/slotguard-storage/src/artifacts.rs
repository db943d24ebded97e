//! Build-info artifact loading.
//!
//! A build directory holds one JSON artifact per compiler run. Artifacts are
//! read in sorted path order so that "first artifact wins" for duplicate
//! contract names is stable across platforms.

use std::fs;
use std::path::{Path, PathBuf};

use slotguard_core::{BuildInfo, SnapshotBuilder, SnapshotDocument};

use crate::error::StorageError;

/// Reads one build-info artifact.
pub fn read_build_info(path: &Path) -> Result<BuildInfo, StorageError> {
    let text = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| StorageError::serialization(path, e))
}

/// Paths of every `*.json` file directly inside `dir`, sorted.
pub fn build_info_paths(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| StorageError::io(dir, e))? {
        let path = entry.map_err(|e| StorageError::io(dir, e))?.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Reads every build-info artifact in `dir`, paired with its path.
pub fn load_build_infos(dir: &Path) -> Result<Vec<(PathBuf, BuildInfo)>, StorageError> {
    build_info_paths(dir)?
        .into_iter()
        .map(|path| {
            let build_info = read_build_info(&path)?;
            Ok((path, build_info))
        })
        .collect()
}

/// Extracts one snapshot document from every artifact in `dir`.
///
/// Extraction failures carry the path of the offending artifact.
pub fn extract_directory(dir: &Path) -> Result<SnapshotDocument, StorageError> {
    let artifacts = load_build_infos(dir)?;
    if artifacts.is_empty() {
        tracing::warn!(dir = %dir.display(), "no build-info artifacts found");
    }

    let mut builder = SnapshotBuilder::new();
    for (path, build_info) in &artifacts {
        let added = builder
            .add_build_info(build_info)
            .map_err(|source| StorageError::Extraction {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), contracts = added, "artifact extracted");
    }
    Ok(builder.finish())
}
