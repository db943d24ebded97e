//! Storage error types for slotguard-storage.
//!
//! [`StorageError`] covers the failure modes of reading and writing snapshot
//! documents and build-info artifacts. Every file-backed variant carries the
//! path it failed on.

use std::path::PathBuf;

use slotguard_core::CoreError;
use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading, writing or listing a file failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file was not valid JSON for the expected document.
    #[error("malformed JSON in {}: {source}", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No snapshot is stored under the given name.
    #[error("snapshot not found: {0}")]
    NotFound(String),

    /// The snapshot name cannot be used as a file stem.
    #[error("invalid snapshot name: {0:?}")]
    InvalidName(String),

    /// A build-info artifact could not be turned into snapshots.
    #[error("failed to extract {}: {source}", path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: CoreError,
    },

    /// A stored document parsed but violates a snapshot invariant.
    #[error("integrity error in {name}: {source}")]
    Integrity {
        name: String,
        #[source]
        source: CoreError,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StorageError::Serialization {
            path: path.into(),
            source,
        }
    }

    /// True for failures caused by the content of a file rather than by
    /// the filesystem.
    pub fn is_malformed_data(&self) -> bool {
        matches!(
            self,
            StorageError::Serialization { .. }
                | StorageError::Extraction { .. }
                | StorageError::Integrity { .. }
        )
    }
}
