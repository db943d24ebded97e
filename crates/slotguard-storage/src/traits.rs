//! The [`SnapshotStore`] trait defining the storage contract for snapshot
//! documents.
//!
//! Snapshots are addressed by a plain name (typically a release tag). All
//! backends validate names the same way and return [`StorageError::NotFound`]
//! for names they do not hold, so they are swappable in tests.

use slotguard_core::SnapshotDocument;

use crate::error::StorageError;

/// The storage contract for exported snapshot documents.
///
/// The trait is synchronous; the checker reads a handful of small files
/// per run.
pub trait SnapshotStore {
    /// Stores `document` under `name`, replacing any previous version.
    fn save(&mut self, name: &str, document: &SnapshotDocument) -> Result<(), StorageError>;

    /// Loads the document stored under `name`.
    fn load(&self, name: &str) -> Result<SnapshotDocument, StorageError>;

    /// Returns whether a document is stored under `name`.
    fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Lists stored names in ascending order.
    fn list(&self) -> Result<Vec<String>, StorageError>;

    /// Removes the document stored under `name`.
    fn delete(&mut self, name: &str) -> Result<(), StorageError>;
}
