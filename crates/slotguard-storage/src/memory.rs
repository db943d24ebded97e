//! In-memory implementation of [`SnapshotStore`].
//!
//! [`InMemoryStore`] has the same naming and validation semantics as
//! [`DirectoryStore`](crate::directory::DirectoryStore) and is used by tests
//! and by callers that compare freshly extracted snapshots without touching
//! disk.

use std::collections::BTreeMap;

use slotguard_core::SnapshotDocument;

use crate::error::StorageError;
use crate::traits::SnapshotStore;
use crate::types::validate_snapshot_name;

/// Snapshot documents held in a sorted map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    documents: BTreeMap<String, SnapshotDocument>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }
}

impl SnapshotStore for InMemoryStore {
    fn save(&mut self, name: &str, document: &SnapshotDocument) -> Result<(), StorageError> {
        validate_snapshot_name(name)?;
        document
            .validate()
            .map_err(|source| StorageError::Integrity {
                name: name.to_string(),
                source,
            })?;
        self.documents.insert(name.to_string(), document.clone());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<SnapshotDocument, StorageError> {
        validate_snapshot_name(name)?;
        self.documents
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    fn exists(&self, name: &str) -> Result<bool, StorageError> {
        validate_snapshot_name(name)?;
        Ok(self.documents.contains_key(name))
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.documents.keys().cloned().collect())
    }

    fn delete(&mut self, name: &str) -> Result<(), StorageError> {
        validate_snapshot_name(name)?;
        self.documents
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }
}
