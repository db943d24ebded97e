//! File-backed implementation of [`SnapshotStore`].
//!
//! Each document lives at `<root>/<name>.json` as pretty-printed JSON with a
//! trailing newline, so exported snapshots diff cleanly under version
//! control. Documents are validated on read and on write.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use slotguard_core::SnapshotDocument;

use crate::error::StorageError;
use crate::traits::SnapshotStore;
use crate::types::{snapshot_path, validate_snapshot_name};

/// Snapshot documents stored as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// The directory is created lazily on the first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `name`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_snapshot_name(name)?;
        Ok(snapshot_path(&self.root, name))
    }
}

impl SnapshotStore for DirectoryStore {
    fn save(&mut self, name: &str, document: &SnapshotDocument) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        document
            .validate()
            .map_err(|source| StorageError::Integrity {
                name: name.to_string(),
                source,
            })?;
        fs::create_dir_all(&self.root).map_err(|e| StorageError::io(&self.root, e))?;
        write_document(&path, document)?;
        tracing::info!(path = %path.display(), contracts = document.contracts.len(), "snapshot saved");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<SnapshotDocument, StorageError> {
        let path = self.path_for(name)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        parse_document(&text, &path)
    }

    fn exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.path_for(name)?.is_file())
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.root, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StorageError::io(&self.root, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&mut self, name: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(name.to_string())),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }
}

/// Reads and validates a snapshot document from an arbitrary path.
pub fn read_document(path: &Path) -> Result<SnapshotDocument, StorageError> {
    let text = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
    parse_document(&text, path)
}

/// Writes a snapshot document as pretty JSON.
pub fn write_document(path: &Path, document: &SnapshotDocument) -> Result<(), StorageError> {
    let mut json =
        serde_json::to_string_pretty(document).map_err(|e| StorageError::serialization(path, e))?;
    json.push('\n');
    fs::write(path, json).map_err(|e| StorageError::io(path, e))
}

fn parse_document(text: &str, path: &Path) -> Result<SnapshotDocument, StorageError> {
    let document: SnapshotDocument =
        serde_json::from_str(text).map_err(|e| StorageError::serialization(path, e))?;
    document
        .validate()
        .map_err(|source| StorageError::Integrity {
            name: path.display().to_string(),
            source,
        })?;
    tracing::debug!(path = %path.display(), contracts = document.contracts.len(), "snapshot loaded");
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotguard_core::{ContractSnapshot, Encoding, Slot, StateVariable, TypeDefinition, TypeDictionary};

    fn token_document() -> SnapshotDocument {
        let mut types = TypeDictionary::new();
        types.insert(
            "t_uint256".into(),
            TypeDefinition::new(Encoding::Inplace, "uint256", "32"),
        );
        SnapshotDocument {
            contracts: vec![ContractSnapshot {
                name: "Token".into(),
                state_variables: vec![StateVariable {
                    name: "supply".into(),
                    slot: Slot::parse("0").unwrap(),
                    offset: 0,
                    type_key: "t_uint256".into(),
                    type_hash: "a1b2c3d4e5f6".into(),
                }],
                types,
            }],
        }
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path().join("snapshots"));
        let doc = token_document();

        assert!(store.list().unwrap().is_empty(), "missing directory lists as empty");
        store.save("v1", &doc).unwrap();

        let path = store.path_for("v1").unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"stateVariables\""));
        assert!(text.contains("\"typeHash\": \"a1b2c3d4e5f6\""));
        assert!(text.ends_with("}\n"));

        assert_eq!(store.load("v1").unwrap(), doc);
        assert!(store.exists("v1").unwrap());
        assert_eq!(store.list().unwrap(), vec!["v1"]);
    }

    #[test]
    fn list_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());
        store.save("b", &token_document()).unwrap();
        store.save("a", &token_document()).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        assert_eq!(store.list().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn missing_and_deleted_snapshots_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());
        assert!(matches!(store.load("v9"), Err(StorageError::NotFound(_))));

        store.save("v1", &token_document()).unwrap();
        store.delete("v1").unwrap();
        assert!(!store.exists("v1").unwrap());
        assert!(matches!(store.delete("v1"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn malformed_json_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"contracts\": [").unwrap();

        let err = read_document(&path).unwrap_err();
        assert!(err.is_malformed_data());
        match err {
            StorageError::Serialization { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected serialization error, got {other:?}"),
        }
    }

    #[test]
    fn dangling_type_key_fails_integrity_check() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = token_document();
        doc.contracts[0].state_variables[0].type_key = "t_bool".into();

        let path = dir.path().join("dangling.json");
        write_document(&path, &doc).unwrap();
        assert!(matches!(
            read_document(&path),
            Err(StorageError::Integrity { .. })
        ));

        let mut store = DirectoryStore::new(dir.path());
        assert!(matches!(
            store.save("dangling", &doc),
            Err(StorageError::Integrity { .. })
        ));
    }

    #[test]
    fn unreadable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_document(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        assert!(!err.is_malformed_data());
    }
}
