//! Persistence for slotguard snapshot documents.
//!
//! Provides the [`SnapshotStore`] trait with a file-backed
//! [`DirectoryStore`] and an [`InMemoryStore`], plus loading of build-info
//! artifacts from a build directory.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: ExportConfig and snapshot naming rules
//! - [`traits`]: SnapshotStore trait definition
//! - [`memory`]: InMemoryStore implementation
//! - [`directory`]: DirectoryStore implementation and document file I/O
//! - [`artifacts`]: build-info discovery and extraction

pub mod artifacts;
pub mod directory;
pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use artifacts::{build_info_paths, extract_directory, load_build_infos, read_build_info};
pub use directory::{read_document, write_document, DirectoryStore};
pub use error::StorageError;
pub use memory::InMemoryStore;
pub use traits::SnapshotStore;
pub use types::{validate_snapshot_name, ExportConfig, DEFAULT_OUT_DIR, DEFAULT_REPORT_NAME};
