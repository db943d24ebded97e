//! Storage layout model, type canonicalization and layout extraction.
//!
//! # Modules
//!
//! - [`slot`]: arbitrary-precision slot indices
//! - [`types`]: the per-contract type dictionary
//! - [`snapshot`]: contract snapshots and the exported snapshot document
//! - [`canon`]: structural type fingerprints (blake3)
//! - [`extract`]: compiler output to snapshots
//! - [`error`]: CoreError

pub mod canon;
pub mod error;
pub mod extract;
pub mod slot;
pub mod snapshot;
pub mod types;

// Re-export commonly used types
pub use canon::{
    type_hash, Canonicalizer, ResolvedMember, ResolvedType, TypeRef, MAX_RESOLVE_STEPS, MAX_TYPE_DEPTH,
    TYPE_HASH_LEN,
};
pub use error::CoreError;
pub use extract::{
    extract_build_info, extract_contract, extract_snapshot, BuildInfo, RawStorageLayout, SnapshotBuilder,
};
pub use slot::{Slot, SLOT_SIZE};
pub use snapshot::{ContractSnapshot, SnapshotDocument, StateVariable};
pub use types::{Encoding, MemberDefinition, TypeDefinition, TypeDictionary};
