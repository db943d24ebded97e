//! Core error types for slotguard-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Every variant
//! here is a data-integrity failure: the compiler output handed to the
//! extractor is malformed. Layout incompatibilities are never errors; they are
//! reported as diagnostics by `slotguard-check`.

use thiserror::Error;

/// Core errors produced by the slotguard-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A type key referenced by a variable or a nested type is absent from
    /// the contract's type dictionary.
    #[error("type not found in contract '{contract}': '{type_key}'")]
    TypeNotFound { contract: String, type_key: String },

    /// Type resolution nested deeper than the recursion cap without
    /// revisiting a type.
    #[error("type '{type_key}' in contract '{contract}' nests deeper than {limit} levels")]
    TypeDepthExceeded {
        contract: String,
        type_key: String,
        limit: usize,
    },

    /// Resolving a type expanded more distinct (type, recursion context)
    /// pairs than the work limit allows.
    #[error("type '{type_key}' in contract '{contract}' needs more than {limit} resolution steps")]
    TypeTooComplex {
        contract: String,
        type_key: String,
        limit: usize,
    },

    /// A slot was not a decimal integer string.
    #[error("invalid slot '{slot}' for variable '{variable}' in contract '{contract}'")]
    InvalidSlot {
        contract: String,
        variable: String,
        slot: String,
    },

    /// A byte offset fell outside a 32-byte slot.
    #[error("invalid offset {offset} for variable '{variable}' in contract '{contract}'")]
    InvalidOffset {
        contract: String,
        variable: String,
        offset: u64,
    },

    /// Canonical serialization of a resolved type failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
