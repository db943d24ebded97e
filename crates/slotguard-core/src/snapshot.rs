//! Contract snapshots: the canonical, comparison-ready storage layout of one
//! contract at one point in time.
//!
//! Snapshots are produced once by the extractor and never mutated. The order
//! of [`ContractSnapshot::state_variables`] is the compiler's layout order and
//! is load-bearing: positional comparison in `slotguard-check` relies on it.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::slot::{is_valid_offset, Slot};
use crate::types::{TypeDefinition, TypeDictionary};

/// One declared persistent variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateVariable {
    pub name: String,
    pub slot: Slot,
    /// Byte offset within the slot, below 32.
    pub offset: u8,
    /// Key into the owning snapshot's type dictionary.
    #[serde(rename = "type")]
    pub type_key: String,
    /// Structural fingerprint of the resolved type.
    pub type_hash: String,
}

/// One contract's storage layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSnapshot {
    pub name: String,
    pub state_variables: Vec<StateVariable>,
    pub types: TypeDictionary,
}

impl ContractSnapshot {
    /// The variable at layout position `index`, if the layout is that long.
    pub fn variable(&self, index: usize) -> Option<&StateVariable> {
        self.state_variables.get(index)
    }

    /// Looks up a type definition by key.
    pub fn type_definition(&self, type_key: &str) -> Option<&TypeDefinition> {
        self.types.get(type_key)
    }

    /// Checks the snapshot invariants: every offset fits in a slot and every
    /// variable's type resolves in this snapshot's dictionary.
    pub fn validate(&self) -> Result<(), CoreError> {
        for var in &self.state_variables {
            if !is_valid_offset(u64::from(var.offset)) {
                return Err(CoreError::InvalidOffset {
                    contract: self.name.clone(),
                    variable: var.name.clone(),
                    offset: u64::from(var.offset),
                });
            }
            if !self.types.contains_key(&var.type_key) {
                return Err(CoreError::TypeNotFound {
                    contract: self.name.clone(),
                    type_key: var.type_key.clone(),
                });
            }
        }
        Ok(())
    }
}

/// The exported document: every contract of one build, in extraction order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub contracts: Vec<ContractSnapshot>,
}

impl SnapshotDocument {
    /// The snapshot for `name`, if present.
    pub fn contract(&self, name: &str) -> Option<&ContractSnapshot> {
        self.contracts.iter().find(|c| c.name == name)
    }

    /// Contract names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.iter().map(|c| c.name.as_str())
    }

    /// Validates every contract in the document.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.contracts.iter().try_for_each(ContractSnapshot::validate)
    }
}
