//! Storage slot indices.
//!
//! Slots are kept as decimal strings because hashed layouts (mappings,
//! dynamic arrays, ERC-7201 namespaces) produce indices far beyond 64 bits.
//! [`Slot`] validates the digits once and normalizes leading zeros so that
//! string equality is numeric equality.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of one storage slot in bytes. Offsets are always below this.
pub const SLOT_SIZE: u8 = 32;

/// A slot string that is not a non-empty run of ASCII decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a decimal slot index: '{0}'")]
pub struct ParseSlotError(pub String);

/// A storage slot index of arbitrary size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slot(String);

impl Slot {
    /// Parses a decimal slot index, stripping leading zeros.
    pub fn parse(raw: &str) -> Result<Self, ParseSlotError> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseSlotError(raw.to_string()));
        }
        let trimmed = raw.trim_start_matches('0');
        if trimmed.is_empty() {
            Ok(Slot("0".to_string()))
        } else {
            Ok(Slot(trimmed.to_string()))
        }
    }

    /// The normalized decimal digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Slot {
    type Err = ParseSlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::parse(s)
    }
}

impl TryFrom<String> for Slot {
    type Error = ParseSlotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Slot::parse(&value)
    }
}

impl From<Slot> for String {
    fn from(slot: Slot) -> Self {
        slot.0
    }
}

/// Returns true if `offset` addresses a byte inside one slot.
pub fn is_valid_offset(offset: u64) -> bool {
    offset < u64::from(SLOT_SIZE)
}
