//! The storage type dictionary.
//!
//! Mirrors the `types` object of a compiler storage layout: each entry is
//! keyed by an opaque compiler-assigned string (`t_uint256`,
//! `t_struct(Config)1234_storage`, ...) and references other entries by key.
//! The dictionary therefore forms a small string-keyed graph, owned per
//! snapshot. [`IndexMap`] keeps the compiler's emission order so that a
//! snapshot round-trips through JSON unchanged.
//!
//! Deserializing into these types is also the noise-stripping step: fields
//! the model does not name (notably `astId`) are dropped.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A contract's type dictionary, keyed by type key.
pub type TypeDictionary = IndexMap<String, TypeDefinition>;

/// How a type is laid out in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Packed into the slot(s) starting at the variable's own slot.
    Inplace,
    /// Values live at `keccak256(key . slot)`.
    Mapping,
    /// Length at the slot, elements at `keccak256(slot)`.
    DynamicArray,
    /// `bytes`/`string`: short values inline, long values hashed.
    Bytes,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Inplace => "inplace",
            Encoding::Mapping => "mapping",
            Encoding::DynamicArray => "dynamic_array",
            Encoding::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// One entry of the type dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    pub encoding: Encoding,
    /// Display name chosen by the compiler. Never hashed.
    pub label: String,
    /// Size in bytes as a decimal string.
    pub number_of_bytes: String,
    /// Mapping key type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Struct members in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberDefinition>>,
    /// Mapping value type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Array element type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

/// A struct member as emitted inside a struct's type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDefinition {
    pub label: String,
    pub offset: u64,
    /// Slot relative to the start of the struct, as a decimal string.
    pub slot: String,
    #[serde(rename = "type")]
    pub type_key: String,
    /// Declaring contract as `source:Name`. Kept for display, never hashed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
}

impl TypeDefinition {
    /// Creates a definition with no nested references.
    pub fn new(encoding: Encoding, label: impl Into<String>, number_of_bytes: impl Into<String>) -> Self {
        TypeDefinition {
            encoding,
            label: label.into(),
            number_of_bytes: number_of_bytes.into(),
            key: None,
            members: None,
            value: None,
            base: None,
        }
    }

    /// Keys of every dictionary entry this definition refers to, in a fixed
    /// order: key, value, base, then members.
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        refs.extend(self.key.as_deref());
        refs.extend(self.value.as_deref());
        refs.extend(self.base.as_deref());
        if let Some(members) = &self.members {
            refs.extend(members.iter().map(|m| m.type_key.as_str()));
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_drops_ast_ids() {
        let json = r#"{
            "encoding": "inplace",
            "label": "struct Vault.Config",
            "numberOfBytes": "64",
            "members": [
                {"astId": 7, "contract": "contracts/Vault.sol:Vault", "label": "owner",
                 "offset": 0, "slot": "0", "type": "t_address"},
                {"astId": 9, "contract": "contracts/Vault.sol:Vault", "label": "cap",
                 "offset": 0, "slot": "1", "type": "t_uint256"}
            ]
        }"#;
        let def: TypeDefinition = serde_json::from_str(json).unwrap();
        let back = serde_json::to_string(&def).unwrap();
        assert!(!back.contains("astId"));
        assert_eq!(def.encoding, Encoding::Inplace);
        assert_eq!(def.references(), vec!["t_address", "t_uint256"]);
    }

    #[test]
    fn mapping_references_key_then_value() {
        let json = r#"{
            "encoding": "mapping",
            "key": "t_address",
            "label": "mapping(address => uint256)",
            "numberOfBytes": "32",
            "value": "t_uint256"
        }"#;
        let def: TypeDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.encoding, Encoding::Mapping);
        assert_eq!(def.references(), vec!["t_address", "t_uint256"]);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let json = r#"{"encoding": "packed", "label": "x", "numberOfBytes": "1"}"#;
        assert!(serde_json::from_str::<TypeDefinition>(json).is_err());
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let def = TypeDefinition::new(Encoding::Inplace, "uint256", "32");
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"encoding": "inplace", "label": "uint256", "numberOfBytes": "32"})
        );
    }
}
