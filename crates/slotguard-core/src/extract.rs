//! Layout extraction from compiler output.
//!
//! Turns the `storageLayout` section the compiler emits per contract into a
//! [`ContractSnapshot`]. Build-info artifacts bundle the output of one
//! compiler run; [`extract_snapshot`] walks a set of them and aggregates one
//! snapshot per contract name into a [`SnapshotDocument`].
//!
//! Contracts without layout metadata (interfaces, libraries, abstract
//! contracts in some toolchains) are skipped. Malformed metadata is a hard
//! error: an empty snapshot would hide every later incompatibility.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::canon::Canonicalizer;
use crate::error::CoreError;
use crate::slot::{is_valid_offset, Slot};
use crate::snapshot::{ContractSnapshot, SnapshotDocument, StateVariable};
use crate::types::TypeDictionary;

/// One entry of the compiler's `storageLayout.storage` list.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStorageEntry {
    pub label: String,
    pub slot: String,
    pub offset: u64,
    #[serde(rename = "type")]
    pub type_key: String,
    #[serde(rename = "astId", default)]
    pub ast_id: Option<u64>,
    #[serde(default)]
    pub contract: Option<String>,
}

/// A contract's `storageLayout` as emitted by the compiler.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStorageLayout {
    #[serde(default)]
    pub storage: Vec<RawStorageEntry>,
    /// `null` when the contract declares no storage types.
    #[serde(default)]
    pub types: Option<TypeDictionary>,
}

/// Per-contract compiler output; only the layout is read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractOutput {
    #[serde(rename = "storageLayout", default)]
    pub storage_layout: Option<RawStorageLayout>,
}

/// The `output` section of a build-info artifact.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompilerOutput {
    /// `sourceName -> contractName -> output`, in document order.
    #[serde(default)]
    pub contracts: IndexMap<String, IndexMap<String, ContractOutput>>,
}

/// A build-info artifact: the input and output of one compiler run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildInfo {
    #[serde(default)]
    pub id: Option<String>,
    pub output: CompilerOutput,
}

/// Builds the snapshot of one contract.
///
/// Returns `Ok(None)` if the contract carries no layout metadata.
pub fn extract_contract(
    name: &str,
    layout: Option<&RawStorageLayout>,
) -> Result<Option<ContractSnapshot>, CoreError> {
    let Some(layout) = layout else {
        tracing::debug!(contract = name, "no storage layout, skipping");
        return Ok(None);
    };
    let Some(types) = &layout.types else {
        tracing::debug!(contract = name, "storage layout without types, skipping");
        return Ok(None);
    };

    let types = types.clone();
    let mut canon = Canonicalizer::new(name, &types);
    let mut state_variables = Vec::with_capacity(layout.storage.len());

    for entry in &layout.storage {
        let slot = Slot::parse(&entry.slot).map_err(|_| CoreError::InvalidSlot {
            contract: name.to_string(),
            variable: entry.label.clone(),
            slot: entry.slot.clone(),
        })?;
        if !is_valid_offset(entry.offset) {
            return Err(CoreError::InvalidOffset {
                contract: name.to_string(),
                variable: entry.label.clone(),
                offset: entry.offset,
            });
        }
        let type_hash = canon.fingerprint(&entry.type_key)?;
        state_variables.push(StateVariable {
            name: entry.label.clone(),
            slot,
            // Bounded by SLOT_SIZE above.
            offset: entry.offset as u8,
            type_key: entry.type_key.clone(),
            type_hash,
        });
    }
    drop(canon);

    tracing::debug!(
        contract = name,
        variables = state_variables.len(),
        types = types.len(),
        "extracted storage layout"
    );

    Ok(Some(ContractSnapshot {
        name: name.to_string(),
        state_variables,
        types,
    }))
}

/// Extracts every contract with layout metadata from one build-info artifact,
/// in source then contract order.
pub fn extract_build_info(build_info: &BuildInfo) -> Result<Vec<ContractSnapshot>, CoreError> {
    let mut snapshots = Vec::new();
    for contracts in build_info.output.contracts.values() {
        for (name, output) in contracts {
            if let Some(snapshot) = extract_contract(name, output.storage_layout.as_ref())? {
                snapshots.push(snapshot);
            }
        }
    }
    Ok(snapshots)
}

/// Accumulates snapshots from build-info artifacts into one document.
///
/// Documents are keyed by contract name, so the first artifact to define a
/// name wins; later definitions are logged and dropped.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    seen: HashSet<String>,
    document: SnapshotDocument,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        SnapshotBuilder::default()
    }

    /// Extracts one artifact. Returns the number of contracts added.
    pub fn add_build_info(&mut self, build_info: &BuildInfo) -> Result<usize, CoreError> {
        let mut added = 0;
        for snapshot in extract_build_info(build_info)? {
            if !self.seen.insert(snapshot.name.clone()) {
                tracing::warn!(
                    contract = %snapshot.name,
                    build = build_info.id.as_deref().unwrap_or("<unknown>"),
                    "contract already extracted from an earlier artifact, ignoring"
                );
                continue;
            }
            self.document.contracts.push(snapshot);
            added += 1;
        }
        Ok(added)
    }

    pub fn finish(self) -> SnapshotDocument {
        tracing::info!(contracts = self.document.contracts.len(), "snapshot extracted");
        self.document
    }
}

/// Aggregates the snapshots of several build-info artifacts.
pub fn extract_snapshot(artifacts: &[BuildInfo]) -> Result<SnapshotDocument, CoreError> {
    let mut builder = SnapshotBuilder::new();
    for build_info in artifacts {
        builder.add_build_info(build_info)?;
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VAULT_BUILD_INFO: &str = r#"{
        "id": "b1",
        "output": {
            "contracts": {
                "contracts/IVault.sol": {
                    "IVault": { "abi": [] }
                },
                "contracts/Vault.sol": {
                    "Vault": {
                        "abi": [],
                        "storageLayout": {
                            "storage": [
                                {"astId": 3, "contract": "contracts/Vault.sol:Vault",
                                 "label": "owner", "offset": 0, "slot": "0", "type": "t_address"},
                                {"astId": 5, "contract": "contracts/Vault.sol:Vault",
                                 "label": "paused", "offset": 20, "slot": "0", "type": "t_bool"},
                                {"astId": 9, "contract": "contracts/Vault.sol:Vault",
                                 "label": "configs", "offset": 0, "slot": "1",
                                 "type": "t_mapping(t_address,t_struct(Config)7_storage)"}
                            ],
                            "types": {
                                "t_address": {"encoding": "inplace", "label": "address", "numberOfBytes": "20"},
                                "t_bool": {"encoding": "inplace", "label": "bool", "numberOfBytes": "1"},
                                "t_mapping(t_address,t_struct(Config)7_storage)": {
                                    "encoding": "mapping", "key": "t_address",
                                    "label": "mapping(address => struct Vault.Config)",
                                    "numberOfBytes": "32", "value": "t_struct(Config)7_storage"
                                },
                                "t_struct(Config)7_storage": {
                                    "encoding": "inplace", "label": "struct Vault.Config",
                                    "numberOfBytes": "32",
                                    "members": [
                                        {"astId": 6, "contract": "contracts/Vault.sol:Vault",
                                         "label": "limit", "offset": 0, "slot": "0", "type": "t_uint256"}
                                    ]
                                },
                                "t_uint256": {"encoding": "inplace", "label": "uint256", "numberOfBytes": "32"}
                            }
                        }
                    }
                },
                "contracts/Lib.sol": {
                    "Lib": { "storageLayout": { "storage": [], "types": null } }
                }
            }
        }
    }"#;

    fn vault_build_info() -> BuildInfo {
        serde_json::from_str(VAULT_BUILD_INFO).unwrap()
    }

    #[test]
    fn extracts_variables_in_compiler_order() {
        let snapshots = extract_build_info(&vault_build_info()).unwrap();
        assert_eq!(snapshots.len(), 1, "interface and library are skipped");

        let vault = &snapshots[0];
        assert_eq!(vault.name, "Vault");
        let names: Vec<&str> = vault.state_variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["owner", "paused", "configs"]);
        assert_eq!(vault.state_variables[1].offset, 20);
        assert_eq!(vault.state_variables[2].slot.as_str(), "1");
        assert!(vault.validate().is_ok());
    }

    #[test]
    fn type_dictionary_is_copied_without_ast_ids() {
        let snapshots = extract_build_info(&vault_build_info()).unwrap();
        let json = serde_json::to_string(&snapshots[0]).unwrap();
        assert!(!json.contains("astId"));
        assert_eq!(snapshots[0].types.len(), 5);
        assert_eq!(
            snapshots[0].types.keys().next().map(String::as_str),
            Some("t_address")
        );
    }

    #[test]
    fn hashes_match_the_canonicalizer() {
        let snapshots = extract_build_info(&vault_build_info()).unwrap();
        let vault = &snapshots[0];
        for var in &vault.state_variables {
            let expected = crate::canon::type_hash("Vault", &var.type_key, &vault.types).unwrap();
            assert_eq!(var.type_hash, expected);
        }
        assert_ne!(vault.state_variables[0].type_hash, vault.state_variables[1].type_hash);
    }

    #[test]
    fn missing_layout_is_skipped() {
        assert!(extract_contract("IVault", None).unwrap().is_none());
    }

    #[test]
    fn dangling_type_key_is_fatal() {
        let layout: RawStorageLayout = serde_json::from_str(
            r#"{
                "storage": [{"label": "x", "offset": 0, "slot": "0", "type": "t_uint8"}],
                "types": {"t_uint256": {"encoding": "inplace", "label": "uint256", "numberOfBytes": "32"}}
            }"#,
        )
        .unwrap();
        assert!(matches!(
            extract_contract("Broken", Some(&layout)),
            Err(CoreError::TypeNotFound { .. })
        ));
    }

    #[test]
    fn bad_slot_and_offset_are_fatal() {
        let types = r#"{"t_uint256": {"encoding": "inplace", "label": "uint256", "numberOfBytes": "32"}}"#;
        let bad_slot: RawStorageLayout = serde_json::from_str(&format!(
            r#"{{"storage": [{{"label": "x", "offset": 0, "slot": "0x0", "type": "t_uint256"}}], "types": {}}}"#,
            types
        ))
        .unwrap();
        assert!(matches!(
            extract_contract("Broken", Some(&bad_slot)),
            Err(CoreError::InvalidSlot { .. })
        ));

        let bad_offset: RawStorageLayout = serde_json::from_str(&format!(
            r#"{{"storage": [{{"label": "x", "offset": 32, "slot": "0", "type": "t_uint256"}}], "types": {}}}"#,
            types
        ))
        .unwrap();
        assert!(matches!(
            extract_contract("Broken", Some(&bad_offset)),
            Err(CoreError::InvalidOffset { offset: 32, .. })
        ));
    }

    #[test]
    fn first_artifact_wins_for_duplicate_names() {
        let first = vault_build_info();
        let mut second = vault_build_info();
        second.id = Some("b2".into());
        if let Some(layout) = second
            .output
            .contracts
            .get_mut("contracts/Vault.sol")
            .and_then(|c| c.get_mut("Vault"))
            .and_then(|o| o.storage_layout.as_mut())
        {
            layout.storage.truncate(1);
        }

        let doc = extract_snapshot(&[first, second]).unwrap();
        assert_eq!(doc.contracts.len(), 1);
        assert_eq!(doc.contracts[0].state_variables.len(), 3);
    }
}
