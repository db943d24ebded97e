//! Structural type fingerprints using blake3.
//!
//! Two storage types are equivalent when their resolved shapes are equal,
//! regardless of the keys and labels the compiler picked for them. Compiler
//! struct keys embed AST ids (`t_struct(Config)1234_storage`) that change from
//! build to build, so no key ever enters a fingerprint of a resolvable type.
//!
//! # Canonical form
//!
//! Every dictionary entry is hashed bottom-up into a node digest:
//!
//! - The node's own structural fields: `encoding`, `numberOfBytes`, and for
//!   each member its `label`, `slot` and `offset`.
//! - For every reference (`key`, `value`, `base`, member `type`): the child's
//!   node digest if it resolves, the bare key if it does not, or a
//!   back-reference counted in levels up the resolution path when the child
//!   is already being resolved (a struct holding a mapping of itself).
//! - Noise never enters a digest: type labels, member `contract` paths and
//!   `astId` (which does not survive deserialization).
//!
//! The fingerprint is the first [`TYPE_HASH_LEN`] hex characters of the root
//! node's digest.
//!
//! # Sharing
//!
//! Node digests are memoized, so a type reused by many members is hashed
//! once. A digest depends on the resolution path only through back-references,
//! which can only target ancestors in the same strongly connected component
//! of the reference graph. The memo key is therefore the type key plus the
//! trailing run of the path inside that component; for acyclic types the run
//! is empty and the digest is shared everywhere.
//!
//! # Determinism
//!
//! Nodes are plain structs and `Vec`s with a fixed field order, serialized
//! with `serde_json::to_vec`. No map is iterated while hashing.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::error::CoreError;
use crate::types::{Encoding, MemberDefinition, TypeDefinition, TypeDictionary};

/// Nesting limit for type resolution. Real layouts stay in single digits.
pub const MAX_TYPE_DEPTH: usize = 64;

/// Limit on node digests computed for one fingerprint. Only densely cyclic
/// dictionaries get near it.
pub const MAX_RESOLVE_STEPS: usize = 100_000;

/// Number of hex characters kept from the digest.
pub const TYPE_HASH_LEN: usize = 12;

/// A type definition with its references expanded, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedType {
    pub label: String,
    pub encoding: Encoding,
    pub number_of_bytes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<TypeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<ResolvedMember>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<TypeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<TypeRef>,
}

/// A reference from one type to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TypeRef {
    Resolved(Box<ResolvedType>),
    /// The key did not name a dictionary entry.
    Unresolved(String),
    /// Back-reference to a type already being resolved, counted in levels
    /// up the resolution path (`1` is the enclosing type).
    Recursive(usize),
    /// A composite type already expanded earlier in the same resolution.
    Repeated {
        #[serde(rename = "ref")]
        key: String,
    },
}

/// A struct member whose type has been resolved. The member's `contract`
/// path is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMember {
    pub label: String,
    pub offset: u64,
    pub slot: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl ResolvedType {
    /// The label shown when presenting this type: the value type's label for
    /// mappings, otherwise the type's own.
    pub fn display_label(&self) -> &str {
        match &self.value {
            Some(TypeRef::Resolved(value)) => &value.label,
            _ => &self.label,
        }
    }
}

/// What a node digest records about one reference.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum ChildRef<'t> {
    Digest(String),
    Unresolved(&'t str),
    Recursive(usize),
}

#[derive(Serialize)]
struct NodeMember<'t> {
    label: &'t str,
    offset: u64,
    slot: &'t str,
    #[serde(rename = "type")]
    ty: ChildRef<'t>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Node<'t> {
    encoding: Encoding,
    number_of_bytes: &'t str,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<ChildRef<'t>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    members: Option<Vec<NodeMember<'t>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<ChildRef<'t>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<ChildRef<'t>>,
}

/// A memoized node digest and the number of levels below and including the
/// node, used to apply the depth cap on cache hits.
#[derive(Debug, Clone, Copy)]
struct NodeDigest {
    hash: blake3::Hash,
    height: usize,
}

/// Resolves and fingerprints types of one contract's dictionary.
pub struct Canonicalizer<'a> {
    contract: &'a str,
    types: &'a TypeDictionary,
    /// Component id of every key that sits on a cycle of references.
    cycles: HashMap<&'a str, usize>,
    digests: HashMap<(&'a str, Vec<&'a str>), NodeDigest>,
    fingerprints: HashMap<String, String>,
    steps: usize,
}

impl<'a> Canonicalizer<'a> {
    pub fn new(contract: &'a str, types: &'a TypeDictionary) -> Self {
        Canonicalizer {
            contract,
            types,
            cycles: cyclic_components(types),
            digests: HashMap::new(),
            fingerprints: HashMap::new(),
            steps: 0,
        }
    }

    /// Returns the structural fingerprint of `type_key`.
    pub fn fingerprint(&mut self, type_key: &str) -> Result<String, CoreError> {
        if let Some(hash) = self.fingerprints.get(type_key) {
            return Ok(hash.clone());
        }
        let (key, def) = self.lookup(type_key)?;
        self.steps = 0;
        let digest = self.digest(key, def, &mut Vec::new())?;
        let hex = digest.hash.to_hex();
        let fingerprint = hex.as_str()[..TYPE_HASH_LEN].to_string();
        self.fingerprints.insert(type_key.to_string(), fingerprint.clone());
        Ok(fingerprint)
    }

    /// Resolves `type_key` with labels kept, for display.
    ///
    /// Each composite type is expanded once; later references to it become
    /// [`TypeRef::Repeated`], so the output stays linear in the dictionary.
    /// Fails with [`CoreError::TypeNotFound`] if `type_key` itself is absent.
    pub fn resolve(&self, type_key: &str) -> Result<ResolvedType, CoreError> {
        let (key, def) = self.lookup(type_key)?;
        let mut path = vec![key];
        let mut expanded = HashSet::from([key]);
        self.resolve_definition(def, &mut path, &mut expanded)
    }

    fn lookup(&self, type_key: &str) -> Result<(&'a str, &'a TypeDefinition), CoreError> {
        let types: &'a TypeDictionary = self.types;
        types
            .get_key_value(type_key)
            .map(|(key, def)| (key.as_str(), def))
            .ok_or_else(|| CoreError::TypeNotFound {
                contract: self.contract.to_string(),
                type_key: type_key.to_string(),
            })
    }

    fn depth_error(&self, path: &[&str], key: &str) -> CoreError {
        CoreError::TypeDepthExceeded {
            contract: self.contract.to_string(),
            type_key: path.first().copied().unwrap_or(key).to_string(),
            limit: MAX_TYPE_DEPTH,
        }
    }

    /// The trailing run of `path` inside `key`'s cycle component.
    fn cycle_context(&self, key: &str, path: &[&'a str]) -> Vec<&'a str> {
        let Some(&component) = self.cycles.get(key) else {
            return Vec::new();
        };
        let start = path
            .iter()
            .rposition(|k| self.cycles.get(k) != Some(&component))
            .map_or(0, |i| i + 1);
        path[start..].to_vec()
    }

    /// Digest of `key`, reached with `path` holding its ancestors.
    fn digest(
        &mut self,
        key: &'a str,
        def: &'a TypeDefinition,
        path: &mut Vec<&'a str>,
    ) -> Result<NodeDigest, CoreError> {
        let memo_key = (key, self.cycle_context(key, path));
        if let Some(digest) = self.digests.get(&memo_key).copied() {
            if path.len() + digest.height > MAX_TYPE_DEPTH {
                return Err(self.depth_error(path, key));
            }
            return Ok(digest);
        }

        self.steps += 1;
        if self.steps > MAX_RESOLVE_STEPS {
            return Err(CoreError::TypeTooComplex {
                contract: self.contract.to_string(),
                type_key: path.first().copied().unwrap_or(key).to_string(),
                limit: MAX_RESOLVE_STEPS,
            });
        }
        if path.len() + 1 > MAX_TYPE_DEPTH {
            return Err(self.depth_error(path, key));
        }

        path.push(key);
        let node = self.digest_node(def, path);
        path.pop();
        let digest = node?;

        self.digests.insert(memo_key, digest);
        Ok(digest)
    }

    /// Hashes `def`, whose key is the last entry of `path`.
    fn digest_node(
        &mut self,
        def: &'a TypeDefinition,
        path: &mut Vec<&'a str>,
    ) -> Result<NodeDigest, CoreError> {
        let mut below = 0;

        let key = self.child_ref(def.key.as_deref(), path, &mut below)?;
        let members = match &def.members {
            Some(members) => {
                let mut out = Vec::with_capacity(members.len());
                for m in members {
                    let ty = self.child_ref(Some(m.type_key.as_str()), path, &mut below)?;
                    out.push(NodeMember {
                        label: &m.label,
                        offset: m.offset,
                        slot: &m.slot,
                        ty: ty.unwrap_or(ChildRef::Unresolved(&m.type_key)),
                    });
                }
                Some(out)
            }
            None => None,
        };
        let value = self.child_ref(def.value.as_deref(), path, &mut below)?;
        let base = self.child_ref(def.base.as_deref(), path, &mut below)?;

        let node = Node {
            encoding: def.encoding,
            number_of_bytes: &def.number_of_bytes,
            key,
            members,
            value,
            base,
        };
        let bytes = serde_json::to_vec(&node)?;
        Ok(NodeDigest {
            hash: blake3::hash(&bytes),
            height: below + 1,
        })
    }

    fn child_ref(
        &mut self,
        key: Option<&'a str>,
        path: &mut Vec<&'a str>,
        below: &mut usize,
    ) -> Result<Option<ChildRef<'a>>, CoreError> {
        let Some(key) = key else {
            return Ok(None);
        };
        if let Some(pos) = path.iter().rposition(|k| *k == key) {
            return Ok(Some(ChildRef::Recursive(path.len() - pos)));
        }
        match self.lookup(key) {
            Ok((key, def)) => {
                let digest = self.digest(key, def, path)?;
                *below = (*below).max(digest.height);
                Ok(Some(ChildRef::Digest(digest.hash.to_hex().to_string())))
            }
            Err(_) => Ok(Some(ChildRef::Unresolved(key))),
        }
    }

    /// `path` holds the keys from the root down to `def`, inclusive.
    fn resolve_definition(
        &self,
        def: &'a TypeDefinition,
        path: &mut Vec<&'a str>,
        expanded: &mut HashSet<&'a str>,
    ) -> Result<ResolvedType, CoreError> {
        if path.len() > MAX_TYPE_DEPTH {
            return Err(self.depth_error(path, ""));
        }

        let members = match &def.members {
            Some(members) => Some(
                members
                    .iter()
                    .map(|m| self.resolve_member(m, path, expanded))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };

        Ok(ResolvedType {
            label: def.label.clone(),
            encoding: def.encoding,
            number_of_bytes: def.number_of_bytes.clone(),
            key: self.resolve_ref(def.key.as_deref(), path, expanded)?,
            members,
            value: self.resolve_ref(def.value.as_deref(), path, expanded)?,
            base: self.resolve_ref(def.base.as_deref(), path, expanded)?,
        })
    }

    fn resolve_member(
        &self,
        member: &'a MemberDefinition,
        path: &mut Vec<&'a str>,
        expanded: &mut HashSet<&'a str>,
    ) -> Result<ResolvedMember, CoreError> {
        let ty = self
            .resolve_ref(Some(member.type_key.as_str()), path, expanded)?
            .unwrap_or_else(|| TypeRef::Unresolved(member.type_key.clone()));
        Ok(ResolvedMember {
            label: member.label.clone(),
            offset: member.offset,
            slot: member.slot.clone(),
            ty,
        })
    }

    fn resolve_ref(
        &self,
        key: Option<&'a str>,
        path: &mut Vec<&'a str>,
        expanded: &mut HashSet<&'a str>,
    ) -> Result<Option<TypeRef>, CoreError> {
        let Some(key) = key else {
            return Ok(None);
        };
        if let Some(pos) = path.iter().rposition(|k| *k == key) {
            return Ok(Some(TypeRef::Recursive(path.len() - pos)));
        }

        let Ok((key, def)) = self.lookup(key) else {
            return Ok(Some(TypeRef::Unresolved(key.to_string())));
        };
        if !def.references().is_empty() && !expanded.insert(key) {
            return Ok(Some(TypeRef::Repeated {
                key: key.to_string(),
            }));
        }

        path.push(key);
        let resolved = self.resolve_definition(def, path, expanded);
        path.pop();
        Ok(Some(TypeRef::Resolved(Box::new(resolved?))))
    }
}

/// Maps every key on a reference cycle (including a self-reference) to the
/// id of its strongly connected component.
fn cyclic_components(types: &TypeDictionary) -> HashMap<&str, usize> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(types.len());
    for key in types.keys() {
        index.insert(key.as_str(), graph.add_node(key.as_str()));
    }
    for (key, def) in types {
        let from = index[key.as_str()];
        for target in def.references() {
            if let Some(&to) = index.get(target) {
                graph.update_edge(from, to, ());
            }
        }
    }

    let mut cycles = HashMap::new();
    for (id, component) in tarjan_scc(&graph).into_iter().enumerate() {
        let cyclic = match component.as_slice() {
            [single] => graph.contains_edge(*single, *single),
            _ => true,
        };
        if cyclic {
            for node in component {
                cycles.insert(graph[node], id);
            }
        }
    }
    cycles
}

/// Computes the fingerprint of a single type without keeping a cache.
pub fn type_hash(contract: &str, type_key: &str, types: &TypeDictionary) -> Result<String, CoreError> {
    Canonicalizer::new(contract, types).fingerprint(type_key)
}
