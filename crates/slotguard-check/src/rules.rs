//! The compatibility rules.
//!
//! Each rule is a pure function of a [`CheckContext`]: one position `index`
//! in the old layout plus both snapshots. Rules run in [`RULES`] order and
//! independently of one another; a position can trigger several of them.
//!
//! All rules compare positionally (`old[index]` against `new[index]`) except
//! [`check_slot_changed`], which looks the old variable up by name across the
//! whole new layout: a slot move only means something for "the same
//! variable", while the other rules ask what now sits at this position.

use slotguard_core::{Canonicalizer, ContractSnapshot, StateVariable};

use crate::diagnostics::{Diagnostic, ReportResult, Rule, TypeDefinitions};
use crate::fields::{changed_fields, Field};

/// One position of the old layout under comparison.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub index: usize,
    pub old: &'a ContractSnapshot,
    pub new: &'a ContractSnapshot,
}

impl<'a> CheckContext<'a> {
    pub fn new(index: usize, old: &'a ContractSnapshot, new: &'a ContractSnapshot) -> Self {
        CheckContext { index, old, new }
    }

    /// The old variable at this position.
    pub fn old_variable(&self) -> Option<&'a StateVariable> {
        self.old.variable(self.index)
    }

    /// The new variable at this position.
    pub fn new_variable(&self) -> Option<&'a StateVariable> {
        self.new.variable(self.index)
    }

    /// Both variables at this position, if both layouts reach it.
    fn positional_pair(&self) -> Option<(&'a StateVariable, &'a StateVariable)> {
        Some((self.old_variable()?, self.new_variable()?))
    }

    /// The new variable carrying the old variable's name.
    ///
    /// If the old layout declares the name more than once, the n-th old
    /// occurrence pairs with the n-th new one; with unique names this is the
    /// first match.
    pub fn same_named_counterpart(&self) -> Option<&'a StateVariable> {
        let old = self.old_variable()?;
        let occurrence = self
            .old
            .state_variables
            .iter()
            .take(self.index)
            .filter(|v| v.name == old.name)
            .count();
        self.new
            .state_variables
            .iter()
            .filter(|v| v.name == old.name)
            .nth(occurrence)
    }
}

/// Signature shared by every rule.
pub type CheckFn = fn(&CheckContext<'_>) -> Option<Diagnostic>;

/// The rule battery, in evaluation order.
pub const RULES: [(Rule, CheckFn); 5] = [
    (Rule::MissingVariable, check_missing_variable),
    (Rule::SlotChanged, check_slot_changed),
    (Rule::OrderChanged, check_order_changed),
    (Rule::TypeChanged, check_type_changed),
    (Rule::NameChanged, check_name_changed),
];

/// Runs every rule against `ctx`, filing findings into `report`.
pub fn run_rules(ctx: &CheckContext<'_>, report: &mut ReportResult) {
    for (_, check) in RULES {
        if let Some(diagnostic) = check(ctx) {
            report.push(diagnostic);
        }
    }
}

fn on_slot(var: &StateVariable) -> String {
    format!("'{}' on slot '{}'", var.name, var.slot)
}

fn on_slot_and_offset(var: &StateVariable) -> String {
    format!("'{}' on slot '{}' offset '{}'", var.name, var.slot, var.offset)
}

fn with_type_on_slot(var: &StateVariable) -> String {
    format!("'{}' with type '{}' on slot '{}'", var.name, var.type_key, var.slot)
}

fn with_type_hash(var: &StateVariable) -> String {
    format!("'{}' with type '{}' ({})", var.name, var.type_key, var.type_hash)
}

/// The old variable's position no longer exists in the new layout.
pub fn check_missing_variable(ctx: &CheckContext<'_>) -> Option<Diagnostic> {
    let old = ctx.old_variable()?;
    if ctx.new_variable().is_some() {
        return None;
    }
    Some(Diagnostic::new(Rule::MissingVariable, &old.name, on_slot(old), "null"))
}

/// The same-named variable now lives at another slot or byte offset.
pub fn check_slot_changed(ctx: &CheckContext<'_>) -> Option<Diagnostic> {
    let old = ctx.old_variable()?;
    let new = ctx.same_named_counterpart()?;
    let changed = changed_fields(old, new);
    if !changed.contains(Field::Slot) && !changed.contains(Field::Offset) {
        return None;
    }
    let (expected, got) = if changed.contains(Field::Offset) {
        (on_slot_and_offset(old), on_slot_and_offset(new))
    } else {
        (on_slot(old), on_slot(new))
    };
    Some(Diagnostic::new(Rule::SlotChanged, &old.name, expected, got))
}

/// An unrelated variable (different name and different type) took the
/// position. A change in only one of the two is left to the type and name
/// rules.
pub fn check_order_changed(ctx: &CheckContext<'_>) -> Option<Diagnostic> {
    let (old, new) = ctx.positional_pair()?;
    let changed = changed_fields(old, new);
    if !(changed.contains(Field::Name) && changed.contains(Field::TypeHash)) {
        return None;
    }
    Some(Diagnostic::new(
        Rule::OrderChanged,
        &old.name,
        with_type_on_slot(old),
        with_type_on_slot(new),
    ))
}

/// Same name, same slot, different type structure. Attaches both resolved
/// type definitions for side-by-side review.
pub fn check_type_changed(ctx: &CheckContext<'_>) -> Option<Diagnostic> {
    let (old, new) = ctx.positional_pair()?;
    let changed = changed_fields(old, new);
    if changed.contains(Field::Name) || changed.contains(Field::Slot) || !changed.contains(Field::TypeHash) {
        return None;
    }

    let (label, expected_def) = render_type(ctx.old, &old.type_key);
    let (_, got_def) = render_type(ctx.new, &new.type_key);
    let diagnostic = Diagnostic::new(
        Rule::TypeChanged,
        &old.name,
        with_type_hash(old),
        with_type_hash(new),
    )
    .with_type_definitions(TypeDefinitions {
        label,
        expected: expected_def,
        got: got_def,
    });
    Some(diagnostic)
}

/// Same type at the same position under another name.
pub fn check_name_changed(ctx: &CheckContext<'_>) -> Option<Diagnostic> {
    let (old, new) = ctx.positional_pair()?;
    let changed = changed_fields(old, new);
    if !changed.contains(Field::Name) || changed.contains(Field::TypeHash) {
        return None;
    }
    Some(Diagnostic::new(
        Rule::NameChanged,
        &old.name,
        with_type_hash(old),
        with_type_hash(new),
    ))
}

/// Label and pretty JSON of a type for display.
///
/// Prefers the fully resolved shape; falls back to the stored definition,
/// then to the bare key, so a damaged dictionary degrades the message rather
/// than the check.
fn render_type(snapshot: &ContractSnapshot, type_key: &str) -> (String, String) {
    match Canonicalizer::new(&snapshot.name, &snapshot.types).resolve(type_key) {
        Ok(resolved) => {
            let label = resolved.display_label().to_string();
            let pretty = serde_json::to_string_pretty(&resolved).unwrap_or_else(|_| type_key.to_string());
            (label, pretty)
        }
        Err(err) => {
            tracing::debug!(contract = %snapshot.name, type_key, error = %err, "cannot resolve type for display");
            match snapshot.type_definition(type_key) {
                Some(def) => (
                    def.label.clone(),
                    serde_json::to_string_pretty(def).unwrap_or_else(|_| type_key.to_string()),
                ),
                None => (type_key.to_string(), type_key.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotguard_core::{Encoding, MemberDefinition, Slot, TypeDefinition, TypeDictionary};

    fn var(name: &str, slot: &str, offset: u8, type_key: &str, type_hash: &str) -> StateVariable {
        StateVariable {
            name: name.into(),
            slot: Slot::parse(slot).unwrap(),
            offset,
            type_key: type_key.into(),
            type_hash: type_hash.into(),
        }
    }

    fn snapshot(vars: Vec<StateVariable>) -> ContractSnapshot {
        let mut types = TypeDictionary::new();
        types.insert("t_uint256".into(), TypeDefinition::new(Encoding::Inplace, "uint256", "32"));
        types.insert("t_bool".into(), TypeDefinition::new(Encoding::Inplace, "bool", "1"));
        ContractSnapshot {
            name: "Vault".into(),
            state_variables: vars,
            types,
        }
    }

    #[test]
    fn rule_order_is_fixed() {
        let order: Vec<Rule> = RULES.iter().map(|(r, _)| *r).collect();
        assert_eq!(
            order,
            vec![
                Rule::MissingVariable,
                Rule::SlotChanged,
                Rule::OrderChanged,
                Rule::TypeChanged,
                Rule::NameChanged,
            ]
        );
    }

    #[test]
    fn missing_variable_texts() {
        let old = snapshot(vec![var("a", "0", 0, "t_uint256", "h1"), var("b", "1", 0, "t_uint256", "h1")]);
        let new = snapshot(vec![var("a", "0", 0, "t_uint256", "h1")]);
        let d = check_missing_variable(&CheckContext::new(1, &old, &new)).unwrap();
        assert_eq!(d.variable, "b");
        assert_eq!(d.expected, "'b' on slot '1'");
        assert_eq!(d.got, "null");
        assert!(check_missing_variable(&CheckContext::new(0, &old, &new)).is_none());
    }

    #[test]
    fn slot_changed_finds_counterpart_by_name() {
        let old = snapshot(vec![var("a", "0", 0, "t_uint256", "h1"), var("b", "1", 0, "t_uint256", "h1")]);
        let new = snapshot(vec![var("b", "0", 0, "t_uint256", "h1"), var("a", "1", 0, "t_uint256", "h1")]);
        let d = check_slot_changed(&CheckContext::new(0, &old, &new)).unwrap();
        assert_eq!(d.expected, "'a' on slot '0'");
        assert_eq!(d.got, "'a' on slot '1'");
    }

    #[test]
    fn repeated_names_pair_by_occurrence() {
        let vars = vec![var("gap", "0", 0, "t_uint256", "h1"), var("gap", "1", 0, "t_uint256", "h1")];
        let old = snapshot(vars.clone());
        let new = snapshot(vars);
        assert!(check_slot_changed(&CheckContext::new(1, &old, &new)).is_none());

        let shifted = snapshot(vec![var("gap", "0", 0, "t_uint256", "h1"), var("gap", "2", 0, "t_uint256", "h1")]);
        let d = check_slot_changed(&CheckContext::new(1, &old, &shifted)).unwrap();
        assert_eq!(d.got, "'gap' on slot '2'");
    }

    #[test]
    fn slot_changed_reports_offset_moves() {
        let old = snapshot(vec![var("flag", "0", 0, "t_bool", "h2")]);
        let new = snapshot(vec![var("flag", "0", 20, "t_bool", "h2")]);
        let d = check_slot_changed(&CheckContext::new(0, &old, &new)).unwrap();
        assert_eq!(d.expected, "'flag' on slot '0' offset '0'");
        assert_eq!(d.got, "'flag' on slot '0' offset '20'");
    }

    #[test]
    fn slot_changed_ignores_vanished_names() {
        let old = snapshot(vec![var("a", "0", 0, "t_uint256", "h1")]);
        let new = snapshot(vec![var("z", "5", 0, "t_uint256", "h1")]);
        assert!(check_slot_changed(&CheckContext::new(0, &old, &new)).is_none());
    }

    #[test]
    fn order_changed_needs_both_name_and_type() {
        let old = snapshot(vec![var("a", "0", 0, "t_uint256", "h1")]);
        let renamed = snapshot(vec![var("b", "0", 0, "t_uint256", "h1")]);
        let retyped = snapshot(vec![var("a", "0", 0, "t_bool", "h2")]);
        let replaced = snapshot(vec![var("b", "0", 0, "t_bool", "h2")]);
        assert!(check_order_changed(&CheckContext::new(0, &old, &renamed)).is_none());
        assert!(check_order_changed(&CheckContext::new(0, &old, &retyped)).is_none());
        let d = check_order_changed(&CheckContext::new(0, &old, &replaced)).unwrap();
        assert_eq!(d.expected, "'a' with type 't_uint256' on slot '0'");
        assert_eq!(d.got, "'b' with type 't_bool' on slot '0'");
    }

    #[test]
    fn type_changed_attaches_definitions() {
        let old = snapshot(vec![var("a", "0", 0, "t_uint256", "h1")]);
        let new = snapshot(vec![var("a", "0", 0, "t_bool", "h2")]);
        let d = check_type_changed(&CheckContext::new(0, &old, &new)).unwrap();
        assert_eq!(d.expected, "'a' with type 't_uint256' (h1)");
        assert_eq!(d.got, "'a' with type 't_bool' (h2)");
        let defs = d.type_definitions.unwrap();
        assert_eq!(defs.label, "uint256");
        assert!(defs.expected.contains("\"numberOfBytes\": \"32\""));
        assert!(defs.got.contains("\"numberOfBytes\": \"1\""));
    }

    #[test]
    fn type_changed_survives_unresolvable_type() {
        let old = snapshot(vec![var("a", "0", 0, "t_gone", "h1")]);
        let new = snapshot(vec![var("a", "0", 0, "t_uint256", "h2")]);
        let d = check_type_changed(&CheckContext::new(0, &old, &new)).unwrap();
        let defs = d.type_definitions.unwrap();
        assert_eq!(defs.label, "t_gone");
        assert_eq!(defs.expected, "t_gone");
    }

    /// Forty nested structs, each holding two members of the next level.
    fn deep_shared_snapshot(leaf: &str, hash: &str) -> ContractSnapshot {
        let mut snap = snapshot(vec![var("root", "0", 0, "t_struct(S0)_storage", hash)]);
        for i in 0..40 {
            let next = if i == 39 {
                leaf.to_string()
            } else {
                format!("t_struct(S{})_storage", i + 1)
            };
            let mut def = TypeDefinition::new(Encoding::Inplace, format!("struct Chain.S{i}"), "64");
            def.members = Some(
                ["left", "right"]
                    .iter()
                    .enumerate()
                    .map(|(slot, label)| MemberDefinition {
                        label: label.to_string(),
                        offset: 0,
                        slot: slot.to_string(),
                        type_key: next.clone(),
                        contract: Some("contracts/Chain.sol:Chain".into()),
                    })
                    .collect(),
            );
            snap.types.insert(format!("t_struct(S{i})_storage"), def);
        }
        snap
    }

    #[test]
    fn type_changed_renders_deep_shared_types() {
        let old = deep_shared_snapshot("t_uint256", "h1");
        let new = deep_shared_snapshot("t_bool", "h2");
        let d = check_type_changed(&CheckContext::new(0, &old, &new)).unwrap();
        let defs = d.type_definitions.unwrap();
        assert_eq!(defs.label, "struct Chain.S0");
        assert!(defs.expected.contains("\"ref\": \"t_struct(S1)_storage\""));
        assert!(defs.got.contains("\"label\": \"bool\""));
        assert!(!defs.expected.contains("contracts/Chain.sol"));
        assert!(!defs.got.contains("\"contract\""));
    }

    #[test]
    fn type_changed_skips_slot_moves() {
        let old = snapshot(vec![var("a", "0", 0, "t_uint256", "h1")]);
        let new = snapshot(vec![var("a", "1", 0, "t_bool", "h2")]);
        assert!(check_type_changed(&CheckContext::new(0, &old, &new)).is_none());
    }

    #[test]
    fn name_changed_requires_same_hash() {
        let old = snapshot(vec![var("a", "0", 0, "t_uint256", "h1")]);
        let new = snapshot(vec![var("b", "0", 0, "t_uint256", "h1")]);
        let d = check_name_changed(&CheckContext::new(0, &old, &new)).unwrap();
        assert_eq!(d.expected, "'a' with type 't_uint256' (h1)");
        assert_eq!(d.got, "'b' with type 't_uint256' (h1)");

        let retyped = snapshot(vec![var("b", "0", 0, "t_bool", "h2")]);
        assert!(check_name_changed(&CheckContext::new(0, &old, &retyped)).is_none());
    }

    #[test]
    fn run_rules_collects_independent_findings() {
        // Position 0 holds an unrelated variable and `a` moved to slot 1.
        let old = snapshot(vec![var("a", "0", 0, "t_uint256", "h1")]);
        let new = snapshot(vec![var("b", "0", 0, "t_bool", "h2"), var("a", "1", 0, "t_uint256", "h1")]);
        let mut report = ReportResult::default();
        run_rules(&CheckContext::new(0, &old, &new), &mut report);
        let rules: Vec<Rule> = report.error.iter().map(|d| d.rule).collect();
        assert_eq!(rules, vec![Rule::SlotChanged, Rule::OrderChanged]);
        assert!(report.warning.is_empty());
    }
}
