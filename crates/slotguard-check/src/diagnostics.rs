//! Compatibility diagnostics.
//!
//! A [`Diagnostic`] is a finding, not a failure: the rule engine always
//! returns a [`ReportResult`], however many rules fire. Each diagnostic
//! carries the old and new state as text plus a unified diff of the two, so a
//! reviewer can act on it without opening the snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::unified_diff;

/// Identifies which compatibility rule produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    /// A variable present in the old layout has no counterpart at its
    /// position in the new layout.
    MissingVariable,
    /// The same-named variable moved to another slot or offset.
    SlotChanged,
    /// A different variable of a different type now occupies the position.
    OrderChanged,
    /// Same variable at the same slot, but its type's structure changed.
    TypeChanged,
    /// Same type at the same position under a new name.
    NameChanged,
}

impl Rule {
    /// Severity is fixed per rule.
    pub fn severity(self) -> Severity {
        match self {
            Rule::MissingVariable | Rule::SlotChanged | Rule::OrderChanged => Severity::Error,
            Rule::TypeChanged | Rule::NameChanged => Severity::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rule::MissingVariable => "MissingVariable",
            Rule::SlotChanged => "SlotChanged",
            Rule::OrderChanged => "OrderChanged",
            Rule::TypeChanged => "TypeChanged",
            Rule::NameChanged => "NameChanged",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a finding affects the upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Existing storage would be misread after the upgrade.
    Error,
    /// Needs human review; not necessarily breaking.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Old and new type definitions attached to a type change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinitions {
    /// Display label of the changed type (the value type for mappings).
    pub label: String,
    /// Pretty-printed old definition.
    pub expected: String,
    /// Pretty-printed new definition.
    pub got: String,
}

/// One compatibility finding for one variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Name of the variable in the old layout.
    pub variable: String,
    pub rule: Rule,
    pub severity: Severity,
    /// Old state, as text.
    pub expected: String,
    /// New state, as text.
    pub got: String,
    /// Unified diff of `expected` against `got`.
    pub diff: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_definitions: Option<TypeDefinitions>,
}

impl Diagnostic {
    /// Builds a diagnostic; severity follows the rule and the diff is
    /// computed from the two texts.
    pub fn new(
        rule: Rule,
        variable: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        let expected = expected.into();
        let got = got.into();
        Diagnostic {
            variable: variable.into(),
            rule,
            severity: rule.severity(),
            diff: unified_diff(&expected, &got),
            expected,
            got,
            type_definitions: None,
        }
    }

    pub fn with_type_definitions(mut self, type_definitions: TypeDefinitions) -> Self {
        self.type_definitions = Some(type_definitions);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: variable '{}' expected {} got {}",
            self.severity, self.rule, self.variable, self.expected, self.got
        )
    }
}

/// Findings for one contract, split by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportResult {
    pub error: Vec<Diagnostic>,
    pub warning: Vec<Diagnostic>,
}

impl ReportResult {
    /// Files a diagnostic under its severity.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.error.push(diagnostic),
            Severity::Warning => self.warning.push(diagnostic),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.error.is_empty()
    }

    /// True if no rule fired.
    pub fn is_clean(&self) -> bool {
        self.error.is_empty() && self.warning.is_empty()
    }

    /// Errors followed by warnings.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.error.iter().chain(self.warning.iter())
    }

    /// Diagnostics produced by `rule`.
    pub fn by_rule(&self, rule: Rule) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics().filter(move |d| d.rule == rule)
    }
}
