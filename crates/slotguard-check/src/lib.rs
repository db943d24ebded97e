//! Storage layout compatibility checking.
//!
//! Compares the snapshot of a deployed contract with the snapshot of its
//! upgrade candidate and classifies every difference:
//! - [`compare`]: one contract, old vs new.
//! - [`compare_documents`]: every contract present in both documents,
//!   optionally restricted by a [`ContractFilter`].
//!
//! Both functions are pure: they read the snapshots and never fail. Findings
//! are [`Diagnostic`]s; any error-severity finding means the upgrade is not
//! storage-safe.

pub mod diagnostics;
pub mod diff;
pub mod fields;
pub mod rules;

pub use diagnostics::{Diagnostic, ReportResult, Rule, Severity, TypeDefinitions};
pub use diff::unified_diff;
pub use fields::{changed_fields, ChangedFields, Field};
pub use rules::{run_rules, CheckContext, CheckFn, RULES};

use std::collections::{BTreeMap, BTreeSet};

use slotguard_core::{ContractSnapshot, SnapshotDocument};

/// Findings per contract name, in name order.
pub type AggregateReport = BTreeMap<String, ReportResult>;

/// Checks an upgrade of one contract.
///
/// Walks the old layout position by position. Variables appended past the
/// end of the old layout start in unused storage and are never reported.
pub fn compare(old: &ContractSnapshot, new: &ContractSnapshot) -> ReportResult {
    let mut report = ReportResult::default();
    for index in 0..old.state_variables.len() {
        let ctx = CheckContext::new(index, old, new);
        run_rules(&ctx, &mut report);
    }
    report
}

/// Restricts which contracts are checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractFilter {
    names: BTreeSet<String>,
}

impl ContractFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ContractFilter {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a comma-separated list (`"Vault, Token"`). Blank entries are
    /// ignored.
    pub fn parse(list: &str) -> Self {
        ContractFilter::new(
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty()),
        )
    }

    pub fn allows(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Checks every contract that appears in both documents.
///
/// Contracts are matched by name. A contract present in only one document
/// has nothing to compare against and is skipped without findings.
pub fn compare_documents(
    old: &SnapshotDocument,
    new: &SnapshotDocument,
    filter: Option<&ContractFilter>,
) -> AggregateReport {
    let mut results = AggregateReport::new();

    for old_contract in &old.contracts {
        let name = old_contract.name.as_str();
        if filter.is_some_and(|f| !f.allows(name)) {
            continue;
        }
        if results.contains_key(name) {
            tracing::warn!(contract = name, "duplicate contract in old snapshot, using the first");
            continue;
        }
        match new.contract(name) {
            Some(new_contract) => {
                let report = compare(old_contract, new_contract);
                tracing::debug!(
                    contract = name,
                    errors = report.error.len(),
                    warnings = report.warning.len(),
                    "compared"
                );
                results.insert(name.to_string(), report);
            }
            None => tracing::debug!(contract = name, "not in new snapshot, skipping"),
        }
    }

    for name in new.names() {
        if old.contract(name).is_none() && filter.map_or(true, |f| f.allows(name)) {
            tracing::debug!(contract = name, "not in old snapshot, skipping");
        }
    }

    results
}

/// True if any contract has an error-severity finding.
pub fn has_errors(report: &AggregateReport) -> bool {
    report.values().any(ReportResult::has_errors)
}

/// Total (errors, warnings) across all contracts.
pub fn totals(report: &AggregateReport) -> (usize, usize) {
    report.values().fold((0, 0), |(errors, warnings), r| {
        (errors + r.error.len(), warnings + r.warning.len())
    })
}
