//! Report and layout rendering for CLI commands
//!
//! - Markdown upgrade report (for PR comments and CI artifacts)
//! - Plain terminal text with a totals line
//! - Layout table of a snapshot document

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

use slotguard_check::{totals, unified_diff, AggregateReport, Diagnostic};
use slotguard_core::SnapshotDocument;

const LAYOUT_HEADERS: [&str; 6] = [
    "contract",
    "state_variable",
    "storage_slot",
    "offset",
    "type",
    "type_hash",
];

/// Render the aggregate report as markdown.
///
/// Contracts without findings are left out.
pub fn render_markdown(report: &AggregateReport) -> String {
    let mut out = String::new();

    for (name, result) in report {
        if result.is_clean() {
            continue;
        }
        out.push_str(&format!("## {}\n\n", name));

        out.push_str("### ❌ Errors\n\n");
        markdown_section(&mut out, &result.error);

        out.push_str("### ⚠️ Warnings\n\n");
        markdown_section(&mut out, &result.warning);

        out.push_str("-----\n\n");
    }

    if out.is_empty() {
        out.push_str("No storage layout incompatibilities found.\n");
    }
    out
}

fn markdown_section(out: &mut String, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        out.push_str("None\n\n");
        return;
    }
    for diagnostic in diagnostics {
        out.push_str(&format!("- **Variable:** `{}`\n", diagnostic.variable));
        out.push_str(&format!("  **Rule:** `{}`\n\n", diagnostic.rule));
        markdown_diff_block(out, &diagnostic.diff);

        if let Some(defs) = &diagnostic.type_definitions {
            out.push_str(&format!(
                "  **Type definition changes for `{}`:**\n\n",
                defs.label
            ));
            markdown_diff_block(out, &unified_diff(&defs.expected, &defs.got));
        }
    }
}

fn markdown_diff_block(out: &mut String, diff: &str) {
    out.push_str("  ```diff\n");
    for line in diff.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("  ```\n\n");
}

/// Render the aggregate report as plain text, ending with a totals line.
pub fn render_text(report: &AggregateReport) -> String {
    let mut out = String::new();

    for (name, result) in report {
        if result.is_clean() {
            continue;
        }
        out.push_str(name);
        out.push('\n');
        for diagnostic in result.diagnostics() {
            out.push_str(&format!(
                "  {} [{}] {}\n",
                diagnostic.severity, diagnostic.rule, diagnostic.variable
            ));
            push_indented(&mut out, &diagnostic.diff, 6);
            if let Some(defs) = &diagnostic.type_definitions {
                out.push_str(&format!("    type definition changes for {}:\n", defs.label));
                push_indented(&mut out, &unified_diff(&defs.expected, &defs.got), 6);
            }
        }
        out.push('\n');
    }

    let (errors, warnings) = totals(report);
    out.push_str(&format!("Found {} errors and {} warnings\n", errors, warnings));
    out
}

fn push_indented(out: &mut String, text: &str, indent: usize) {
    for line in text.lines() {
        out.push_str(&" ".repeat(indent));
        out.push_str(line);
        out.push('\n');
    }
}

/// Build a table with one row per state variable of every contract.
pub fn render_layout_table(document: &SnapshotDocument) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = LAYOUT_HEADERS
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for contract in &document.contracts {
        for var in &contract.state_variables {
            let type_label = contract
                .type_definition(&var.type_key)
                .map(|def| def.label.as_str())
                .unwrap_or(var.type_key.as_str());
            table.add_row(vec![
                contract.name.clone(),
                var.name.clone(),
                var.slot.to_string(),
                var.offset.to_string(),
                type_label.to_string(),
                var.type_hash.clone(),
            ]);
        }
    }

    table
}
