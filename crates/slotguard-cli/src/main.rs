//! Storage layout upgrade checker CLI.
//!
//! Provides the `slotguard` binary:
//! - `export` extracts a snapshot document from a directory of build-info
//!   artifacts and stores it as `<out-dir>/<name>.json`.
//! - `check` compares two snapshot documents and reports every storage
//!   incompatibility of the upgrade.
//! - `list` / `show` inspect previously exported snapshots.
//!
//! Exit codes: 0 = success, 1 = error-severity findings, 2 = malformed
//! snapshot or artifact data, 3 = I/O or storage failure.

mod logging;
mod output;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use slotguard_check::{compare_documents, has_errors, ContractFilter};
use slotguard_storage::{
    extract_directory, read_document, DirectoryStore, ExportConfig, SnapshotStore, StorageError,
    DEFAULT_OUT_DIR, DEFAULT_REPORT_NAME,
};

const EXIT_OK: i32 = 0;
const EXIT_FINDINGS: i32 = 1;
const EXIT_MALFORMED: i32 = 2;
const EXIT_IO: i32 = 3;

/// Storage layout compatibility checks for upgradeable contracts.
#[derive(Parser)]
#[command(name = "slotguard", version, about = "Storage layout upgrade checker")]
struct Cli {
    /// Log debug details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Extract a snapshot document from build-info artifacts.
    Export {
        /// Directory containing build-info JSON artifacts.
        #[arg(short, long)]
        artifacts: PathBuf,

        /// Directory the snapshot is written to.
        #[arg(short, long, env = "SLOTGUARD_DIR", default_value = DEFAULT_OUT_DIR)]
        out_dir: PathBuf,

        /// Snapshot name; the file is `<out-dir>/<name>.json`.
        #[arg(short, long, env = "SLOTGUARD_REPORT_NAME", default_value = DEFAULT_REPORT_NAME)]
        name: String,
    },

    /// Compare two snapshot documents.
    Check {
        /// Snapshot of the deployed version.
        old: PathBuf,

        /// Snapshot of the upgrade candidate.
        new: PathBuf,

        /// Comma-separated contract names to check (default: all).
        #[arg(short, long)]
        contracts: Option<String>,

        /// Also write the markdown report to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format printed to stdout.
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// List exported snapshots.
    List {
        #[arg(short, long, env = "SLOTGUARD_DIR", default_value = DEFAULT_OUT_DIR)]
        out_dir: PathBuf,
    },

    /// Print the layout table of an exported snapshot.
    Show {
        /// Snapshot name.
        name: String,

        #[arg(short, long, env = "SLOTGUARD_DIR", default_value = DEFAULT_OUT_DIR)]
        out_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Markdown,
    Json,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Export {
            artifacts,
            out_dir,
            name,
        } => run_export(&artifacts, ExportConfig::new(out_dir, name)),
        Commands::Check {
            old,
            new,
            contracts,
            output,
            format,
        } => run_check(&old, &new, contracts.as_deref(), output.as_deref(), format),
        Commands::List { out_dir } => run_list(out_dir),
        Commands::Show { name, out_dir } => run_show(out_dir, &name),
    };
    process::exit(exit_code);
}

/// Execute the export subcommand.
fn run_export(artifacts: &Path, config: ExportConfig) -> i32 {
    let document = match extract_directory(artifacts) {
        Ok(doc) => doc,
        Err(e) => return report_storage_error("failed to extract snapshot", &e),
    };

    let mut store = DirectoryStore::new(&config.out_dir);
    if let Err(e) = store.save(&config.name, &document) {
        return report_storage_error("failed to save snapshot", &e);
    }

    println!("{}", output::render_layout_table(&document));
    eprintln!("Snapshot written to {}", config.output_path().display());
    EXIT_OK
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 = no error-severity findings, 1 = findings,
/// 2 = malformed snapshot, 3 = I/O error.
fn run_check(
    old_path: &Path,
    new_path: &Path,
    contracts: Option<&str>,
    output_path: Option<&Path>,
    format: Format,
) -> i32 {
    let old = match read_document(old_path) {
        Ok(doc) => doc,
        Err(e) => return report_storage_error("failed to read old snapshot", &e),
    };
    let new = match read_document(new_path) {
        Ok(doc) => doc,
        Err(e) => return report_storage_error("failed to read new snapshot", &e),
    };

    let filter = contracts.map(ContractFilter::parse);
    if filter.as_ref().is_some_and(ContractFilter::is_empty) {
        tracing::warn!("empty --contracts list, nothing will be checked");
    }
    let report = compare_documents(&old, &new, filter.as_ref());

    match format {
        Format::Text => print!("{}", output::render_text(&report)),
        Format::Markdown => print!("{}", output::render_markdown(&report)),
        Format::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: failed to serialize report: {}", e);
                return EXIT_IO;
            }
        },
    }

    if let Some(path) = output_path {
        if let Err(e) = fs::write(path, output::render_markdown(&report)) {
            eprintln!("Error: failed to write report to '{}': {}", path.display(), e);
            return EXIT_IO;
        }
        tracing::info!(path = %path.display(), "markdown report written");
    }

    if has_errors(&report) {
        EXIT_FINDINGS
    } else {
        EXIT_OK
    }
}

/// Execute the list subcommand.
fn run_list(out_dir: PathBuf) -> i32 {
    match DirectoryStore::new(out_dir).list() {
        Ok(names) => {
            for name in names {
                println!("{}", name);
            }
            EXIT_OK
        }
        Err(e) => report_storage_error("failed to list snapshots", &e),
    }
}

/// Execute the show subcommand.
fn run_show(out_dir: PathBuf, name: &str) -> i32 {
    match DirectoryStore::new(out_dir).load(name) {
        Ok(document) => {
            println!("{}", output::render_layout_table(&document));
            EXIT_OK
        }
        Err(e) => report_storage_error("failed to load snapshot", &e),
    }
}

fn report_storage_error(context: &str, err: &StorageError) -> i32 {
    eprintln!("Error: {}: {}", context, err);
    if err.is_malformed_data() {
        EXIT_MALFORMED
    } else {
        EXIT_IO
    }
}
