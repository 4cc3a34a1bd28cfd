use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use media_archive_core::storage::models::{Ordering, RecordStatus};

#[derive(Debug, Parser)]
#[command(name = "media-archive")]
#[command(about = "Rename, archive and reconcile a personal media collection", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rename staged files to their canonical names using the rename rules
    Rename {
        /// Work directory (defaults to `work_dir` from the configuration)
        #[arg(short, long)]
        work_dir: Option<String>,
        /// Report the plan without renaming anything
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Also list unchanged and excluded files
        #[arg(short, long)]
        verbose: bool,
    },
    /// Move classified files from the work directory into an archive folder
    Save {
        #[arg(short, long)]
        work_dir: Option<String>,
        /// Archive folder name (defaults to today's date)
        #[arg(short, long)]
        archive: Option<String>,
        /// Append `.N` to today's folder name
        #[arg(short, long)]
        split: Option<u32>,
        /// Archive files whose key already exists and repoint the record
        #[arg(short, long)]
        replace: bool,
        /// Archive unmatched files without creating records
        #[arg(long)]
        no_meta: bool,
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Reconcile the archive folders with the record store
    Organize {
        /// Delete older copies of keys found in newer folders
        #[arg(short, long)]
        deduplicate: bool,
        /// Record matched files that have no record
        #[arg(short, long)]
        unsaved: bool,
        /// Soft delete records whose file is gone
        #[arg(short, long)]
        mark_deleted: bool,
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Look up records in the store
    Query {
        #[command(subcommand)]
        query: QueryCommand,
    },
    /// Export analysed records of an archive folder as JSON or CSV
    Export {
        /// Archive folder name
        #[arg(short, long)]
        archive: String,
        #[arg(short, long)]
        source: Option<String>,
        /// Output file (`.json` or `.csv`); JSON on stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Subcommand)]
pub enum QueryCommand {
    /// Print a single record
    One { source: String, id: String },
    /// List records matching the filters
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// SQL LIKE pattern on the folder name
    #[arg(long)]
    pub folder: Option<String>,
    /// SQL LIKE pattern on the file name
    #[arg(long)]
    pub filename: Option<String>,
    #[arg(long = "source")]
    pub sources: Vec<String>,
    #[arg(long = "status")]
    pub statuses: Vec<RecordStatus>,
    /// Only records created at or after this time
    #[arg(long)]
    pub create_from: Option<String>,
    /// Only records analysed at or after this time
    #[arg(long)]
    pub analyse_from: Option<String>,
    #[arg(long)]
    pub include_deleted: bool,
    /// Sort fields, `-field` for descending
    #[arg(long = "order", allow_hyphen_values = true)]
    pub order: Vec<Ordering>,
    #[arg(short, long)]
    pub limit: Option<i64>,
}
