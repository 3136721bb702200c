use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect and update Microsoft Money (.mny) files
#[derive(Parser, Debug)]
#[command(name = "mnytool", version, about = "Microsoft Money (.mny) file tool")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Header summary (format, cipher, page count)
    Info {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Check a password without opening any table
    Verify {
        #[arg(long)]
        path: PathBuf,
        /// Password (falls back to MNY_PASSWORD, then empty)
        #[arg(long)]
        password: Option<String>,
    },
    /// List user tables
    Tables {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Columns and indexes of one table
    Schema {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        table: String,
        #[arg(long)]
        json: bool,
    },
    /// Print every row of a table
    Dump {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        table: String,
        /// One JSON object per row
        #[arg(long)]
        json: bool,
    },
    /// Walk an index from its root and print its entries in order
    Index {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        table: String,
        /// Index name (all indexes of the table when omitted)
        #[arg(long)]
        name: Option<String>,
    },
    /// Insert one row (values as a JSON object) and commit
    Insert {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        table: String,
        /// Inline JSON object: {"column": value, ...}
        #[arg(long)]
        values_json: Option<String>,
        /// File with the JSON object
        #[arg(long)]
        values_file: Option<PathBuf>,
        /// Stage and validate only, leave the file untouched
        #[arg(long)]
        dry_run: bool,
    },
}
