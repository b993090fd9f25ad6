//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Billomat API command-line client
#[derive(Parser, Debug)]
#[command(name = "billomat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML); `BILLOMAT_*` variables are used when absent
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List known resource paths
    Resources,

    /// Fetch every record of a resource
    List {
        /// Resource path, e.g. `invoices`
        resource: String,

        /// Page size
        #[arg(long)]
        per_page: Option<u32>,

        /// Search parameter as `key=value` (repeatable)
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,

        /// Fetch pages 2..N concurrently
        #[arg(long)]
        concurrent: bool,
    },

    /// Fetch one record
    Get {
        /// Resource path
        resource: String,
        /// Record id
        id: String,
    },

    /// Fetch child records for several parent ids at once
    Children {
        /// Child resource path, e.g. `invoice-items`
        resource: String,
        /// Parent ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete one record
    Delete {
        /// Resource path
        resource: String,
        /// Record id
        id: String,
    },

    /// Download the PDF of a document
    Pdf {
        /// Resource path, e.g. `invoices`
        resource: String,
        /// Document id
        id: String,
        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one record per line)
    Json,
    /// Indented JSON
    Pretty,
}

/// Parse `key=value`
fn parse_filter(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}
