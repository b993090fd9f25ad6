//! CLI module
//!
//! Command-line interface for the Billomat API.
//!
//! # Commands
//!
//! - `resources` - List known resource paths
//! - `list` - Fetch a whole collection
//! - `get` - Fetch one record
//! - `children` - Batch child records by parent id
//! - `delete` - Delete one record
//! - `pdf` - Download a document PDF

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
