//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Branchcount host - serve branch count facts for catalog entities.
#[derive(Debug, Parser)]
#[command(name = "branchcount-host")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// App config file (.yaml, .yml, .toml or .json)
    #[arg(short, long, env = "BRANCHCOUNT_CONFIG")]
    pub config: PathBuf,

    /// Command to run (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve,

    /// Collect facts once and print them as JSON
    Collect(CollectArgs),
}

/// Arguments for the collect command.
#[derive(Debug, Parser)]
pub struct CollectArgs {
    /// JSON file holding an array of catalog entities
    #[arg(short, long)]
    pub entities: PathBuf,

    /// Only run this collector
    #[arg(long)]
    pub collector: Option<String>,
}
