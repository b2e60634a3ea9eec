// src/cli.rs
//! CLI definitions for the notices generator
//!
//! Command implementations live in `main.rs`; this module only describes
//! the command line.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notices")]
#[command(author = "Notices Contributors")]
#[command(version)]
#[command(about = "Generate a third-party license notices file for a project's dependencies", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: ~/.config/notices/config.toml when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// GitHub token for API lookups (overrides GITHUB_TOKEN and the config file)
    #[arg(long, global = true, value_name = "TOKEN")]
    pub github_token: Option<String>,

    /// Number of records resolved concurrently
    #[arg(short = 'j', long, global = true, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a directory for binaries and write their license notices
    Scan {
        /// Directory to scan
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Only include binaries whose path matches this regex
        #[arg(short, long, value_name = "REGEX")]
        filter: Option<String>,

        /// Output file (default: <DIR>/third-party-notices.txt)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Resolve records from a JSON file and write their license notices
    Resolve {
        /// JSON array of dependency records
        records: PathBuf,

        /// Output file (default: third-party-notices.txt next to RECORDS)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}
