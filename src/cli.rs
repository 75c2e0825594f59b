//! Command-line interface definitions for changecache.
//!
//! ```bash
//! # Print the files that changed since the last run
//! changecache check src/
//!
//! # Rebuild-everything semantics: print all files if any of them changed
//! changecache check --cascade src/ include/
//!
//! # Inspect the stored digests
//! changecache show --cache-file build/.changecache
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::digest::DigestAlgorithm;

/// Content-hash change detection for incremental builds.
#[derive(Debug, Parser)]
#[command(name = "changecache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// TOML configuration file
    #[arg(long, value_name = "FILE", global = true, env = "CHANGECACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check files against the cache and print the ones that should be rebuilt
    Check(CheckArgs),
    /// Print the stored digests as JSON
    Show(ShowArgs),
}

/// Arguments for the check subcommand.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Files or directories to check; directories are walked recursively
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Cache file location
    #[arg(long, value_name = "FILE")]
    pub cache_file: Option<PathBuf>,

    /// Print every file if any file changed, nothing otherwise
    #[arg(long)]
    pub cascade: bool,

    /// Fail on the first unreadable file instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Digest algorithm
    #[arg(long, value_enum, value_name = "ALGORITHM")]
    pub algorithm: Option<DigestAlgorithm>,

    /// Digest files on a thread pool before applying the policy
    #[arg(long)]
    pub parallel: bool,

    /// Number of digest threads for --parallel
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Print a JSON report instead of one path per line
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the show subcommand.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Cache file location
    #[arg(long, value_name = "FILE")]
    pub cache_file: Option<PathBuf>,
}
