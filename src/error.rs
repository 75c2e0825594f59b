//! Error types and exit codes.

use serde::Serialize;
use std::path::PathBuf;

use crate::batch::BatchOutput;

/// Errors raised by the change-tracking cache.
///
/// Read failures are local to one item; the batch decides whether to skip
/// the item or abort. Parse failures are fatal at load time. A missing
/// directory on save is downgraded to a warning by [`crate::CacheSession::close`].
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The content of an item could not be read to completion.
    #[error("failed to read content of {name}: {source}")]
    Read {
        /// Name of the item being digested
        name: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the persisted store failed.
    #[error("cache file I/O error at {path}: {source}")]
    Io {
        /// Path of the cache file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The persisted store is not a flat `name -> hex digest` JSON object.
    #[error("failed to parse cache file {path}: {source}")]
    Parse {
        /// Path of the cache file
        path: PathBuf,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The directory that should contain the cache file does not exist.
    #[error("the directory {path} does not exist")]
    DirectoryMissing {
        /// The missing directory
        path: PathBuf,
    },

    /// The store could not be serialized.
    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The worker pool for parallel digesting could not be built.
    #[error("failed to build digest thread pool: {0}")]
    ThreadPool(String),

    /// A strict batch stopped early. Carries what the batch had already
    /// emitted, since those items' digests are already in the store.
    #[error("batch aborted after {} emitted items: {source}", .output.emitted.len())]
    Aborted {
        /// Items emitted before the failure, with the batch report
        output: Box<BatchOutput>,
        /// The failure that stopped the batch
        #[source]
        source: Box<CacheError>,
    },
}

impl CacheError {
    /// Returns `true` for failures that only concern a single item's content.
    #[must_use]
    pub fn is_item_local(&self) -> bool {
        match self {
            Self::Read { .. } => true,
            Self::Aborted { source, .. } => source.is_item_local(),
            _ => false,
        }
    }

    /// Output of the batch that produced this error, if it got that far.
    #[must_use]
    pub fn partial_output(&self) -> Option<&BatchOutput> {
        match self {
            Self::Aborted { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate.
pub type CacheResult<T> = Result<T, CacheError>;

/// Exit codes for the `changecache` binary.
///
/// - 0: Success (at least one item was reported as changed)
/// - 1: General error (unexpected failure)
/// - 2: No changes (every item was a cache hit)
/// - 3: Partial success (some items could not be read)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// At least one item was emitted.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Nothing changed since the last run.
    NoChanges = 2,
    /// Completed, but some items were skipped because they could not be read.
    PartialSuccess = 3,
    /// Interrupted by a shutdown signal.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "CC000",
            Self::GeneralError => "CC001",
            Self::NoChanges => "CC002",
            Self::PartialSuccess => "CC003",
            Self::Interrupted => "CC130",
        }
    }
}

/// Structured error information for `--json-errors` output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "CC001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the run was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
