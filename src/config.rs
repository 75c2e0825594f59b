//! Cache configuration.
//!
//! [`CacheConfig`] is a plain immutable value handed to
//! [`crate::CacheSession::open`]. Library users build it directly; the
//! `changecache` binary layers it from defaults, an optional TOML file and
//! `CHANGECACHE_*` environment variables via [`CacheConfig::load`].

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::batch::BatchMode;
use crate::digest::DigestAlgorithm;

/// File name of the cache file when none is configured.
pub const DEFAULT_CACHE_FILE_NAME: &str = ".changecache";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "CHANGECACHE_";

/// Settings recognised by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path of the persisted store.
    ///
    /// Defaults to [`DEFAULT_CACHE_FILE_NAME`] next to the running executable,
    /// or in the working directory if the executable path is unknown.
    pub cache_file: PathBuf,
    /// Cascade mode: one changed item emits the whole batch. Default `false`.
    pub cascade: bool,
    /// Abort a batch on the first unreadable item. Default `false` (skip it).
    pub strict: bool,
    /// Digest algorithm. Default SHA-256.
    pub algorithm: DigestAlgorithm,
    /// Worker threads for parallel digesting. Default 4.
    pub io_threads: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_file: default_cache_file(),
            cascade: false,
            strict: false,
            algorithm: DigestAlgorithm::default(),
            io_threads: 4,
        }
    }
}

impl CacheConfig {
    /// Configuration with defaults and the given cache file.
    #[must_use]
    pub fn new(cache_file: impl Into<PathBuf>) -> Self {
        Self {
            cache_file: cache_file.into(),
            ..Self::default()
        }
    }

    /// Set the cache file path.
    #[must_use]
    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = path.into();
        self
    }

    /// Enable or disable cascade mode.
    #[must_use]
    pub fn with_cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }

    /// Enable or disable strict mode.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the number of digest threads (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Batch mode implied by [`CacheConfig::cascade`].
    #[must_use]
    pub fn batch_mode(&self) -> BatchMode {
        BatchMode::from_cascade(self.cascade)
    }

    /// Layer defaults, an optional TOML file, then `CHANGECACHE_*` variables.
    ///
    /// A `file` that does not exist contributes nothing.
    ///
    /// # Errors
    ///
    /// Returns the figment error for malformed TOML or values of the wrong type.
    pub fn load(file: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(file).extract()
    }

    /// The provider stack used by [`CacheConfig::load`].
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }
}

/// Cache file next to the running executable.
fn default_cache_file() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CACHE_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE_NAME))
}
