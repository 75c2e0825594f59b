//! Cache session: owns the store for the life of one run.
//!
//! ```no_run
//! use changecache::{CacheConfig, CacheSession, Item};
//!
//! let mut session = CacheSession::open(CacheConfig::new("build/.changecache"))?;
//! let output = session.batch().run(vec![Item::file("src/main.c")])?;
//! for item in &output.emitted {
//!     println!("rebuild {}", item.name());
//! }
//! session.close();
//! # Ok::<(), changecache::CacheError>(())
//! ```
//!
//! Nothing is hooked into process events. The embedding application calls
//! [`CacheSession::close`] on normal completion and from its own signal
//! handling, or skips it to leave the file untouched.

use std::sync::Arc;

use crate::batch::{Batch, BatchObserver, BatchOutput, Item};
use crate::cache::{ChangeDetector, DetectionResult, HashStore};
use crate::config::CacheConfig;
use crate::digest::ByteSource;
use crate::error::{CacheError, CacheResult};

/// What [`CacheSession::close`] did with the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The store was written.
    Saved,
    /// Nothing changed since the last save; the file was left alone.
    Clean,
    /// Writing failed; a warning was logged.
    Failed,
}

/// The store plus the configuration it was opened with.
#[derive(Debug)]
pub struct CacheSession {
    config: CacheConfig,
    store: HashStore,
}

impl CacheSession {
    /// Open a session, loading the cache file if it exists.
    ///
    /// # Arguments
    ///
    /// * `config` - Settings for this session; `config.cache_file` is read
    ///   now and written by [`CacheSession::close`]
    ///
    /// # Returns
    ///
    /// A session whose store holds the persisted digests, or an empty store
    /// when there is no cache file yet.
    ///
    /// # Errors
    ///
    /// A cache file that exists but cannot be read or parsed is fatal: the
    /// session does not start with a partial or reset store.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use changecache::{CacheConfig, CacheSession};
    ///
    /// let session = CacheSession::open(CacheConfig::new("build/.changecache"))?;
    /// println!("{} digests on record", session.store().len());
    /// # Ok::<(), changecache::CacheError>(())
    /// ```
    pub fn open(config: CacheConfig) -> CacheResult<Self> {
        let mut store = HashStore::new();
        if store.load_if_exists(&config.cache_file)? {
            log::info!(
                "Loaded {} cached digests from {}",
                store.len(),
                config.cache_file.display()
            );
        }
        Ok(Self { config, store })
    }

    /// Configuration of this session.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Current store contents.
    #[must_use]
    pub fn store(&self) -> &HashStore {
        &self.store
    }

    /// Start a batch using the configured mode, strictness and algorithm.
    pub fn batch(&mut self) -> Batch<'_> {
        Batch::new(
            &mut self.store,
            self.config.algorithm,
            self.config.batch_mode(),
        )
        .with_strict(self.config.strict)
    }

    /// Start a batch that reports cache hits to `observer`.
    pub fn batch_with_observer(&mut self, observer: Arc<dyn BatchObserver>) -> Batch<'_> {
        self.batch().with_observer(observer)
    }

    /// Run `items` through a batch, digesting on `io_threads` workers.
    ///
    /// # Errors
    ///
    /// See [`Batch::run_parallel`].
    pub fn run_parallel(&mut self, items: Vec<Item>) -> CacheResult<BatchOutput> {
        let threads = self.config.io_threads;
        self.batch().run_parallel(items, threads)
    }

    /// Detect a single item outside any batch.
    ///
    /// # Errors
    ///
    /// [`CacheError::Read`] if the source fails.
    pub fn detect<S: ByteSource + ?Sized>(
        &mut self,
        name: &str,
        source: &mut S,
    ) -> CacheResult<DetectionResult> {
        ChangeDetector::new(&mut self.store, self.config.algorithm).detect(name, source)
    }

    /// Save the store if anything changed since it was loaded or last saved.
    ///
    /// Returns whether the file was written.
    ///
    /// # Errors
    ///
    /// Propagates save failures, including [`CacheError::DirectoryMissing`].
    pub fn flush(&mut self) -> CacheResult<bool> {
        if !self.store.is_dirty() {
            log::debug!("Cache unchanged, not writing {}", self.config.cache_file.display());
            return Ok(false);
        }
        self.store.save(&self.config.cache_file)?;
        self.store.mark_clean();
        Ok(true)
    }

    /// Final flush. Never fails: problems are logged as warnings.
    pub fn finalize(&mut self) -> FlushOutcome {
        match self.flush() {
            Ok(true) => FlushOutcome::Saved,
            Ok(false) => FlushOutcome::Clean,
            Err(err) => {
                log::warn!(
                    "Unable to save cache file to {}.",
                    self.config.cache_file.display()
                );
                match &err {
                    CacheError::DirectoryMissing { path } => {
                        log::warn!("The directory {} does not exist.", path.display());
                    }
                    other => log::warn!("{}", other),
                }
                FlushOutcome::Failed
            }
        }
    }

    /// End the session with a final flush.
    pub fn close(mut self) -> FlushOutcome {
        self.finalize()
    }
}
