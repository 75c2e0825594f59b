//! Batch policy: decides which items of a batch reach downstream consumers.
//!
//! # Modes
//!
//! - **Independent** (default): each item is judged alone. Changed items are
//!   emitted as they arrive, unchanged ones are suppressed and reported as
//!   cache hits.
//! - **Cascade**: if any item in the batch changed, every item is emitted in
//!   arrival order; if none changed, nothing is. Items are withheld until the
//!   first change releases them (see [`BatchState`]).
//!
//! Items without content (null or directory entries) always pass straight
//! through and never touch the store.
//!
//! # Read failures
//!
//! An item whose content cannot be read is skipped by default: it is logged,
//! recorded in [`BatchReport::failures`] and neither emitted nor withheld.
//! The rest of the batch proceeds. In strict mode the first failure aborts
//! the batch with [`CacheError::Aborted`], which still carries the items
//! emitted before the failure: their new digests are already in the store,
//! so the caller must deliver them.
//!
//! # Cancellation
//!
//! A batch given a flag through [`Batch::with_cancel`] stops feeding items
//! once the flag is raised. Items not yet fed are neither digested nor
//! recorded, and [`BatchReport::interrupted`] is set.
//!
//! # Example
//!
//! ```
//! use changecache::batch::{Batch, BatchMode, Item};
//! use changecache::cache::HashStore;
//! use changecache::digest::DigestAlgorithm;
//!
//! let mut store = HashStore::new();
//! let mut batch = Batch::new(&mut store, DigestAlgorithm::Sha256, BatchMode::Cascade);
//! assert!(batch.push(Item::buffer("a.txt", "a")).unwrap().len() == 1);
//! let report = batch.finish();
//! assert_eq!(report.emitted, 1);
//! ```

pub mod item;
pub mod state;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::cache::{ChangeDetector, DetectionResult, HashStore};
use crate::digest::{self, Digest, DigestAlgorithm};
use crate::error::{CacheError, CacheResult};

pub use item::{Contents, Item};
pub use state::BatchState;

/// How a batch decides what to emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Each item is emitted only if it changed.
    #[default]
    Independent,
    /// One change emits the whole batch.
    Cascade,
}

impl BatchMode {
    /// Mode for a `cascade` configuration flag.
    #[must_use]
    pub fn from_cascade(cascade: bool) -> Self {
        if cascade {
            Self::Cascade
        } else {
            Self::Independent
        }
    }
}

/// Instrumentation hooks for a batch.
///
/// Both methods default to doing nothing.
pub trait BatchObserver: Send + Sync {
    /// Called for each item found unchanged that is not being emitted at that moment.
    fn on_cache_hit(&self, _name: &str) {}

    /// Called once when the batch finishes, with every name that was never emitted
    /// because it was unchanged.
    fn on_cache_report(&self, _hits: &[String]) {}
}

/// An item skipped because its content could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Name of the item
    pub name: String,
    /// Description of the failure
    pub message: String,
}

/// Summary of a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Mode the batch ran in
    pub mode: BatchMode,
    /// Items received, including passed-through and failed ones
    pub received: usize,
    /// Items emitted downstream, including passed-through ones
    pub emitted: usize,
    /// Items without content that were passed through untracked
    pub passed_through: usize,
    /// Names suppressed because their content was unchanged
    pub cache_hits: Vec<String>,
    /// Items skipped because their content could not be read
    pub failures: Vec<ItemFailure>,
    /// Whether a cascade was triggered
    pub cascaded: bool,
    /// Whether the batch stopped early on cancellation
    pub interrupted: bool,
}

/// Result of digesting one item on a worker.
enum Digested {
    NoContent,
    Done(io::Result<Digest>),
    Skipped,
}

/// Emitted items of a batch that was run to completion in one call.
#[derive(Debug)]
pub struct BatchOutput {
    /// Items emitted, in emission order
    pub emitted: Vec<Item>,
    /// Summary of the batch
    pub report: BatchReport,
}

/// One pass of the batch policy over a sequence of items.
///
/// A `Batch` borrows the store for its lifetime, so batches over one store
/// never overlap. Its [`BatchState`] lives and dies with it.
pub struct Batch<'s> {
    detector: ChangeDetector<'s>,
    mode: BatchMode,
    strict: bool,
    state: BatchState,
    observer: Option<Arc<dyn BatchObserver>>,
    cancel: Option<Arc<AtomicBool>>,
    report: BatchReport,
}

impl<'s> Batch<'s> {
    /// Start a batch over `store`.
    pub fn new(store: &'s mut HashStore, algorithm: DigestAlgorithm, mode: BatchMode) -> Self {
        Self {
            detector: ChangeDetector::new(store, algorithm),
            mode,
            strict: false,
            state: BatchState::new(),
            observer: None,
            cancel: None,
            report: BatchReport {
                mode,
                ..BatchReport::default()
            },
        }
    }

    /// Abort on the first unreadable item instead of skipping it.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Attach an observer for cache-hit events.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Stop feeding items once `flag` is raised.
    #[must_use]
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Mode of this batch.
    #[must_use]
    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    /// Feed the next item and return the items to emit now.
    ///
    /// The item's digest is recorded in the store before this returns,
    /// whether or not the item is emitted.
    ///
    /// # Arguments
    ///
    /// * `item` - The next item in arrival order
    ///
    /// # Returns
    ///
    /// In independent mode zero or one item. In cascade mode possibly a burst
    /// of previously withheld items followed by `item` itself. Null and
    /// directory items are returned as-is.
    ///
    /// # Errors
    ///
    /// Only in strict mode: the read error of an item whose content failed.
    /// Items returned by earlier calls are unaffected; pass them to
    /// [`Batch::abort`] to end the batch without losing them.
    ///
    /// # Example
    ///
    /// ```
    /// use changecache::batch::{Batch, BatchMode, Item};
    /// use changecache::cache::HashStore;
    /// use changecache::digest::DigestAlgorithm;
    ///
    /// let mut store = HashStore::new();
    /// let mut batch = Batch::new(&mut store, DigestAlgorithm::Sha256, BatchMode::Independent);
    /// let out = batch.push(Item::buffer("a.txt", "a"))?;
    /// assert_eq!(out[0].name(), "a.txt");
    /// # Ok::<(), changecache::CacheError>(())
    /// ```
    pub fn push(&mut self, item: Item) -> CacheResult<Vec<Item>> {
        let outcome = item
            .source()
            .map(|mut source| self.detector.detect(item.name(), &mut source));
        self.settle(item, outcome)
    }

    /// Feed every item of `items` and finish the batch.
    ///
    /// # Errors
    ///
    /// See [`Batch::push`].
    pub fn run(mut self, items: impl IntoIterator<Item = Item>) -> CacheResult<BatchOutput> {
        let mut emitted = Vec::new();
        for item in items {
            if self.check_cancelled() {
                break;
            }
            match self.push(item) {
                Ok(out) => emitted.extend(out),
                Err(err) => return Err(self.abort(emitted, err)),
            }
        }
        Ok(BatchOutput {
            emitted,
            report: self.finish(),
        })
    }

    /// Digest `items` on `io_threads` workers, then apply the policy.
    ///
    /// Digesting is the only parallel part. Store updates, cascade buffering
    /// and emission happen afterwards in arrival order, so the output is the
    /// same as [`Batch::run`] would produce.
    ///
    /// Workers skip digesting once the cancel flag is raised, and the
    /// settle pass stops at the first item that was not digested.
    ///
    /// # Errors
    ///
    /// [`CacheError::ThreadPool`] if the pool cannot be built, otherwise as
    /// [`Batch::run`].
    pub fn run_parallel(mut self, items: Vec<Item>, io_threads: usize) -> CacheResult<BatchOutput> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(io_threads.max(1))
            .build()
            .map_err(|e| CacheError::ThreadPool(e.to_string()))?;

        let algorithm = self.detector.algorithm();
        log::debug!(
            "Digesting {} items on {} threads",
            items.len(),
            io_threads.max(1)
        );
        let cancel = self.cancel.clone();
        let digests: Vec<Digested> = pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    if cancel.as_ref().is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                        return Digested::Skipped;
                    }
                    match item.source() {
                        Some(mut source) => Digested::Done(digest::digest(&mut source, algorithm)),
                        None => Digested::NoContent,
                    }
                })
                .collect()
        });

        let mut emitted = Vec::new();
        for (item, digested) in items.into_iter().zip(digests) {
            if self.check_cancelled() {
                break;
            }
            let outcome = match digested {
                Digested::Skipped => {
                    self.report.interrupted = true;
                    break;
                }
                Digested::NoContent => None,
                Digested::Done(Ok(fresh)) => Some(Ok(self.detector.record(item.name(), fresh))),
                Digested::Done(Err(source)) => Some(Err(CacheError::Read {
                    name: item.name().to_string(),
                    source,
                })),
            };
            match self.settle(item, outcome) {
                Ok(out) => emitted.extend(out),
                Err(err) => return Err(self.abort(emitted, err)),
            }
        }

        Ok(BatchOutput {
            emitted,
            report: self.finish(),
        })
    }

    /// End the batch after a failure.
    ///
    /// `emitted` is everything the batch returned so far. The result wraps
    /// `error` together with those items and the final report.
    pub fn abort(self, emitted: Vec<Item>, error: CacheError) -> CacheError {
        log::warn!(
            "Batch aborted after {} emitted items: {}",
            emitted.len(),
            error
        );
        let report = self.finish();
        CacheError::Aborted {
            output: Box::new(BatchOutput { emitted, report }),
            source: Box::new(error),
        }
    }

    /// End the batch.
    ///
    /// In cascade mode without any change, withheld items are dropped and
    /// reported as cache hits.
    pub fn finish(mut self) -> BatchReport {
        let cascaded = self.state.is_changed();
        let withheld = std::mem::take(&mut self.state).into_pending();
        if self.mode == BatchMode::Cascade {
            if !withheld.is_empty() {
                log::debug!("No changes in batch, discarding {} items", withheld.len());
            }
            self.report.cache_hits = withheld.iter().map(|i| i.name().to_string()).collect();
            self.report.cascaded = cascaded;
        }

        if let Some(observer) = &self.observer {
            observer.on_cache_report(&self.report.cache_hits);
        }

        log::info!(
            "Batch finished: {} received, {} emitted, {} cache hits, {} failed",
            self.report.received,
            self.report.emitted,
            self.report.cache_hits.len(),
            self.report.failures.len()
        );
        self.report
    }

    fn settle(
        &mut self,
        item: Item,
        outcome: Option<CacheResult<DetectionResult>>,
    ) -> CacheResult<Vec<Item>> {
        self.report.received += 1;

        let result = match outcome {
            None => {
                self.report.passed_through += 1;
                self.report.emitted += 1;
                return Ok(vec![item]);
            }
            Some(Ok(result)) => result,
            Some(Err(err)) => {
                if self.strict {
                    return Err(err);
                }
                log::warn!("Skipping {}: {}", item.name(), err);
                self.report.failures.push(ItemFailure {
                    name: item.name().to_string(),
                    message: err.to_string(),
                });
                return Ok(Vec::new());
            }
        };

        let out = match self.mode {
            BatchMode::Independent => {
                if result.changed {
                    vec![item]
                } else {
                    self.notify_hit(item.name());
                    self.report.cache_hits.push(result.name);
                    Vec::new()
                }
            }
            BatchMode::Cascade => {
                if !result.changed && !self.state.is_changed() {
                    self.notify_hit(item.name());
                }
                let was_changed = self.state.is_changed();
                let out = self.state.admit(item, result.changed);
                if !was_changed && self.state.is_changed() && out.len() > 1 {
                    log::debug!(
                        "Change in {} releases {} withheld items",
                        result.name,
                        out.len() - 1
                    );
                }
                out
            }
        };

        self.report.emitted += out.len();
        Ok(out)
    }

    fn check_cancelled(&mut self) -> bool {
        let cancelled = self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst));
        if cancelled && !self.report.interrupted {
            log::warn!("Batch cancelled after {} items", self.report.received);
            self.report.interrupted = true;
        }
        cancelled
    }

    fn notify_hit(&self, name: &str) {
        if let Some(observer) = &self.observer {
            observer.on_cache_hit(name);
        }
    }
}
