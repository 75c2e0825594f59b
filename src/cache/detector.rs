//! Change detection against the hash store.

use serde::Serialize;

use crate::cache::HashStore;
use crate::digest::{self, ByteSource, Digest, DigestAlgorithm};
use crate::error::{CacheError, CacheResult};

/// Outcome of one detection call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    /// Name of the item
    pub name: String,
    /// Digest of the content just read
    pub digest: Digest,
    /// `true` if the name was unknown or its digest differs from the stored one
    pub changed: bool,
}

/// Compares fresh digests against a [`HashStore`] and updates it.
///
/// The store is updated before the result is reported, whether or not the
/// caller ends up emitting the item. It always reflects the last content
/// observed.
pub struct ChangeDetector<'s> {
    store: &'s mut HashStore,
    algorithm: DigestAlgorithm,
}

impl<'s> ChangeDetector<'s> {
    /// Create a detector over `store`.
    pub fn new(store: &'s mut HashStore, algorithm: DigestAlgorithm) -> Self {
        Self { store, algorithm }
    }

    /// Algorithm used by [`ChangeDetector::detect`].
    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &HashStore {
        self.store
    }

    /// Digest `source` and record it under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Read`] if the source fails before the end. The
    /// store is not touched in that case.
    pub fn detect<S: ByteSource + ?Sized>(
        &mut self,
        name: &str,
        source: &mut S,
    ) -> CacheResult<DetectionResult> {
        let fresh = digest::digest(source, self.algorithm).map_err(|source| CacheError::Read {
            name: name.to_string(),
            source,
        })?;
        Ok(self.record(name, fresh))
    }

    /// Record an already computed digest for `name`.
    pub fn record(&mut self, name: &str, fresh: Digest) -> DetectionResult {
        let previous = self.store.set(name, fresh);
        let changed = previous != Some(fresh);

        match previous {
            None => log::debug!("Cache miss (new): {}", name),
            Some(_) if changed => log::debug!("Cache miss (modified): {}", name),
            Some(_) => log::debug!("Cache hit: {}", name),
        }

        DetectionResult {
            name: name.to_string(),
            digest: fresh,
            changed,
        }
    }
}
