//! In-memory hash store with JSON persistence.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::digest::Digest;
use crate::error::{CacheError, CacheResult};

/// Mapping from item name to the digest of its last observed content.
///
/// Persisted as a flat JSON object (`{"name": "hex digest", ...}`). There is
/// no removal API: entries for items that disappeared stay in the file.
///
/// The file is assumed to belong to one process at a time. Two processes
/// sharing a path can clobber each other's saves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashStore {
    entries: HashMap<String, Digest>,
    /// Set when a `set` introduced or altered an entry since the last load/save.
    dirty: bool,
}

impl HashStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a flat name→digest object.
    pub fn from_file(path: &Path) -> CacheResult<Self> {
        let mut store = Self::new();
        store.load(path)?;
        Ok(store)
    }

    /// Last known digest for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Digest> {
        self.entries.get(name).copied()
    }

    /// Record `digest` as the content of `name`, returning the previous digest.
    pub fn set(&mut self, name: impl Into<String>, digest: Digest) -> Option<Digest> {
        let previous = self.entries.insert(name.into(), digest);
        if previous != Some(digest) {
            self.dirty = true;
        }
        previous
    }

    /// Whether `name` has a recorded digest.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of tracked items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store tracks no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, digest)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Digest)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Tracked names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether an entry changed since the store was loaded or last saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag without writing anything.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Replace the whole map with the contents of `path`.
    ///
    /// A missing file is an error here; use [`HashStore::load_if_exists`]
    /// to start empty instead.
    ///
    /// # Errors
    ///
    /// [`CacheError::Io`] if the file cannot be read, [`CacheError::Parse`]
    /// if it does not hold a flat object of hex digests. On error the
    /// in-memory map is left as it was.
    pub fn load(&mut self, path: &Path) -> CacheResult<()> {
        let content = fs::read_to_string(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: HashMap<String, Digest> =
            serde_json::from_str(&content).map_err(|source| CacheError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        log::debug!("Loaded {} cache entries from {}", entries.len(), path.display());
        self.entries = entries;
        self.dirty = false;
        Ok(())
    }

    /// Load `path` if it exists.
    ///
    /// Returns `Ok(false)` and leaves the store untouched when there is no file.
    ///
    /// # Errors
    ///
    /// Same as [`HashStore::load`] for a file that exists.
    pub fn load_if_exists(&mut self, path: &Path) -> CacheResult<bool> {
        if !path.exists() {
            log::debug!("No cache file at {}, starting empty", path.display());
            return Ok(false);
        }
        self.load(path)?;
        Ok(true)
    }

    /// Serialize the store as a JSON object with keys in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Serialize`] if serialization fails.
    pub fn to_json(&self) -> CacheResult<String> {
        let sorted: BTreeMap<&str, &Digest> = self.iter().collect();
        Ok(serde_json::to_string_pretty(&sorted)?)
    }

    /// Write the store to `path`.
    ///
    /// The JSON is written to a sibling temporary file which is synced and
    /// then renamed over `path`, so an interrupted save leaves the previous
    /// file intact.
    ///
    /// # Errors
    ///
    /// [`CacheError::DirectoryMissing`] if the parent directory does not
    /// exist, [`CacheError::Io`] for any other write failure.
    pub fn save(&self, path: &Path) -> CacheResult<()> {
        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = parent {
            if !dir.is_dir() {
                return Err(CacheError::DirectoryMissing {
                    path: dir.to_path_buf(),
                });
            }
        }

        let json = self.to_json()?;
        let tmp = temp_path(path);
        if let Err(source) = write_synced(&tmp, json.as_bytes()) {
            let _ = fs::remove_file(&tmp);
            return Err(map_write_error(path, parent, source));
        }
        if let Err(source) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(map_write_error(path, parent, source));
        }

        log::debug!("Saved {} cache entries to {}", self.len(), path.display());
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// The directory can vanish between the existence check and the write.
fn map_write_error(path: &Path, parent: Option<&Path>, source: io::Error) -> CacheError {
    match parent {
        Some(dir) if source.kind() == io::ErrorKind::NotFound && !dir.is_dir() => {
            CacheError::DirectoryMissing {
                path: dir.to_path_buf(),
            }
        }
        _ => CacheError::Io {
            path: path.to_path_buf(),
            source,
        },
    }
}
