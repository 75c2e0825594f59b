//! Change-tracking state for changecache.
//!
//! This module holds the persistent side of the cache: which digest each item
//! had when it was last observed, and the comparison that turns a fresh
//! digest into a changed/unchanged verdict.
//!
//! # Architecture
//!
//! * [`store`]: the name→digest map and its JSON file.
//! * [`detector`]: digest, compare, update; the only writer of the store.
//!
//! # Staleness
//!
//! Entries are never removed. An item that no longer exists keeps its last
//! digest in the file indefinitely.

pub mod detector;
pub mod store;

pub use detector::{ChangeDetector, DetectionResult};
pub use store::HashStore;
