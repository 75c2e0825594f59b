//! changecache - content-hash change detection for incremental builds
//!
//! Items (named byte buffers, streams or files) are digested and compared
//! with the digest recorded for the same name on a previous run. Only the
//! items whose content changed are passed on, or, in cascade mode, the whole
//! batch is passed on as soon as one item changed. Digests persist between
//! runs in a flat JSON cache file.
//!
//! ```no_run
//! use changecache::{CacheConfig, CacheSession, Item};
//!
//! let config = CacheConfig::new(".changecache").with_cascade(true);
//! let mut session = CacheSession::open(config)?;
//! let output = session
//!     .batch()
//!     .run(vec![Item::file("src/a.c"), Item::file("src/b.c")])?;
//! println!("{} items to rebuild", output.emitted.len());
//! session.close();
//! # Ok::<(), changecache::CacheError>(())
//! ```

pub mod app;
pub mod batch;
pub mod cache;
pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod logging;
pub mod session;
pub mod signal;

pub use app::run_app;
pub use batch::{Batch, BatchMode, BatchObserver, BatchReport, Item};
pub use cache::{ChangeDetector, DetectionResult, HashStore};
pub use config::CacheConfig;
pub use digest::{Digest, DigestAlgorithm};
pub use error::{CacheError, CacheResult, ExitCode};
pub use session::{CacheSession, FlushOutcome};
