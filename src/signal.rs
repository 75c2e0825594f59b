//! Ctrl+C / SIGTERM handling for the `changecache` binary.
//!
//! The signal handler only raises a flag. The check loop polls it between
//! items, stops feeding the batch and closes the session, so the final save
//! runs on the main thread and never inside the handler. Interrupted runs
//! exit with [`crate::ExitCode::Interrupted`].

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a shutdown was requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request a shutdown, as the signal handler would.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The underlying flag, for sharing with worker threads.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(String),
}

/// The one handler of the process, or why it could not be installed.
static GLOBAL_HANDLER: OnceLock<Result<ShutdownHandler, String>> = OnceLock::new();

/// Install the process-wide handler, or reuse the one already installed.
///
/// `ctrlc` allows a single handler per process, so repeated calls (several
/// runs in one test binary) share the first handler with its flag reset.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if the handler cannot be registered
/// for a reason other than one already being present.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    let installed = GLOBAL_HANDLER.get_or_init(|| {
        let handler = ShutdownHandler::new();
        let flag = handler.get_flag();
        let result = ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
            let _ = writeln!(std::io::stderr(), "\nInterrupted. Saving cache...");
            let _ = std::io::stderr().flush();
        });
        match result {
            Ok(()) => Ok(handler),
            Err(ctrlc::Error::MultipleHandlers) => {
                log::debug!("Signal handler already registered elsewhere, flag is not hooked");
                Ok(handler)
            }
            Err(e) => Err(e.to_string()),
        }
    });

    match installed {
        Ok(handler) => {
            handler.reset();
            Ok(handler.clone())
        }
        Err(message) => Err(SignalError::InstallFailed(message.clone())),
    }
}
