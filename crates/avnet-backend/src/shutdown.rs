//! Waiting for a request to stop the backend.

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use crate::BACKEND_TARGET;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send {
    /// Blocks until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns an error when the listener stops delivering notifications.
    fn wait(&mut self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener that waits for termination signals.
///
/// Handlers are registered by [`SystemShutdownSignal::install`]; a signal
/// delivered between installation and [`ShutdownSignal::wait`] is queued
/// rather than lost.
pub struct SystemShutdownSignal {
    signals: Signals,
}

impl SystemShutdownSignal {
    /// Registers handlers for `SIGTERM`, `SIGINT`, `SIGQUIT` and `SIGHUP`.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] when registration fails.
    pub fn install() -> Result<Self, ShutdownError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(Self { signals })
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&mut self) -> Result<(), ShutdownError> {
        if let Some(signal) = self.signals.forever().next() {
            info!(target: BACKEND_TARGET, signal, "shutdown signal received");
        }
        Ok(())
    }
}
