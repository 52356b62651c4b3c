//! Body of the hidden `backend start` command.
//!
//! The CLI re-executes itself with `backend start` to get a long-lived
//! process that owns the network-runner server. This crate resolves the
//! runner executable, keeps it running in the foreground and forwards
//! termination signals to it so killing the backend also stops the runner.

#![deny(missing_docs)]

mod command;
mod error;
mod server;
mod shutdown;

use avnet_config::{AppPaths, Config};

pub use command::{RUNNER_BINARY_NAME, RunnerCommand};
pub use error::BackendError;
pub use server::serve;
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

/// Tracing target for backend lifecycle events.
pub(crate) const BACKEND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::backend");

/// Runs the network-runner server described by `config` until it exits or
/// the process receives a termination signal.
///
/// # Errors
///
/// Fails when the directories cannot be prepared, signal handlers cannot be
/// installed, the runner cannot be found or launched, or the runner exits
/// unexpectedly.
pub fn run(config: &Config) -> Result<(), BackendError> {
    let paths = AppPaths::from_config(config)?;
    let command = RunnerCommand::from_config(config, &paths)?;
    let shutdown = SystemShutdownSignal::install()?;
    serve(&command, Box::new(shutdown))
}
