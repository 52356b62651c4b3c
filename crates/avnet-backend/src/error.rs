//! Failures of the foreground backend.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use avnet_config::AppPathsError;

use crate::shutdown::ShutdownError;

/// Errors raised while running the network-runner server.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The application directories could not be prepared.
    #[error(transparent)]
    Paths(#[from] AppPathsError),
    /// Termination signal handlers could not be registered.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    /// No runner executable was configured or found on `PATH`.
    #[error("could not find '{name}' on PATH; set --runner-binary: {source}")]
    RunnerNotFound {
        /// Executable name that was searched for.
        name: &'static str,
        /// Lookup failure.
        #[source]
        source: which::Error,
    },
    /// The runner could not be launched.
    #[error("failed to launch {program:?}: {source}")]
    Spawn {
        /// Executable that failed to start.
        program: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Waiting on the runner failed.
    #[error("failed to wait for {program:?}: {source}")]
    Wait {
        /// Executable being waited on.
        program: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The runner stopped without being asked to.
    #[error("{program:?} exited unexpectedly with {status}")]
    RunnerExited {
        /// Executable that exited.
        program: PathBuf,
        /// Exit status reported by the OS.
        status: ExitStatus,
    },
}
