//! Error types for backend process supervision.

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while starting, locating or terminating the backend.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to resolve the current executable: {source}")]
    CurrentExecutable {
        #[source]
        source: io::Error,
    },
    #[error("failed to create backend output file: {source}")]
    OutputFile {
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn backend from {binary:?}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read run file {path:?}: {source}")]
    ReadRunFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("run file {path:?} has no '{field}' line")]
    MissingRunField { path: PathBuf, field: &'static str },
    #[error("run file {path:?} holds an invalid pid: {source}")]
    ParsePid {
        path: PathBuf,
        #[source]
        source: ParseIntError,
    },
    #[error("failed to remove run file {path:?}: {source}")]
    RemoveRunFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("pid {pid} cannot be addressed on this platform")]
    PidOutOfRange { pid: u32 },
    #[error("failed to signal backend pid {pid}: {source}")]
    SignalFailed {
        pid: u32,
        #[source]
        source: io::Error,
    },
    #[cfg(not(unix))]
    #[error("platform does not support backend signalling")]
    UnsupportedPlatform,
}
