//! Command line of the network-runner server.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use avnet_config::{AppPaths, Config};

use crate::error::BackendError;

/// Executable looked up on `PATH` when no runner binary is configured.
pub const RUNNER_BINARY_NAME: &str = "avalanche-network-runner";

/// Fully resolved invocation of the network-runner server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl RunnerCommand {
    /// Resolves the runner executable and builds its server arguments.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::RunnerNotFound`] when no binary is configured
    /// and none is found on `PATH`.
    pub fn from_config(config: &Config, paths: &AppPaths) -> Result<Self, BackendError> {
        let program = match &config.runner_binary {
            Some(path) => path.clone().into_std_path_buf(),
            None => which::which(RUNNER_BINARY_NAME).map_err(|source| {
                BackendError::RunnerNotFound {
                    name: RUNNER_BINARY_NAME,
                    source,
                }
            })?,
        };
        Ok(Self::new(
            program,
            config.grpc_port,
            config.gateway_endpoint().port,
            paths.snapshots_dir(),
        ))
    }

    /// Builds the server invocation for an explicit executable.
    #[must_use]
    pub fn new(program: PathBuf, grpc_port: u16, gateway_port: u16, snapshots_dir: &Path) -> Self {
        let mut snapshots_flag = OsString::from("--snapshots-path=");
        snapshots_flag.push(snapshots_dir);
        let args = vec![
            OsString::from("server"),
            OsString::from(format!("--port=:{grpc_port}")),
            OsString::from(format!("--grpc-gateway-port=:{gateway_port}")),
            snapshots_flag,
        ];
        Self { program, args }
    }

    /// Executable to launch.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    #[cfg(test)]
    pub(crate) fn replace_args(&mut self, args: Vec<OsString>) {
        self.args = args;
    }
}
