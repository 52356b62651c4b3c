//! Error types for network session commands.

use std::io;

use thiserror::Error;

use avnet_binaries::ProvisionError;
use avnet_config::AppPathsError;
use avnet_control_types::ControlError;

use crate::supervisor::SupervisorError;

/// Errors raised while starting, stopping or cleaning a local network.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend did not answer a ping before the dial timeout.
    #[error("backend did not answer within {timeout_ms} ms: {source}")]
    ConnectTimeout {
        /// Dial budget in milliseconds.
        timeout_ms: u128,
        /// Last ping failure.
        #[source]
        source: ControlError,
    },
    /// The start deadline passed before the network became healthy.
    #[error("failed waiting for network to become healthy")]
    HealthTimeout {
        /// Start budget in milliseconds.
        timeout_ms: u128,
    },
    /// A control call failed in a way the session cannot absorb.
    #[error("failed to {operation}: {source}")]
    Control {
        /// Step that failed, such as "save snapshot".
        operation: &'static str,
        /// Error reported by the backend.
        #[source]
        source: ControlError,
    },
    /// The requested avalanchego version is neither `latest` nor semver.
    #[error("invalid avalanchego version '{version}': {source}")]
    InvalidVersion {
        /// Version as given on the command line.
        version: String,
        /// Parse failure.
        #[source]
        source: semver::Error,
    },
    /// Installing binaries or the default snapshot failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    /// The backend process could not be inspected or launched.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    /// The application directories could not be prepared.
    #[error(transparent)]
    Paths(#[from] AppPathsError),
    /// The run directory timestamp could not be formatted.
    #[error("failed to format run timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    /// Writing progress lines to the output streams failed.
    #[error("failed to write command output: {0}")]
    Output(#[from] io::Error),
}

impl SessionError {
    pub(crate) const fn control(operation: &'static str, source: ControlError) -> Self {
        Self::Control { operation, source }
    }
}
