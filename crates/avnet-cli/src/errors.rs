//! Error type aggregated by the CLI runtime.

use std::sync::Arc;

use thiserror::Error;

use avnet_backend::BackendError;
use avnet_binaries::ProvisionError;
use avnet_config::AppPathsError;

use crate::session::SessionError;
use crate::supervisor::SupervisorError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to prepare directories: {0}")]
    Paths(#[from] AppPathsError),
    #[error("failed to build gateway client: {0}")]
    Gateway(reqwest::Error),
    #[error("failed to prepare downloads: {0}")]
    Provision(#[from] ProvisionError),
    #[error("failed to prepare backend supervision: {0}")]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("backend failed: {0}")]
    Backend(#[from] BackendError),
}
