//! Shared configuration for the `avnet` tool.
//!
//! Values are layered by `ortho_config`: defaults, configuration files,
//! `AVNET_*` environment variables and finally command-line flags. The CLI and
//! the self-spawned backend both load the same [`Config`] so they agree on the
//! base directory, the gateway address and the timing budgets.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub mod defaults;
mod endpoint;
mod logging;
mod paths;

pub use endpoint::{EndpointParseError, GatewayEndpoint};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{
    AppPaths, AppPathsError, BOOTSTRAP_ARCHIVE_NAME, DEFAULT_SNAPSHOT_NAME, RUN_FILE_NAME,
    SNAPSHOT_DIR_PREFIX,
};

/// Resolved configuration for a single invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "AVNET")]
pub struct Config {
    /// Root directory for binaries, snapshots and run artefacts.
    #[ortho_config(default = defaults::default_base_dir())]
    pub base_dir: Utf8PathBuf,
    /// Address of the network-runner HTTP gateway.
    #[ortho_config(default = defaults::default_gateway_endpoint())]
    pub gateway_endpoint: GatewayEndpoint,
    /// Port the network-runner gRPC server binds.
    #[ortho_config(default = defaults::DEFAULT_GRPC_PORT)]
    pub grpc_port: u16,
    /// Explicit path to the network-runner executable.
    pub runner_binary: Option<Utf8PathBuf>,
    /// Endpoint serving plugin binaries by identifier.
    pub binary_server_url: Option<String>,
    /// Location of the archived default snapshot.
    #[ortho_config(default = defaults::default_bootstrap_snapshot_url())]
    pub bootstrap_snapshot_url: String,
    /// Milliseconds allowed for the backend to answer its first ping.
    #[ortho_config(default = defaults::DEFAULT_DIAL_TIMEOUT_MS)]
    pub dial_timeout_ms: u64,
    /// Milliseconds between two health queries.
    #[ortho_config(default = defaults::DEFAULT_HEALTH_POLL_INTERVAL_MS)]
    pub health_poll_interval_ms: u64,
    /// Milliseconds allowed for a network to become healthy.
    #[ortho_config(default = defaults::DEFAULT_START_TIMEOUT_MS)]
    pub start_timeout_ms: u64,
    /// Milliseconds allowed for a single control request.
    #[ortho_config(default = defaults::DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,
    /// Tracing filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: defaults::default_base_dir(),
            gateway_endpoint: defaults::default_gateway_endpoint(),
            grpc_port: defaults::DEFAULT_GRPC_PORT,
            runner_binary: None,
            binary_server_url: None,
            bootstrap_snapshot_url: defaults::default_bootstrap_snapshot_url(),
            dial_timeout_ms: defaults::DEFAULT_DIAL_TIMEOUT_MS,
            health_poll_interval_ms: defaults::DEFAULT_HEALTH_POLL_INTERVAL_MS,
            start_timeout_ms: defaults::DEFAULT_START_TIMEOUT_MS,
            request_timeout_ms: defaults::DEFAULT_REQUEST_TIMEOUT_MS,
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
        }
    }
}

impl Config {
    /// Address of the network-runner HTTP gateway.
    #[must_use]
    pub fn gateway_endpoint(&self) -> &GatewayEndpoint {
        &self.gateway_endpoint
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Time allowed for the backend to answer its first ping.
    #[must_use]
    pub const fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    /// Pause between two health queries.
    #[must_use]
    pub const fn health_poll_interval(&self) -> Duration {
        Duration::from_millis(self.health_poll_interval_ms)
    }

    /// Time allowed for a network to become healthy.
    #[must_use]
    pub const fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    /// Time allowed for a single control request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_dir_ends_with_tool_directory() {
        let config = Config::default();
        assert!(config.base_dir.ends_with(defaults::BASE_DIR_NAME));
    }

    #[test]
    fn durations_follow_millisecond_fields() {
        let config = Config {
            dial_timeout_ms: 250,
            health_poll_interval_ms: 5,
            ..Config::default()
        };
        assert_eq!(config.dial_timeout(), Duration::from_millis(250));
        assert_eq!(config.health_poll_interval(), Duration::from_millis(5));
        assert_eq!(
            config.start_timeout(),
            Duration::from_millis(defaults::DEFAULT_START_TIMEOUT_MS)
        );
    }
}
