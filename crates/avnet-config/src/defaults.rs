//! Default values applied when no configuration layer sets a field.

use camino::Utf8PathBuf;
use std::env;

use dirs::home_dir;

use crate::endpoint::GatewayEndpoint;

/// Directory name created under the user's home directory.
pub const BASE_DIR_NAME: &str = ".avalanche-cli";

/// Default port of the network-runner gRPC server.
pub const DEFAULT_GRPC_PORT: u16 = 8080;

/// Default port of the network-runner HTTP gateway.
pub const DEFAULT_GATEWAY_PORT: u16 = 8081;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Time allowed for the backend to accept its first request.
pub const DEFAULT_DIAL_TIMEOUT_MS: u64 = 10_000;

/// Pause between two health queries while a network boots.
pub const DEFAULT_HEALTH_POLL_INTERVAL_MS: u64 = 100;

/// Overall budget for a network to become healthy.
pub const DEFAULT_START_TIMEOUT_MS: u64 = 180_000;

/// Budget for a single control request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 180_000;

/// Location of the archived default snapshot.
pub const DEFAULT_BOOTSTRAP_SNAPSHOT_URL: &str =
    "https://github.com/ava-labs/avalanche-cli/raw/main/assets/bootstrapSnapshot.tar.gz";

/// Computes the default base directory, `~/.avalanche-cli`.
///
/// Falls back to the temporary directory when the home directory cannot be
/// resolved or is not valid UTF-8.
pub fn default_base_dir() -> Utf8PathBuf {
    let home = home_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(fallback_base_directory);
    home.join(BASE_DIR_NAME)
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

/// Gateway endpoint used when none is configured.
pub fn default_gateway_endpoint() -> GatewayEndpoint {
    GatewayEndpoint::new("127.0.0.1", DEFAULT_GATEWAY_PORT)
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Owned bootstrap snapshot location.
pub fn default_bootstrap_snapshot_url() -> String {
    DEFAULT_BOOTSTRAP_SNAPSHOT_URL.to_owned()
}

/// Default logging format for the binary.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}
