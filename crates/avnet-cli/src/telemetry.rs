//! Tracing setup for `avnet` invocations.
//!
//! A `network` command shares the terminal with its own progress lines, so
//! its diagnostics are short and untimestamped. The backend runs detached
//! with stderr redirected to its output file; there every line carries a UTC
//! timestamp, the target and the thread name, which tells the signal
//! forwarder apart from the main thread.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use avnet_config::defaults::DEFAULT_LOG_FILTER;
use avnet_config::{Config, LogFormat};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Which kind of process the subscriber is installed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryMode {
    /// A short-lived `network` command attached to a terminal.
    Command,
    /// The long-lived backend writing to its output file.
    Backend,
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression does not parse.
    #[error("invalid log filter '{expression}': {message}")]
    Filter { expression: String, message: String },
    /// Another subscriber was installed first.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber for `mode` on first use.
///
/// Later calls return immediately without touching the global state.
pub fn initialise(config: &Config, mode: TelemetryMode) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config, mode))
        .map(|_| ())
}

/// Parses the configured filter; a blank value means [`DEFAULT_LOG_FILTER`].
fn filter_for(config: &Config) -> Result<EnvFilter, TelemetryError> {
    let expression = match config.log_filter().trim() {
        "" => DEFAULT_LOG_FILTER,
        expression => expression,
    };
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter {
        expression: expression.to_owned(),
        message: error.to_string(),
    })
}

fn install_subscriber(config: &Config, mode: TelemetryMode) -> Result<(), TelemetryError> {
    let filter = filter_for(config)?;

    let command = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
    };
    let backend = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true)
            .with_writer(io::stderr)
            .with_ansi(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match (mode, config.log_format()) {
        (TelemetryMode::Command, LogFormat::Compact) => Box::new(command(filter).compact().finish()),
        (TelemetryMode::Command, LogFormat::Json) => {
            Box::new(command(filter).json().flatten_event(true).finish())
        }
        (TelemetryMode::Backend, LogFormat::Compact) => Box::new(backend(filter).compact().finish()),
        (TelemetryMode::Backend, LogFormat::Json) => {
            Box::new(backend(filter).json().flatten_event(true).finish())
        }
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
