//! Network session control.
//!
//! A session walks a strict order: provisioning first, then the backend
//! process, then control calls against the gateway. [`SessionController`]
//! owns that ordering; the collaborators it drives sit behind the
//! [`Provisioner`], [`crate::supervisor::Supervisor`] and
//! [`avnet_control_types::NetworkControl`] traits.

mod controller;
mod error;
mod polling;
mod provision;

use std::time::Duration;

use avnet_config::Config;

pub use controller::SessionController;
pub use error::SessionError;
#[cfg(test)]
pub(crate) use provision::MockProvisioner;
pub use provision::{LATEST_VERSION, Provisioner, SystemProvisioner};

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Deadlines and intervals applied by the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// How long to keep pinging the backend before giving up.
    pub dial_timeout: Duration,
    /// Pause between pings and between health polls.
    pub poll_interval: Duration,
    /// Overall bound on waiting for a healthy network.
    pub start_timeout: Duration,
    /// Bound on each stop, save and remove call.
    pub request_timeout: Duration,
}

impl SessionTiming {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            dial_timeout: config.dial_timeout(),
            poll_interval: config.health_poll_interval(),
            start_timeout: config.start_timeout(),
            request_timeout: config.request_timeout(),
        }
    }
}
