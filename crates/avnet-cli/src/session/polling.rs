//! Deadline-bounded polling against the control service.

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use avnet_control_types::{ClusterInfo, ControlError, ControlErrorKind, NetworkControl};

use super::SESSION_TARGET;
use super::error::SessionError;

/// A point in time together with the budget it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub(crate) fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub(crate) const fn instant(&self) -> Instant {
        self.at
    }

    pub(crate) const fn budget_ms(&self) -> u128 {
        self.budget.as_millis()
    }

    pub(crate) fn has_elapsed(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Shortens `pause` so a sleep never runs past the deadline.
    fn clamp(&self, pause: Duration) -> Duration {
        pause.min(self.at.saturating_duration_since(Instant::now()))
    }
}

/// Pings the backend until it answers or `timeout` elapses.
pub(crate) fn wait_for_backend<C: NetworkControl + ?Sized>(
    control: &C,
    timeout: Duration,
    interval: Duration,
) -> Result<(), SessionError> {
    let deadline = Deadline::after(timeout);
    loop {
        match control.ping(deadline.instant()) {
            Ok(()) => return Ok(()),
            Err(source)
                if deadline.has_elapsed() || source.is(ControlErrorKind::DeadlineExceeded) =>
            {
                return Err(SessionError::ConnectTimeout {
                    timeout_ms: deadline.budget_ms(),
                    source,
                });
            }
            Err(error) => log_retry("ping", &error),
        }
        thread::sleep(deadline.clamp(interval));
    }
}

/// Polls health until the cluster and its custom chains are healthy.
///
/// Every query carries `deadline`, so a backend that holds the request open
/// cannot stretch the wait. At least one query is attempted.
pub(crate) fn wait_until_healthy<C: NetworkControl + ?Sized>(
    control: &C,
    interval: Duration,
    deadline: Deadline,
) -> Result<ClusterInfo, SessionError> {
    loop {
        match control.health(deadline.instant()) {
            Ok(info) if info.is_ready() => return Ok(info),
            Ok(info) => debug!(
                target: SESSION_TARGET,
                healthy = info.healthy,
                custom_chains_healthy = info.custom_chains_healthy,
                "network not healthy yet"
            ),
            Err(error) => log_retry("health", &error),
        }
        if deadline.has_elapsed() {
            return Err(SessionError::HealthTimeout {
                timeout_ms: deadline.budget_ms(),
            });
        }
        thread::sleep(deadline.clamp(interval));
    }
}

fn log_retry(operation: &str, error: &ControlError) {
    debug!(
        target: SESSION_TARGET,
        operation,
        kind = ?error.kind(),
        %error,
        "control call failed; retrying"
    );
}
