//! Termination signalling.

use super::error::SupervisorError;

/// Sends `SIGTERM` to `pid`.
///
/// # Platform Support
///
/// - **Unix**: uses `kill(2)` through `nix`.
/// - **Non-Unix**: returns `UnsupportedPlatform`.
pub(super) fn terminate(pid: u32) -> Result<(), SupervisorError> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid).map_err(|_| SupervisorError::PidOutOfRange { pid })?;
        kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(|errno| SupervisorError::SignalFailed {
            pid,
            source: errno.into(),
        })
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(SupervisorError::UnsupportedPlatform)
    }
}
