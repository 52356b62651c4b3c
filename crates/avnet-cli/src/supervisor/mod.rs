//! Supervision of the detached backend process.
//!
//! The backend is this executable re-run with `backend start`. Nothing keeps
//! a child handle: liveness always comes from the process table and the
//! recorded PID from the run file, so any later invocation can find and stop
//! a backend started by an earlier one.
//!
//! - [`lister`] enumerates processes.
//! - [`spawning`] launches the detached backend.
//! - [`run_file`] records and reads back the launched PID.
//! - [`signal`] delivers termination signals.

mod error;
mod lister;
mod run_file;
mod signal;
mod spawning;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

pub use error::SupervisorError;
#[cfg(test)]
pub(crate) use lister::MockProcessLister;
pub use lister::{ProcessEntry, ProcessLister, SystemProcessLister};
pub use run_file::RunRecord;

pub(crate) const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");

/// Command-line fragment identifying backend processes.
pub const BACKEND_MARKER: &str = "backend start";

/// A backend launched by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    /// Process identifier of the backend.
    pub pid: u32,
    /// File receiving the backend's output.
    pub output_path: PathBuf,
}

impl From<RunRecord> for ProcessHandle {
    fn from(record: RunRecord) -> Self {
        Self {
            pid: record.pid,
            output_path: record.output_path,
        }
    }
}

/// Lifecycle operations on the detached backend.
#[cfg_attr(test, mockall::automock)]
pub trait Supervisor {
    /// Returns true when any process carries the backend marker.
    fn is_running(&self) -> Result<bool, SupervisorError>;

    /// Launches the worker executable detached, with `args` after the
    /// forwarded configuration flags. Nothing is recorded.
    fn spawn(&self, args: &[OsString]) -> Result<ProcessHandle, SupervisorError>;

    /// Launches a new backend and records it in the run file.
    fn start(&self) -> Result<ProcessHandle, SupervisorError>;

    /// Returns true while the process behind `handle` is still a backend.
    fn is_alive(&self, handle: &ProcessHandle) -> Result<bool, SupervisorError>;

    /// Sends a termination signal to `pid`.
    fn kill(&self, pid: u32) -> Result<(), SupervisorError>;

    /// Backend recorded in the run file, if any. The process may since have
    /// exited; check it with [`Supervisor::is_alive`] before signalling.
    fn recorded(&self) -> Result<Option<ProcessHandle>, SupervisorError>;

    /// Removes the run file.
    fn forget(&self) -> Result<(), SupervisorError>;

    /// Terminates every backend except `except` and returns the signalled PIDs.
    fn kill_strays(&self, except: Option<u32>) -> Result<Vec<u32>, SupervisorError>;
}

/// Supervisor backed by the real process table.
#[derive(Debug)]
pub struct SystemSupervisor<L: ProcessLister> {
    lister: L,
    executable: PathBuf,
    config_arguments: Vec<OsString>,
    run_file: PathBuf,
}

impl SystemSupervisor<SystemProcessLister> {
    /// Builds a supervisor that relaunches the current executable.
    pub fn for_current_exe(
        config_arguments: Vec<OsString>,
        run_file: &Path,
    ) -> Result<Self, SupervisorError> {
        let executable = std::env::current_exe()
            .map_err(|source| SupervisorError::CurrentExecutable { source })?;
        Ok(Self::new(
            SystemProcessLister,
            executable,
            config_arguments,
            run_file,
        ))
    }
}

impl<L: ProcessLister> SystemSupervisor<L> {
    /// Builds a supervisor from explicit parts.
    pub fn new(
        lister: L,
        executable: PathBuf,
        config_arguments: Vec<OsString>,
        run_file: &Path,
    ) -> Self {
        Self {
            lister,
            executable,
            config_arguments,
            run_file: run_file.to_path_buf(),
        }
    }

    fn backends(&self) -> Vec<u32> {
        self.lister
            .processes()
            .into_iter()
            .filter(|entry| entry.matches(BACKEND_MARKER))
            .map(|entry| entry.pid)
            .collect()
    }
}

impl<L: ProcessLister> Supervisor for SystemSupervisor<L> {
    fn is_running(&self) -> Result<bool, SupervisorError> {
        Ok(!self.backends().is_empty())
    }

    fn spawn(&self, args: &[OsString]) -> Result<ProcessHandle, SupervisorError> {
        spawning::spawn_detached(&self.executable, &self.config_arguments, args)
    }

    fn start(&self) -> Result<ProcessHandle, SupervisorError> {
        let args: Vec<OsString> = BACKEND_MARKER.split(' ').map(OsString::from).collect();
        let handle = self.spawn(&args)?;
        let record = RunRecord {
            output_path: handle.output_path.clone(),
            pid: handle.pid,
        };
        if let Err(error) = run_file::write_run_file(&self.run_file, &record) {
            warn!(
                target: SUPERVISOR_TARGET,
                path = %self.run_file.display(),
                %error,
                "could not record backend pid"
            );
        }
        info!(
            target: SUPERVISOR_TARGET,
            pid = handle.pid,
            output = %handle.output_path.display(),
            "backend started"
        );
        Ok(handle)
    }

    fn is_alive(&self, handle: &ProcessHandle) -> Result<bool, SupervisorError> {
        Ok(self.backends().contains(&handle.pid))
    }

    fn kill(&self, pid: u32) -> Result<(), SupervisorError> {
        signal::terminate(pid)?;
        info!(target: SUPERVISOR_TARGET, pid, "backend signalled");
        Ok(())
    }

    fn recorded(&self) -> Result<Option<ProcessHandle>, SupervisorError> {
        Ok(run_file::read_run_file(&self.run_file)?.map(ProcessHandle::from))
    }

    fn forget(&self) -> Result<(), SupervisorError> {
        run_file::remove_run_file(&self.run_file)
    }

    fn kill_strays(&self, except: Option<u32>) -> Result<Vec<u32>, SupervisorError> {
        let own_pid = std::process::id();
        let mut signalled = Vec::new();
        for pid in self.backends() {
            if Some(pid) == except || pid == own_pid {
                continue;
            }
            match signal::terminate(pid) {
                Ok(()) => signalled.push(pid),
                Err(error) => warn!(
                    target: SUPERVISOR_TARGET,
                    pid,
                    %error,
                    "failed to terminate stray backend"
                ),
            }
        }
        Ok(signalled)
    }
}
