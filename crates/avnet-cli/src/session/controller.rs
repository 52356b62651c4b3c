//! Start, stop and clean sequences for a local network.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, info, warn};

use avnet_binaries::prune_plugins;
use avnet_config::{AppPaths, SNAPSHOT_DIR_PREFIX};
use avnet_control_types::{
    ClusterInfo, ControlError, ControlErrorKind, LoadSnapshotRequest, NetworkControl,
    StartRequest,
};

use crate::output::CommandOutput;
use crate::supervisor::Supervisor;

use super::error::SessionError;
use super::polling::{Deadline, wait_for_backend, wait_until_healthy};
use super::provision::Provisioner;
use super::{SESSION_TARGET, SessionTiming};

const AVALANCHEGO_EXECUTABLE: &str = "avalanchego";
const PLUGIN_DIR_NAME: &str = "plugins";

/// Coordinates provisioning, the backend process and control calls.
pub struct SessionController<'a, C, S, P> {
    control: &'a C,
    supervisor: &'a S,
    provisioner: &'a P,
    paths: &'a AppPaths,
    timing: SessionTiming,
}

impl<'a, C, S, P> SessionController<'a, C, S, P>
where
    C: NetworkControl,
    S: Supervisor,
    P: Provisioner,
{
    pub fn new(
        control: &'a C,
        supervisor: &'a S,
        provisioner: &'a P,
        paths: &'a AppPaths,
        timing: SessionTiming,
    ) -> Self {
        Self {
            control,
            supervisor,
            provisioner,
            paths,
            timing,
        }
    }

    /// Provisions everything and boots `snapshot_name`, returning the node URIs.
    pub fn start<W: Write, E: Write>(
        &self,
        snapshot_name: &str,
        avalanchego_version: &str,
        plugins: &[String],
        output: &mut CommandOutput<W, E>,
    ) -> Result<Vec<String>, SessionError> {
        let request = self.prepare_start(snapshot_name, avalanchego_version, plugins)?;
        self.start_network(&request, self.timing.start_timeout, output)
    }

    /// Installs binaries, `plugins` and the default snapshot, ensures the
    /// backend runs and builds the load request for a fresh run directory.
    pub fn prepare_start(
        &self,
        snapshot_name: &str,
        avalanchego_version: &str,
        plugins: &[String],
    ) -> Result<LoadSnapshotRequest, SessionError> {
        let avalanchego_dir = self.provisioner.install_avalanchego(avalanchego_version)?;
        let plugin_dir = avalanchego_dir.join(PLUGIN_DIR_NAME);
        if !plugins.is_empty() {
            self.provisioner.install_plugins(&plugin_dir, plugins)?;
        }
        self.provisioner.install_bootstrap_snapshot(false)?;
        self.ensure_backend()?;

        let root_data_dir = self.paths.create_network_dir(&run_timestamp()?)?;
        Ok(LoadSnapshotRequest {
            snapshot_name: snapshot_name.to_owned(),
            exec_path: Some(display(&avalanchego_dir.join(AVALANCHEGO_EXECUTABLE))),
            plugin_dir: Some(display(&plugin_dir)),
            root_data_dir: Some(display(&root_data_dir)),
            reassign_ports_if_used: true,
            global_node_config: None,
        })
    }

    /// Loads the requested snapshot, falling back to a fresh network when it
    /// does not exist, and waits until the cluster is healthy.
    ///
    /// Once the backend answers, `timeout` bounds every remaining control
    /// call together, not each one separately.
    pub fn start_network<W: Write, E: Write>(
        &self,
        request: &LoadSnapshotRequest,
        timeout: Duration,
        output: &mut CommandOutput<W, E>,
    ) -> Result<Vec<String>, SessionError> {
        self.connect()?;
        let deadline = Deadline::after(timeout);

        match self.control.status(deadline.instant()) {
            Ok(info) => {
                output.stdout_line(format_args!("Network has already been booted."))?;
                return print_endpoints(&info, output);
            }
            Err(error) if error.is(ControlErrorKind::NotBootstrapped) => {}
            Err(error) => return Err(start_failure("query network status", error, deadline)),
        }

        match self.control.load_snapshot(request, deadline.instant()) {
            Ok(_) => {}
            Err(error) if error.is(ControlErrorKind::SnapshotNotFound) => {
                info!(
                    target: SESSION_TARGET,
                    snapshot = %request.snapshot_name,
                    "snapshot not found; starting a fresh network"
                );
                self.control
                    .start(&StartRequest::from(request), deadline.instant())
                    .map_err(|error| start_failure("start network", error, deadline))?;
            }
            Err(error) => return Err(start_failure("load snapshot", error, deadline)),
        }

        output.stdout_line(format_args!("Booting Network. Wait until healthy..."))?;
        let info = wait_until_healthy(self.control, self.timing.poll_interval, deadline)?;
        output.stdout_line(format_args!(
            "Network ready to use. Local network node endpoints:"
        ))?;
        print_endpoints(&info, output)
    }

    /// Stops the running network, saving it as `snapshot_name` when `save`
    /// is set. The backend process keeps running.
    pub fn stop_network<W: Write, E: Write>(
        &self,
        snapshot_name: &str,
        save: bool,
        output: &mut CommandOutput<W, E>,
    ) -> Result<(), SessionError> {
        let result = if save {
            self.save_and_stop(snapshot_name)
        } else {
            self.control
                .stop(self.request_deadline())
                .map_err(|error| ("stop network", error))
        };

        match result {
            Ok(()) => {
                info!(target: SESSION_TARGET, snapshot = snapshot_name, save, "network stopped");
                output.stdout_line(format_args!("Network stopped successfully."))?;
                Ok(())
            }
            Err((_, error))
                if error.is(ControlErrorKind::NotBootstrapped)
                    || error.is(ControlErrorKind::Unavailable) =>
            {
                debug!(target: SESSION_TARGET, %error, "no network to stop");
                output.stdout_line(format_args!("Network already stopped."))?;
                Ok(())
            }
            Err((operation, error)) => Err(SessionError::control(operation, error)),
        }
    }

    /// Resets local state. Every step is attempted; failures are logged.
    pub fn clean<W: Write, E: Write>(
        &self,
        hard: bool,
        output: &mut CommandOutput<W, E>,
    ) -> Result<(), SessionError> {
        self.stop_if_reachable();
        self.reset_snapshots();
        let recorded = self.kill_recorded_backend();

        if hard {
            self.remove_binaries();
            match self.supervisor.kill_strays(recorded) {
                Ok(pids) if !pids.is_empty() => {
                    info!(target: SESSION_TARGET, ?pids, "terminated stray backends");
                }
                Ok(_) => {}
                Err(error) => warn!(target: SESSION_TARGET, %error, "could not scan for stray backends"),
            }
        } else {
            self.prune_installed_plugins();
        }

        output.stdout_line(format_args!("Process terminated."))?;
        Ok(())
    }

    fn ensure_backend(&self) -> Result<(), SessionError> {
        if self.supervisor.is_running()? {
            debug!(target: SESSION_TARGET, "backend already running");
            return Ok(());
        }
        let handle = self.supervisor.start()?;
        debug!(
            target: SESSION_TARGET,
            pid = handle.pid,
            output = %handle.output_path.display(),
            "backend launched"
        );
        Ok(())
    }

    fn connect(&self) -> Result<(), SessionError> {
        wait_for_backend(
            self.control,
            self.timing.dial_timeout,
            self.timing.poll_interval,
        )
    }

    fn request_deadline(&self) -> Instant {
        Instant::now() + self.timing.request_timeout
    }

    /// Replaces any previous snapshot called `snapshot_name` with the running
    /// network. Failures carry the operation that raised them.
    fn save_and_stop(&self, snapshot_name: &str) -> Result<(), (&'static str, ControlError)> {
        match self
            .control
            .remove_snapshot(snapshot_name, self.request_deadline())
        {
            Ok(()) => {}
            Err(error)
                if error.is(ControlErrorKind::SnapshotNotFound)
                    || error.is(ControlErrorKind::SnapshotAlreadyExists) =>
            {
                debug!(target: SESSION_TARGET, %error, "no previous snapshot to replace");
            }
            Err(error) => return Err(("remove snapshot", error)),
        }
        self.control
            .save_snapshot(snapshot_name, self.request_deadline())
            .map_err(|error| ("save snapshot", error))
    }

    fn stop_if_reachable(&self) {
        if let Err(error) = self.control.ping(self.request_deadline()) {
            debug!(target: SESSION_TARGET, %error, "backend not reachable; nothing to stop");
            return;
        }
        match self.control.stop(self.request_deadline()) {
            Ok(()) => info!(target: SESSION_TARGET, "network stopped"),
            Err(error) if error.is(ControlErrorKind::NotBootstrapped) => {}
            Err(error) => warn!(target: SESSION_TARGET, %error, "failed to stop network"),
        }
    }

    fn reset_snapshots(&self) {
        for dir in snapshot_dirs(self.paths.snapshots_dir()) {
            if let Err(error) = fs::remove_dir_all(&dir) {
                warn!(
                    target: SESSION_TARGET,
                    path = %dir.display(),
                    %error,
                    "failed to remove snapshot"
                );
            }
        }
        if let Err(error) = self.provisioner.install_bootstrap_snapshot(true) {
            warn!(target: SESSION_TARGET, %error, "failed to reinstall default snapshot");
        }
    }

    /// Signals the recorded backend if it is still one, then drops the
    /// record. Returns the PID that was signalled.
    fn kill_recorded_backend(&self) -> Option<u32> {
        let handle = match self.supervisor.recorded() {
            Ok(handle) => handle?,
            Err(error) => {
                warn!(target: SESSION_TARGET, %error, "could not read recorded backend");
                return None;
            }
        };
        let pid = handle.pid;
        let signalled = match self.supervisor.is_alive(&handle) {
            Ok(true) => {
                if let Err(error) = self.supervisor.kill(pid) {
                    warn!(target: SESSION_TARGET, pid, %error, "failed to terminate backend");
                }
                Some(pid)
            }
            Ok(false) => {
                debug!(target: SESSION_TARGET, pid, "recorded backend is gone");
                None
            }
            Err(error) => {
                warn!(target: SESSION_TARGET, pid, %error, "could not check recorded backend");
                None
            }
        };
        if let Err(error) = self.supervisor.forget() {
            warn!(target: SESSION_TARGET, %error, "failed to remove run file");
        }
        signalled
    }

    fn remove_binaries(&self) {
        let bin_dir = self.paths.bin_dir();
        match fs::remove_dir_all(bin_dir) {
            Ok(()) => info!(target: SESSION_TARGET, path = %bin_dir.display(), "binaries removed"),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => warn!(
                target: SESSION_TARGET,
                path = %bin_dir.display(),
                %error,
                "failed to remove binaries"
            ),
        }
    }

    fn prune_installed_plugins(&self) {
        let Ok(entries) = fs::read_dir(self.paths.avalanchego_bin_dir()) else {
            return;
        };
        for entry in entries.flatten() {
            let plugin_dir = entry.path().join(PLUGIN_DIR_NAME);
            if let Err(error) = prune_plugins(&plugin_dir, &[]) {
                warn!(
                    target: SESSION_TARGET,
                    path = %plugin_dir.display(),
                    %error,
                    "failed to prune plugins"
                );
            }
        }
    }
}

/// Maps a control failure during start, reporting an elapsed deadline as
/// the health timeout.
fn start_failure(operation: &'static str, error: ControlError, deadline: Deadline) -> SessionError {
    if error.is(ControlErrorKind::DeadlineExceeded) {
        SessionError::HealthTimeout {
            timeout_ms: deadline.budget_ms(),
        }
    } else {
        SessionError::control(operation, error)
    }
}

fn print_endpoints<W: Write, E: Write>(
    info: &ClusterInfo,
    output: &mut CommandOutput<W, E>,
) -> Result<Vec<String>, SessionError> {
    let endpoints = info.endpoints();
    for endpoint in &endpoints {
        output.stdout_line(format_args!("  {endpoint}"))?;
    }
    Ok(endpoints)
}

fn snapshot_dirs(snapshots_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(snapshots_dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(SNAPSHOT_DIR_PREFIX))
        })
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect()
}

fn run_timestamp() -> Result<String, SessionError> {
    let format = format_description!("[year][month][day]_[hour][minute][second]");
    Ok(OffsetDateTime::now_utc().format(format)?)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
