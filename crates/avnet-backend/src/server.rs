//! Foreground supervision of the network-runner child.

use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::{info, warn};

use crate::BACKEND_TARGET;
use crate::command::RunnerCommand;
use crate::error::BackendError;
use crate::shutdown::ShutdownSignal;

/// Runs `command` until it exits, forwarding shutdown to it.
///
/// `shutdown` must already be listening so a signal that arrives while the
/// runner is being launched is still forwarded.
///
/// Stdout and stderr are inherited so the runner's output lands wherever the
/// backend's own output was redirected. Once `shutdown` fires the runner
/// receives `SIGTERM` and its exit is treated as success.
///
/// # Errors
///
/// Fails when the runner cannot be launched or waited on, or when it exits
/// unsuccessfully before shutdown was requested.
pub fn serve(
    command: &RunnerCommand,
    shutdown: Box<dyn ShutdownSignal>,
) -> Result<(), BackendError> {
    let mut child = Command::new(command.program())
        .args(command.args())
        .stdin(Stdio::null())
        .spawn()
        .map_err(|source| BackendError::Spawn {
            program: command.program().to_path_buf(),
            source,
        })?;
    info!(
        target: BACKEND_TARGET,
        pid = child.id(),
        program = %command.program().display(),
        "network runner started"
    );

    let stopping = Arc::new(AtomicBool::new(false));
    forward_shutdown(child.id(), shutdown, Arc::clone(&stopping));

    let status = wait(&mut child, command)?;
    if stopping.load(Ordering::SeqCst) || status.success() {
        info!(target: BACKEND_TARGET, %status, "network runner stopped");
        return Ok(());
    }
    Err(BackendError::RunnerExited {
        program: command.program().to_path_buf(),
        status,
    })
}

fn wait(child: &mut Child, command: &RunnerCommand) -> Result<ExitStatus, BackendError> {
    child.wait().map_err(|source| BackendError::Wait {
        program: command.program().to_path_buf(),
        source,
    })
}

// The listener thread is detached: when the runner exits on its own the
// process ends while the thread is still blocked in `wait`.
fn forward_shutdown(pid: u32, mut shutdown: Box<dyn ShutdownSignal>, stopping: Arc<AtomicBool>) {
    thread::spawn(move || {
        if let Err(error) = shutdown.wait() {
            warn!(target: BACKEND_TARGET, %error, "shutdown listener failed");
            return;
        }
        stopping.store(true, Ordering::SeqCst);
        terminate(pid);
    });
}

#[cfg(unix)]
fn terminate(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        warn!(target: BACKEND_TARGET, pid, "runner pid out of range");
        return;
    };
    if let Err(error) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
        warn!(target: BACKEND_TARGET, pid, %error, "failed to signal network runner");
    }
}

#[cfg(not(unix))]
fn terminate(pid: u32) {
    warn!(
        target: BACKEND_TARGET,
        pid,
        "signal forwarding is not supported on this platform"
    );
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};
    use std::time::{Duration, Instant};

    use crate::shutdown::{ShutdownError, SystemShutdownSignal};

    struct Immediate;

    impl ShutdownSignal for Immediate {
        fn wait(&mut self) -> Result<(), ShutdownError> {
            thread::sleep(Duration::from_millis(100));
            Ok(())
        }
    }

    struct Never;

    impl ShutdownSignal for Never {
        fn wait(&mut self) -> Result<(), ShutdownError> {
            loop {
                thread::park();
            }
        }
    }

    fn command(program: &str, args: &[&str]) -> RunnerCommand {
        let mut command = RunnerCommand::new(PathBuf::from(program), 0, 0, Path::new("/tmp"));
        command.replace_args(args.iter().map(|arg| OsString::from(*arg)).collect());
        command
    }

    #[test]
    fn shutdown_terminates_the_runner() {
        let started = Instant::now();
        serve(&command("sleep", &["30"]), Box::new(Immediate)).expect("runner stops cleanly");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn signal_received_before_launch_still_stops_the_runner() {
        let shutdown = SystemShutdownSignal::install().expect("install handlers");
        nix::sys::signal::raise(nix::sys::signal::Signal::SIGHUP).expect("raise SIGHUP");
        let started = Instant::now();

        serve(&command("sleep", &["30"]), Box::new(shutdown)).expect("runner stops cleanly");

        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn runner_failure_is_reported() {
        let error = serve(&command("false", &[]), Box::new(Never)).expect_err("runner failed");
        assert!(matches!(error, BackendError::RunnerExited { .. }));
    }

    #[test]
    fn missing_executable_cannot_spawn() {
        let error = serve(
            &command("/nonexistent/avalanche-network-runner", &[]),
            Box::new(Never),
        )
        .expect_err("spawn fails");
        assert!(matches!(error, BackendError::Spawn { .. }));
    }
}
