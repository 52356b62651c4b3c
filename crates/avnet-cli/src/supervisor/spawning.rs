//! Detached backend spawning.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use super::error::SupervisorError;
use super::{ProcessHandle, SUPERVISOR_TARGET};

const OUTPUT_PREFIX: &str = "gRPCserver";

/// Spawns `binary` with the forwarded configuration flags followed by
/// `args`, detached from this process.
///
/// `config_arguments` starts with argv\[0\], which is skipped. The child's
/// stdout and stderr are appended to a fresh temporary file that outlives the
/// call. The child is never waited on.
pub(super) fn spawn_detached(
    binary: &Path,
    config_arguments: &[OsString],
    args: &[OsString],
) -> Result<ProcessHandle, SupervisorError> {
    let (output, output_path) = tempfile::Builder::new()
        .prefix(OUTPUT_PREFIX)
        .tempfile()
        .and_then(|file| file.keep().map_err(|error| error.error))
        .map_err(|source| SupervisorError::OutputFile { source })?;
    let stderr = output
        .try_clone()
        .map_err(|source| SupervisorError::OutputFile { source })?;

    let mut command = Command::new(binary);
    command
        .args(config_arguments.iter().skip(1))
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(output))
        .stderr(Stdio::from(stderr));
    detach(&mut command);

    let child = command.spawn().map_err(|source| SupervisorError::Spawn {
        binary: binary.to_path_buf(),
        source,
    })?;
    debug!(
        target: SUPERVISOR_TARGET,
        pid = child.id(),
        output = %output_path.display(),
        "worker spawned"
    );
    Ok(ProcessHandle {
        pid: child.id(),
        output_path,
    })
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    // A separate process group keeps terminal signals aimed at the CLI away
    // from the backend.
    command.process_group(0);
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}
