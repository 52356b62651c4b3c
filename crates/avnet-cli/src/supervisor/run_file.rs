//! The run file recording the detached backend.
//!
//! The file holds two lines so it stays readable by operators:
//!
//! ```text
//! gRPC server output file: /tmp/gRPCserver123
//! gRPC server PID: 4242
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::error::SupervisorError;

const OUTPUT_FIELD: &str = "gRPC server output file";
const PID_FIELD: &str = "gRPC server PID";

/// Parsed contents of the run file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    /// File receiving the backend's stdout and stderr.
    pub output_path: PathBuf,
    /// Process identifier of the backend.
    pub pid: u32,
}

/// Writes `record` to `path`, replacing any previous content.
pub(crate) fn write_run_file(path: &Path, record: &RunRecord) -> io::Result<()> {
    let contents = format!(
        "{OUTPUT_FIELD}: {}\n{PID_FIELD}: {}\n",
        record.output_path.display(),
        record.pid
    );
    fs::write(path, contents)
}

/// Reads the run file at `path`; a missing file yields `None`.
pub(crate) fn read_run_file(path: &Path) -> Result<Option<RunRecord>, SupervisorError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SupervisorError::ReadRunFile {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let output_path = field(&contents, OUTPUT_FIELD).ok_or_else(|| {
        SupervisorError::MissingRunField {
            path: path.to_path_buf(),
            field: OUTPUT_FIELD,
        }
    })?;
    let pid = field(&contents, PID_FIELD)
        .ok_or_else(|| SupervisorError::MissingRunField {
            path: path.to_path_buf(),
            field: PID_FIELD,
        })?
        .parse::<u32>()
        .map_err(|source| SupervisorError::ParsePid {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(Some(RunRecord {
        output_path: PathBuf::from(output_path),
        pid,
    }))
}

/// Deletes the run file; a missing file is not an error.
pub(crate) fn remove_run_file(path: &Path) -> Result<(), SupervisorError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SupervisorError::RemoveRunFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn field<'a>(contents: &'a str, name: &str) -> Option<&'a str> {
    contents.lines().find_map(|line| {
        line.strip_prefix(name)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::trim)
    })
}
