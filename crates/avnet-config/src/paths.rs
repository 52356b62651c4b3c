//! Derives the on-disk layout shared by every command.
//!
//! The base directory houses downloaded binaries, saved network snapshots and
//! the run artefacts of the backend process. Both the CLI and the backend
//! need to agree on the layout so a command can pick up where an earlier
//! invocation left off.

use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

/// Name of the snapshot loaded when the operator does not pick one.
pub const DEFAULT_SNAPSHOT_NAME: &str = "default";

/// Prefix the network runner puts in front of every snapshot directory.
pub const SNAPSHOT_DIR_PREFIX: &str = "anr-snapshot-";

/// Archive holding the default snapshot.
pub const BOOTSTRAP_ARCHIVE_NAME: &str = "bootstrapSnapshot.tar.gz";

/// File recording the last spawned backend.
pub const RUN_FILE_NAME: &str = "gRPCserver.run";

const BIN_DIR: &str = "bin";
const AVALANCHEGO_DIR: &str = "avalanchego";
const SNAPSHOTS_DIR: &str = "snapshots";
const RUNS_DIR: &str = "runs";

/// Canonical paths below the configured base directory.
#[derive(Debug, Clone)]
pub struct AppPaths {
    base_dir: PathBuf,
    bin_dir: PathBuf,
    snapshots_dir: PathBuf,
    runs_dir: PathBuf,
    run_file: PathBuf,
}

impl AppPaths {
    /// Derives the layout from the shared configuration and creates it.
    pub fn from_config(config: &Config) -> Result<Self, AppPathsError> {
        Self::from_base_dir(config.base_dir.as_std_path())
    }

    /// Derives the layout below `base_dir` and creates its directories.
    pub fn from_base_dir(base_dir: impl Into<PathBuf>) -> Result<Self, AppPathsError> {
        let paths = Self::layout(base_dir.into());
        for dir in [&paths.base_dir, &paths.bin_dir, &paths.snapshots_dir, &paths.runs_dir] {
            create_private_dir(dir)?;
        }
        Ok(paths)
    }

    fn layout(base_dir: PathBuf) -> Self {
        let runs_dir = base_dir.join(RUNS_DIR);
        Self {
            bin_dir: base_dir.join(BIN_DIR),
            snapshots_dir: base_dir.join(SNAPSHOTS_DIR),
            run_file: runs_dir.join(RUN_FILE_NAME),
            runs_dir,
            base_dir,
        }
    }

    /// Root of all persisted state.
    pub fn base_dir(&self) -> &Path {
        self.base_dir.as_path()
    }

    /// Directory holding downloaded node and plugin binaries.
    pub fn bin_dir(&self) -> &Path {
        self.bin_dir.as_path()
    }

    /// Directory holding one sub-directory per installed avalanchego version.
    pub fn avalanchego_bin_dir(&self) -> PathBuf {
        self.bin_dir.join(AVALANCHEGO_DIR)
    }

    /// Directory the network runner saves snapshots into.
    pub fn snapshots_dir(&self) -> &Path {
        self.snapshots_dir.as_path()
    }

    /// Directory of the snapshot called `name`.
    pub fn snapshot_dir(&self, name: &str) -> PathBuf {
        self.snapshots_dir.join(format!("{SNAPSHOT_DIR_PREFIX}{name}"))
    }

    /// Location of the downloaded default snapshot archive.
    pub fn bootstrap_archive_path(&self) -> PathBuf {
        self.snapshots_dir.join(BOOTSTRAP_ARCHIVE_NAME)
    }

    /// Directory holding run artefacts.
    pub fn runs_dir(&self) -> &Path {
        self.runs_dir.as_path()
    }

    /// Path of the file recording the last spawned backend.
    pub fn run_file(&self) -> &Path {
        self.run_file.as_path()
    }

    /// Creates a fresh root data directory for a network run.
    pub fn create_network_dir(&self, timestamp: &str) -> Result<PathBuf, AppPathsError> {
        let dir = self.runs_dir.join(format!("network_{timestamp}"));
        create_private_dir(&dir)?;
        Ok(dir)
    }
}

fn create_private_dir(path: &Path) -> Result<(), AppPathsError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    match builder.create(path) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(source) => Err(AppPathsError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Errors raised while preparing the on-disk layout.
#[derive(Debug, Error)]
pub enum AppPathsError {
    /// Creating one of the layout directories failed.
    #[error("failed to prepare directory '{path}': {source}", path = .path.display())]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
