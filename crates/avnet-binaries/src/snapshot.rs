//! Installation of the bootstrap snapshot that backs the default network.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::PROVISION_TARGET;
use crate::archive::{ArchiveKind, install_archive};
use crate::error::ProvisionError;
use crate::http::fetch_bytes;

/// Where the bootstrap snapshot comes from and where it lands.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapSnapshot<'a> {
    /// URL of the gzip-compressed snapshot archive.
    pub url: &'a str,
    /// Local copy of the archive.
    pub archive_path: &'a Path,
    /// Directory the archive unpacks into.
    pub snapshots_dir: &'a Path,
    /// Directory the archive produces once unpacked.
    pub snapshot_dir: &'a Path,
}

/// Ensures the default snapshot directory exists.
///
/// The archive is downloaded only when no local copy exists and unpacked only
/// when the snapshot directory is missing. With `force` the snapshot
/// directory is deleted first so it is recreated from the archive.
///
/// # Errors
///
/// Fails when the archive cannot be fetched, stored or unpacked.
pub fn install_bootstrap_snapshot(
    client: &Client,
    snapshot: BootstrapSnapshot<'_>,
    force: bool,
) -> Result<PathBuf, ProvisionError> {
    if force {
        match fs::remove_dir_all(snapshot.snapshot_dir) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(ProvisionError::io("remove", snapshot.snapshot_dir, source)),
        }
    }

    let mut archive = None;
    if !snapshot.archive_path.is_file() {
        info!(target: PROVISION_TARGET, url = snapshot.url, "downloading bootstrap snapshot");
        let bytes = fetch_bytes(client.get(snapshot.url), snapshot.url)?;
        fs::write(snapshot.archive_path, &bytes)
            .map_err(|source| ProvisionError::io("write", snapshot.archive_path, source))?;
        archive = Some(bytes);
    }

    if snapshot.snapshot_dir.is_dir() {
        debug!(
            target: PROVISION_TARGET,
            path = %snapshot.snapshot_dir.display(),
            "bootstrap snapshot already installed"
        );
        return Ok(snapshot.snapshot_dir.to_path_buf());
    }

    let bytes = match archive {
        Some(bytes) => bytes,
        None => fs::read(snapshot.archive_path)
            .map_err(|source| ProvisionError::io("read", snapshot.archive_path, source))?,
    };
    install_archive(ArchiveKind::TarGz, &bytes, snapshot.snapshots_dir)?;
    if !snapshot.snapshot_dir.is_dir() {
        return Err(ProvisionError::MissingInstall {
            path: snapshot.snapshot_dir.to_path_buf(),
        });
    }
    info!(
        target: PROVISION_TARGET,
        path = %snapshot.snapshot_dir.display(),
        "installed bootstrap snapshot"
    );
    Ok(snapshot.snapshot_dir.to_path_buf())
}
