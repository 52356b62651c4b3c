//! Binary and snapshot provisioning used before a network starts.

use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use semver::Version;
use tracing::{info, warn};

use avnet_binaries::{
    BinaryDownloader, BootstrapSnapshot, ReleaseBinary, ReleaseInstaller, check_installed,
    install_bootstrap_snapshot,
};
use avnet_config::{AppPaths, DEFAULT_SNAPSHOT_NAME};

use super::SESSION_TARGET;
use super::error::SessionError;

/// Version request meaning "whatever GitHub reports as the latest release".
pub const LATEST_VERSION: &str = "latest";

/// Installs what a local network needs on disk.
#[cfg_attr(test, mockall::automock)]
pub trait Provisioner {
    /// Ensures the requested avalanchego release is installed and returns its
    /// directory.
    fn install_avalanchego(&self, requested: &str) -> Result<PathBuf, SessionError>;

    /// Ensures the default snapshot exists, recreating it when `force` is set.
    fn install_bootstrap_snapshot(&self, force: bool) -> Result<PathBuf, SessionError>;

    /// Ensures each VM in `vm_ids` has a binary in `plugin_dir`.
    fn install_plugins(
        &self,
        plugin_dir: &Path,
        vm_ids: &[String],
    ) -> Result<Vec<PathBuf>, SessionError>;
}

/// Provisioner downloading from GitHub, the configured snapshot URL and the
/// plugin binary server.
pub struct SystemProvisioner<'a> {
    http: Client,
    releases: ReleaseInstaller,
    plugins: BinaryDownloader,
    paths: &'a AppPaths,
    snapshot_url: String,
}

impl<'a> SystemProvisioner<'a> {
    pub fn new(
        http: Client,
        paths: &'a AppPaths,
        snapshot_url: String,
        binary_server_url: Option<String>,
    ) -> Self {
        Self {
            releases: ReleaseInstaller::new(http.clone()),
            plugins: BinaryDownloader::new(http.clone(), binary_server_url),
            http,
            paths,
            snapshot_url,
        }
    }

    #[cfg(test)]
    fn with_releases(mut self, releases: ReleaseInstaller) -> Self {
        self.releases = releases;
        self
    }

    fn resolve_version(&self, requested: &str) -> Result<Version, SessionError> {
        if requested != LATEST_VERSION {
            return Version::parse(requested.trim_start_matches('v')).map_err(|source| {
                SessionError::InvalidVersion {
                    version: requested.to_owned(),
                    source,
                }
            });
        }

        match self.releases.latest_version(ReleaseBinary::AvalancheGo) {
            Ok(version) => Ok(version),
            Err(error) => {
                let bin_dir = self.paths.avalanchego_bin_dir();
                let prefix = ReleaseBinary::AvalancheGo.prefix();
                let Some(version) = check_installed(&bin_dir, prefix)?
                    .and_then(|installed| installed.version)
                else {
                    return Err(error.into());
                };
                warn!(
                    target: SESSION_TARGET,
                    %error,
                    %version,
                    "could not resolve latest release; using installed version"
                );
                Ok(version)
            }
        }
    }
}

impl Provisioner for SystemProvisioner<'_> {
    fn install_avalanchego(&self, requested: &str) -> Result<PathBuf, SessionError> {
        let version = self.resolve_version(requested)?;
        let install_dir = self.releases.install(
            ReleaseBinary::AvalancheGo,
            &version,
            &self.paths.avalanchego_bin_dir(),
        )?;
        info!(
            target: SESSION_TARGET,
            %version,
            path = %install_dir.display(),
            "avalanchego ready"
        );
        Ok(install_dir)
    }

    fn install_bootstrap_snapshot(&self, force: bool) -> Result<PathBuf, SessionError> {
        let archive_path = self.paths.bootstrap_archive_path();
        let snapshot_dir = self.paths.snapshot_dir(DEFAULT_SNAPSHOT_NAME);
        let snapshot = BootstrapSnapshot {
            url: &self.snapshot_url,
            archive_path: &archive_path,
            snapshots_dir: self.paths.snapshots_dir(),
            snapshot_dir: &snapshot_dir,
        };
        Ok(install_bootstrap_snapshot(&self.http, snapshot, force)?)
    }

    fn install_plugins(
        &self,
        plugin_dir: &Path,
        vm_ids: &[String],
    ) -> Result<Vec<PathBuf>, SessionError> {
        vm_ids
            .iter()
            .map(|vm_id| Ok(self.plugins.download(vm_id, plugin_dir)?))
            .collect()
    }
}
