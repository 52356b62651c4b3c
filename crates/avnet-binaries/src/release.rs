//! Installation of published node releases.
//!
//! Release assets are fetched from GitHub. The installer first looks for an
//! existing `<prefix><version>` entry in the target directory, so repeated
//! starts with the same version never touch the network.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use semver::Version;
use serde::Deserialize;
use tracing::info;

use crate::PROVISION_TARGET;
use crate::archive::{ArchiveKind, install_archive};
use crate::checker::check_installed_with_version;
use crate::error::ProvisionError;
use crate::http::{fetch_bytes, fetch_json};

/// Default base for release asset downloads.
pub const GITHUB_DOWNLOAD_BASE: &str = "https://github.com";
/// Default base for the releases API.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

const ORGANISATION: &str = "ava-labs";
/// Directory name the macOS and Windows bundles unpack into.
const ZIP_BUILD_DIR: &str = "build";

/// Operating system and CPU architecture a release is selected for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    os: String,
    arch: String,
}

impl Platform {
    /// Describes an explicit platform using Rust's `std::env::consts` names.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this process runs on.
    #[must_use]
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    fn release_arch(&self) -> Result<&'static str, ProvisionError> {
        match self.arch.as_str() {
            "x86_64" => Ok("amd64"),
            "aarch64" => Ok("arm64"),
            _ => Err(self.unsupported()),
        }
    }

    fn unsupported(&self) -> ProvisionError {
        ProvisionError::UnsupportedPlatform {
            os: self.os.clone(),
            arch: self.arch.clone(),
        }
    }
}

/// Binaries published as GitHub releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseBinary {
    /// The node executable together with its plugin directory.
    AvalancheGo,
}

impl ReleaseBinary {
    /// Repository the binary is released from.
    #[must_use]
    pub const fn repository(self) -> &'static str {
        match self {
            Self::AvalancheGo => "avalanchego",
        }
    }

    /// Prefix of install directory names, followed by the version.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::AvalancheGo => "avalanchego-v",
        }
    }

    fn archive_kind(self, platform: &Platform) -> ArchiveKind {
        match self {
            Self::AvalancheGo => ArchiveKind::for_os(&platform.os),
        }
    }

    fn asset_name(self, version: &Version, platform: &Platform) -> Result<String, ProvisionError> {
        match (self, platform.os.as_str()) {
            (Self::AvalancheGo, "linux") => Ok(format!(
                "avalanchego-linux-{}-v{version}.tar.gz",
                platform.release_arch()?
            )),
            (Self::AvalancheGo, "macos") => Ok(format!("avalanchego-macos-v{version}.zip")),
            (Self::AvalancheGo, "windows") => {
                Ok(format!("avalanchego-win-v{version}-experimental.zip"))
            }
            _ => Err(platform.unsupported()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// Resolves and installs GitHub releases.
#[derive(Debug, Clone)]
pub struct ReleaseInstaller {
    client: Client,
    download_base: String,
    api_base: String,
    platform: Platform,
}

impl ReleaseInstaller {
    /// Creates an installer targeting GitHub for the current platform.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            download_base: GITHUB_DOWNLOAD_BASE.to_owned(),
            api_base: GITHUB_API_BASE.to_owned(),
            platform: Platform::current(),
        }
    }

    /// Points downloads and API lookups at other hosts.
    #[must_use]
    pub fn with_bases(mut self, download_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.download_base = download_base.into();
        self.api_base = api_base.into();
        self
    }

    /// Selects assets for `platform` instead of the current one.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Looks up the version of the latest published release.
    ///
    /// # Errors
    ///
    /// Fails when the API request fails or the tag is not `v<semver>`.
    pub fn latest_version(&self, binary: ReleaseBinary) -> Result<Version, ProvisionError> {
        let url = format!(
            "{}/repos/{ORGANISATION}/{}/releases/latest",
            self.api_base.trim_end_matches('/'),
            binary.repository()
        );
        let release: LatestRelease = fetch_json(self.client.get(&url), &url)?;
        let tag = release.tag_name;
        Version::parse(tag.trim_start_matches('v')).map_err(|source| ProvisionError::ReleaseTag {
            url,
            tag,
            source,
        })
    }

    /// Download URL of the release asset for this installer's platform.
    ///
    /// # Errors
    ///
    /// Fails when no asset is published for the platform.
    pub fn asset_url(
        &self,
        binary: ReleaseBinary,
        version: &Version,
    ) -> Result<String, ProvisionError> {
        let asset = binary.asset_name(version, &self.platform)?;
        Ok(format!(
            "{}/{ORGANISATION}/{}/releases/download/v{version}/{asset}",
            self.download_base.trim_end_matches('/'),
            binary.repository()
        ))
    }

    /// Ensures `<target_dir>/<prefix><version>` holds the release.
    ///
    /// Returns the install directory. Nothing is downloaded when it already
    /// exists.
    ///
    /// # Errors
    ///
    /// Fails when the asset cannot be fetched or unpacked, or when the
    /// unpacked archive does not produce the expected directory.
    pub fn install(
        &self,
        binary: ReleaseBinary,
        version: &Version,
        target_dir: &Path,
    ) -> Result<PathBuf, ProvisionError> {
        if let Some(installed) = check_installed_with_version(target_dir, binary.prefix(), version)? {
            return Ok(installed.path);
        }

        let install_dir = target_dir.join(format!("{}{version}", binary.prefix()));
        let url = self.asset_url(binary, version)?;
        info!(
            target: PROVISION_TARGET,
            binary = binary.repository(),
            %version,
            %url,
            "installing release"
        );
        let bytes = fetch_bytes(self.client.get(&url), &url)?;
        let kind = binary.archive_kind(&self.platform);

        create_dir_all(target_dir)?;
        install_archive(kind, &bytes, target_dir)?;
        if kind == ArchiveKind::Zip {
            let build_dir = target_dir.join(ZIP_BUILD_DIR);
            fs::rename(&build_dir, &install_dir)
                .map_err(|source| ProvisionError::io("rename", &build_dir, source))?;
        }

        if !install_dir.is_dir() {
            return Err(ProvisionError::MissingInstall { path: install_dir });
        }
        Ok(install_dir)
    }
}

fn create_dir_all(path: &Path) -> Result<(), ProvisionError> {
    fs::create_dir_all(path).map_err(|source| ProvisionError::io("create directory", path, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use rstest::rstest;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, name, *contents)
                .expect("append entry");
        }
        builder
            .into_inner()
            .expect("finish tar")
            .finish()
            .expect("finish gzip")
    }

    fn zip_bundle(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start entry");
            writer.write_all(contents).expect("write entry");
        }
        writer.finish().expect("finish zip").into_inner()
    }

    fn installer(server: &mockito::Server, platform: Platform) -> ReleaseInstaller {
        ReleaseInstaller::new(Client::new())
            .with_bases(server.url(), server.url())
            .with_platform(platform)
    }

    #[rstest]
    #[case(
        ReleaseBinary::AvalancheGo,
        Platform::new("linux", "x86_64"),
        "avalanchego-linux-amd64-v1.10.3.tar.gz"
    )]
    #[case(
        ReleaseBinary::AvalancheGo,
        Platform::new("linux", "aarch64"),
        "avalanchego-linux-arm64-v1.10.3.tar.gz"
    )]
    #[case(
        ReleaseBinary::AvalancheGo,
        Platform::new("macos", "aarch64"),
        "avalanchego-macos-v1.10.3.zip"
    )]
    #[case(
        ReleaseBinary::AvalancheGo,
        Platform::new("windows", "x86_64"),
        "avalanchego-win-v1.10.3-experimental.zip"
    )]
    fn asset_names_follow_release_conventions(
        #[case] binary: ReleaseBinary,
        #[case] platform: Platform,
        #[case] expected: &str,
    ) {
        let name = binary
            .asset_name(&Version::new(1, 10, 3), &platform)
            .expect("asset should exist");
        assert_eq!(name, expected);
    }

    #[rstest]
    #[case(Platform::new("linux", "riscv64"))]
    #[case(Platform::new("freebsd", "x86_64"))]
    fn unsupported_platforms_are_reported(#[case] platform: Platform) {
        let error = ReleaseBinary::AvalancheGo
            .asset_name(&Version::new(1, 0, 0), &platform)
            .expect_err("no asset is published");
        assert!(matches!(error, ProvisionError::UnsupportedPlatform { .. }));
    }

    #[test]
    fn latest_version_strips_the_tag_prefix() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/repos/ava-labs/avalanchego/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name":"v1.11.2","name":"Durango"}"#)
            .create();

        let version = installer(&server, Platform::new("linux", "x86_64"))
            .latest_version(ReleaseBinary::AvalancheGo)
            .expect("latest version");

        assert_eq!(version, Version::new(1, 11, 2));
        mock.assert();
    }

    #[test]
    fn malformed_release_tag_is_an_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/repos/ava-labs/avalanchego/releases/latest")
            .with_status(200)
            .with_body(r#"{"tag_name":"nightly"}"#)
            .create();

        let error = installer(&server, Platform::new("linux", "x86_64"))
            .latest_version(ReleaseBinary::AvalancheGo)
            .expect_err("tag is not semver");

        assert!(matches!(error, ProvisionError::ReleaseTag { .. }));
    }

    #[test]
    fn installs_linux_tarball_into_versioned_directory() {
        let mut server = mockito::Server::new();
        let body = tar_gz(&[
            ("avalanchego-v1.10.3/avalanchego", b"node"),
            ("avalanchego-v1.10.3/plugins/evm", b"plugin"),
        ]);
        let mock = server
            .mock(
                "GET",
                "/ava-labs/avalanchego/releases/download/v1.10.3/avalanchego-linux-amd64-v1.10.3.tar.gz",
            )
            .with_status(200)
            .with_body(body)
            .create();
        let bin = TempDir::new().expect("temp dir");
        let target = bin.path().join("avalanchego");

        let installed = installer(&server, Platform::new("linux", "x86_64"))
            .install(ReleaseBinary::AvalancheGo, &Version::new(1, 10, 3), &target)
            .expect("install release");

        assert_eq!(installed, target.join("avalanchego-v1.10.3"));
        assert_eq!(
            fs::read(installed.join("avalanchego")).expect("read node"),
            b"node"
        );
        assert!(installed.join("plugins").join("evm").is_file());
        mock.assert();
    }

    #[test]
    fn zip_bundle_build_directory_is_renamed() {
        let mut server = mockito::Server::new();
        let body = zip_bundle(&[("build/avalanchego", b"node"), ("build/plugins/evm", b"evm")]);
        let _mock = server
            .mock(
                "GET",
                "/ava-labs/avalanchego/releases/download/v1.10.3/avalanchego-macos-v1.10.3.zip",
            )
            .with_status(200)
            .with_body(body)
            .create();
        let bin = TempDir::new().expect("temp dir");

        let installed = installer(&server, Platform::new("macos", "aarch64"))
            .install(ReleaseBinary::AvalancheGo, &Version::new(1, 10, 3), bin.path())
            .expect("install release");

        assert_eq!(installed, bin.path().join("avalanchego-v1.10.3"));
        assert!(installed.join("avalanchego").is_file());
        assert!(!bin.path().join("build").exists());
    }

    #[test]
    fn existing_install_is_reused_without_downloading() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create();
        let bin = TempDir::new().expect("temp dir");
        fs::create_dir(bin.path().join("avalanchego-v1.10.3")).expect("seed install");

        let installed = installer(&server, Platform::new("linux", "x86_64"))
            .install(ReleaseBinary::AvalancheGo, &Version::new(1, 10, 3), bin.path())
            .expect("reuse install");

        assert_eq!(installed, bin.path().join("avalanchego-v1.10.3"));
        mock.assert();
    }

    #[test]
    fn archive_without_expected_directory_is_reported() {
        let mut server = mockito::Server::new();
        let body = tar_gz(&[("unexpected/avalanchego", b"node")]);
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create();
        let bin = TempDir::new().expect("temp dir");

        let error = installer(&server, Platform::new("linux", "x86_64"))
            .install(ReleaseBinary::AvalancheGo, &Version::new(1, 10, 3), bin.path())
            .expect_err("install directory is missing");

        assert!(matches!(error, ProvisionError::MissingInstall { .. }));
    }
}
