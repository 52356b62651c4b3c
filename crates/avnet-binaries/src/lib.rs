//! Provisioning of node binaries, VM plugins and snapshots.
//!
//! Everything here is synchronous and idempotent: each operation first checks
//! the file system and only downloads what is missing. Errors carry the path
//! or URL they concern and are never retried.

#![deny(missing_docs)]

mod archive;
mod checker;
mod download;
mod error;
mod http;
mod install;
mod release;
mod snapshot;

#[cfg(test)]
mod tests;

pub use archive::{ArchiveKind, install_archive, sanitize_archive_path};
pub use checker::{InstalledBinary, check_installed, check_installed_with_version};
pub use download::{BinaryDownloader, EVM_PLUGIN, prune_plugins};
pub use error::ProvisionError;
pub use http::build_client;
pub use install::install_binary;
pub use release::{GITHUB_API_BASE, GITHUB_DOWNLOAD_BASE, Platform, ReleaseBinary, ReleaseInstaller};
pub use snapshot::{BootstrapSnapshot, install_bootstrap_snapshot};

/// Tracing target for provisioning events.
pub(crate) const PROVISION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::provision");
