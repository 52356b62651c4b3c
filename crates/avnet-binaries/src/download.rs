//! Plugin binaries fetched by VM identifier.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use tracing::{debug, info};
use url::Url;

use crate::PROVISION_TARGET;
use crate::error::ProvisionError;
use crate::http::fetch_bytes;
use crate::install::install_binary;

/// Plugin name that is never pruned.
pub const EVM_PLUGIN: &str = "evm";

const IDENTIFIER_QUERY: &str = "vmid";

/// Downloads plugin binaries from a distribution endpoint.
#[derive(Debug, Clone)]
pub struct BinaryDownloader {
    client: Client,
    server_url: Option<String>,
}

impl BinaryDownloader {
    /// Creates a downloader for the endpoint at `server_url`.
    ///
    /// Without an endpoint only already-present binaries can be satisfied.
    #[must_use]
    pub const fn new(client: Client, server_url: Option<String>) -> Self {
        Self { client, server_url }
    }

    /// Ensures `<destination_dir>/<identifier>` holds the binary.
    ///
    /// An existing regular file is left untouched and no request is made.
    ///
    /// # Errors
    ///
    /// Fails when the target exists but is not a regular file, when it cannot
    /// be inspected, when no endpoint is configured, or when the endpoint does
    /// not answer with HTTP 200.
    pub fn download(
        &self,
        identifier: &str,
        destination_dir: &Path,
    ) -> Result<PathBuf, ProvisionError> {
        if identifier.is_empty() || identifier.contains(['/', '\\']) || identifier == ".." {
            return Err(ProvisionError::InvalidIdentifier {
                identifier: identifier.to_owned(),
            });
        }
        let binary_path = destination_dir.join(identifier);

        match fs::metadata(&binary_path) {
            Ok(metadata) if metadata.is_file() => {
                debug!(
                    target: PROVISION_TARGET,
                    path = %binary_path.display(),
                    "binary already exists, skipping download"
                );
                return Ok(binary_path);
            }
            Ok(_) => return Err(ProvisionError::NotRegularFile { path: binary_path }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(ProvisionError::io("inspect", &binary_path, source)),
        }

        let server_url = self.server_url.as_deref().ok_or(ProvisionError::MissingServer)?;
        let mut url = Url::parse(server_url).map_err(|source| ProvisionError::InvalidUrl {
            url: server_url.to_owned(),
            source,
        })?;
        url.query_pairs_mut()
            .append_pair(IDENTIFIER_QUERY, identifier);
        let bytes = fetch_bytes(self.client.get(url.as_str()), url.as_str())?;
        install_binary(&bytes, &binary_path)?;
        info!(
            target: PROVISION_TARGET,
            identifier,
            path = %binary_path.display(),
            "installed plugin binary"
        );
        Ok(binary_path)
    }
}

/// Removes every plugin in `plugin_dir` except `keep` and [`EVM_PLUGIN`].
///
/// Returns the removed paths. A missing directory has nothing to prune.
///
/// # Errors
///
/// Returns the first listing or removal failure.
pub fn prune_plugins(plugin_dir: &Path, keep: &[&str]) -> Result<Vec<PathBuf>, ProvisionError> {
    let entries = match fs::read_dir(plugin_dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(ProvisionError::io("list", plugin_dir, source)),
    };

    let mut removed = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ProvisionError::io("list", plugin_dir, source))?;
        let name = entry.file_name();
        let keep_entry = name
            .to_str()
            .is_some_and(|name| name == EVM_PLUGIN || keep.contains(&name));
        if keep_entry {
            continue;
        }
        let path = entry.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|source| ProvisionError::io("remove", &path, source))?;
        removed.push(path);
    }
    removed.sort();
    Ok(removed)
}
