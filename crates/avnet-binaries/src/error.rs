//! Error surface of binary provisioning.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while locating, fetching or installing binaries.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A filesystem operation on `path` failed.
    #[error("failed to {operation} {path:?}: {source}")]
    Io {
        /// Verb phrase naming the failed step.
        operation: &'static str,
        /// Path the operation touched.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A zip archive could not be read.
    #[error("failed to read zip archive: {source}")]
    Zip {
        /// Error reported by the zip reader.
        #[source]
        source: zip::result::ZipError,
    },
    /// An archive entry would be written outside the destination.
    #[error("archive entry '{entry}' resolves outside {destination:?}")]
    PathTraversal {
        /// Entry name as stored in the archive.
        entry: String,
        /// Directory the archive was being unpacked into.
        destination: PathBuf,
    },
    /// The HTTP request produced no usable response.
    #[error("request to {url} failed: {source}")]
    Http {
        /// Requested URL.
        url: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with something other than 200.
    #[error("request to {url} returned unexpected HTTP status {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code the server answered with.
        status: u16,
    },
    /// The download target exists and is not a regular file.
    #[error("binary path {path:?} was found but is not a regular file")]
    NotRegularFile {
        /// Path that is occupied.
        path: PathBuf,
    },
    /// The identifier cannot be used as a file name.
    #[error("identifier '{identifier}' is not a valid file name")]
    InvalidIdentifier {
        /// Rejected identifier.
        identifier: String,
    },
    /// The configured binary server URL does not parse.
    #[error("invalid download URL '{url}': {source}")]
    InvalidUrl {
        /// URL as configured.
        url: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },
    /// A download was needed but no binary server is configured.
    #[error("no binary distribution endpoint is configured; set --binary-server-url")]
    MissingServer,
    /// No release asset exists for this operating system and architecture.
    #[error("no release asset is published for {os}/{arch}")]
    UnsupportedPlatform {
        /// Operating system family.
        os: String,
        /// CPU architecture.
        arch: String,
    },
    /// The latest release tag is not `v<semver>`.
    #[error("release tag '{tag}' from {url} is not a semantic version: {source}")]
    ReleaseTag {
        /// Release API URL the tag came from.
        url: String,
        /// Tag as published.
        tag: String,
        /// Version parse failure.
        #[source]
        source: semver::Error,
    },
    /// The unpacked release lacks the expected install directory.
    #[error("release archive did not produce {path:?}")]
    MissingInstall {
        /// Directory that should exist after unpacking.
        path: PathBuf,
    },
}

impl ProvisionError {
    pub(crate) fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn http(url: &str, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.to_owned(),
            source,
        }
    }
}
