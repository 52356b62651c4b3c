//! Discovery of installed binaries by name prefix and version suffix.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use semver::Version;
use tracing::debug;

use crate::PROVISION_TARGET;
use crate::error::ProvisionError;

/// A binary found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinary {
    /// Path of the matching directory entry.
    pub path: PathBuf,
    /// Version parsed from the entry name, when it parses.
    pub version: Option<Version>,
}

/// Finds the latest installed entry named `<prefix><semver>` in `bin_dir`.
///
/// A single match is returned even when its suffix does not parse. With
/// several matches, unparseable suffixes are skipped and the highest version
/// wins; when none of them parses the binary counts as not installed.
///
/// # Errors
///
/// Returns an error when `bin_dir` exists but cannot be listed.
pub fn check_installed(
    bin_dir: &Path,
    prefix: &str,
) -> Result<Option<InstalledBinary>, ProvisionError> {
    let mut matches = matching_entries(bin_dir, |name| name.starts_with(prefix))?;
    if matches.len() <= 1 {
        return Ok(matches.pop().map(|(name, path)| InstalledBinary {
            version: parse_suffix(&name, prefix),
            path,
        }));
    }

    let latest = matches
        .into_iter()
        .filter_map(|(name, path)| {
            let version = parse_suffix(&name, prefix);
            if version.is_none() {
                debug!(
                    target: PROVISION_TARGET,
                    entry = %name,
                    "ignoring entry with unparseable version"
                );
            }
            version.map(|version| (version, path))
        })
        .max_by(|(left, _), (right, _)| left.cmp(right));

    Ok(latest.map(|(version, path)| InstalledBinary {
        path,
        version: Some(version),
    }))
}

/// Finds the entry named exactly `<prefix><version>` in `bin_dir`.
///
/// # Errors
///
/// Returns an error when `bin_dir` exists but cannot be listed.
pub fn check_installed_with_version(
    bin_dir: &Path,
    prefix: &str,
    version: &Version,
) -> Result<Option<InstalledBinary>, ProvisionError> {
    let wanted = format!("{prefix}{version}");
    let mut matches = matching_entries(bin_dir, |name| name == wanted)?;
    Ok(matches.pop().map(|(_, path)| InstalledBinary {
        path,
        version: Some(version.clone()),
    }))
}

fn parse_suffix(name: &str, prefix: &str) -> Option<Version> {
    name.strip_prefix(prefix)
        .and_then(|suffix| Version::parse(suffix).ok())
}

fn matching_entries(
    bin_dir: &Path,
    accept: impl Fn(&str) -> bool,
) -> Result<Vec<(String, PathBuf)>, ProvisionError> {
    let entries = match fs::read_dir(bin_dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(ProvisionError::io("list", bin_dir, source)),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ProvisionError::io("list", bin_dir, source))?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if accept(&name) {
            matches.push((name, entry.path()));
        }
    }
    matches.sort();
    Ok(matches)
}
