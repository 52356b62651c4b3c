//! Writing single executables to disk.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::ProvisionError;

const EXECUTABLE_MODE: u32 = 0o755;

/// Writes `bytes` to `path` as an executable file.
///
/// # Errors
///
/// Returns the underlying IO failure together with `path`.
pub fn install_binary(bytes: &[u8], path: &Path) -> Result<(), ProvisionError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(EXECUTABLE_MODE);
    }
    let mut file = options
        .open(path)
        .map_err(|source| ProvisionError::io("create", path, source))?;
    file.write_all(bytes)
        .map_err(|source| ProvisionError::io("write", path, source))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // `mode` only applies on creation; an existing file keeps its bits.
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(EXECUTABLE_MODE))
            .map_err(|source| ProvisionError::io("set permissions on", path, source))?;
    }
    Ok(())
}
