//! Archive installation for release bundles and snapshots.
//!
//! Zip archives are used by the macOS and Windows release bundles; everything
//! else ships as gzip-compressed tarballs. Both extractors refuse entries that
//! would land outside the destination directory.

use std::fs::{self, DirBuilder, File};
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::debug;

use crate::PROVISION_TARGET;
use crate::error::ProvisionError;

const DEFAULT_DIR_MODE: u32 = 0o755;

/// Archive formats understood by [`install_archive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Zip archive.
    Zip,
    /// Gzip-compressed tarball.
    TarGz,
}

impl ArchiveKind {
    /// Picks the release archive format for an operating system family.
    #[must_use]
    pub fn for_os(os: &str) -> Self {
        match os {
            "macos" | "darwin" | "windows" => Self::Zip,
            _ => Self::TarGz,
        }
    }
}

/// Extracts `archive` into `dest_dir`.
///
/// # Errors
///
/// Fails when an entry escapes `dest_dir`, when the archive is malformed, or
/// when writing an entry fails.
pub fn install_archive(
    kind: ArchiveKind,
    archive: &[u8],
    dest_dir: &Path,
) -> Result<(), ProvisionError> {
    debug!(
        target: PROVISION_TARGET,
        ?kind,
        destination = %dest_dir.display(),
        bytes = archive.len(),
        "installing archive"
    );
    match kind {
        ArchiveKind::Zip => install_zip(archive, dest_dir),
        ArchiveKind::TarGz => install_tar_gz(archive, dest_dir),
    }
}

/// Resolves `entry` below `dest_dir`, rejecting names that escape it.
///
/// # Errors
///
/// Returns [`ProvisionError::PathTraversal`] for absolute names and for names
/// whose `..` components climb above `dest_dir`.
pub fn sanitize_archive_path(dest_dir: &Path, entry: &str) -> Result<PathBuf, ProvisionError> {
    let traversal = || ProvisionError::PathTraversal {
        entry: entry.to_owned(),
        destination: dest_dir.to_path_buf(),
    };

    let mut relative = PathBuf::new();
    for component in Path::new(entry).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return Err(traversal());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(traversal()),
        }
    }
    Ok(dest_dir.join(relative))
}

fn install_zip(archive: &[u8], dest_dir: &Path) -> Result<(), ProvisionError> {
    let mut bundle = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|source| ProvisionError::Zip { source })?;

    for index in 0..bundle.len() {
        let mut entry = bundle
            .by_index(index)
            .map_err(|source| ProvisionError::Zip { source })?;
        let target = sanitize_archive_path(dest_dir, entry.name())?;
        let mode = entry.unix_mode();

        if entry.is_dir() {
            create_dir(&target, mode.unwrap_or(DEFAULT_DIR_MODE))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            create_dir(parent, DEFAULT_DIR_MODE)?;
        }
        // The handle is dropped at the end of each iteration so large
        // archives never hold more than one output descriptor.
        let mut output =
            File::create(&target).map_err(|source| ProvisionError::io("create", &target, source))?;
        io::copy(&mut entry, &mut output)
            .map_err(|source| ProvisionError::io("write", &target, source))?;
        if let Some(mode) = mode {
            set_mode(&target, mode)?;
        }
    }
    Ok(())
}

fn install_tar_gz(archive: &[u8], dest_dir: &Path) -> Result<(), ProvisionError> {
    let mut tarball = tar::Archive::new(GzDecoder::new(archive));
    let entries = tarball
        .entries()
        .map_err(|source| ProvisionError::io("read archive for", dest_dir, source))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|source| ProvisionError::io("read archive for", dest_dir, source))?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let target = sanitize_archive_path(dest_dir, &name)?;
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            if !target.exists() {
                create_dir(&target, DEFAULT_DIR_MODE)?;
            }
        } else if entry_type.is_file() {
            let mode = entry
                .header()
                .mode()
                .map_err(|source| ProvisionError::io("read mode of", &target, source))?;
            if let Some(parent) = target.parent() {
                create_dir(parent, DEFAULT_DIR_MODE)?;
            }
            let mut output = File::create(&target)
                .map_err(|source| ProvisionError::io("create", &target, source))?;
            io::copy(&mut entry, &mut output)
                .map_err(|source| ProvisionError::io("write", &target, source))?;
            set_mode(&target, mode)?;
        } else {
            debug!(
                target: PROVISION_TARGET,
                entry = %name,
                "skipping unsupported tar entry"
            );
        }
    }
    Ok(())
}

fn create_dir(path: &Path, mode: u32) -> Result<(), ProvisionError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode & 0o7777);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder
        .create(path)
        .map_err(|source| ProvisionError::io("create directory", path, source))
}

fn set_mode(path: &Path, mode: u32) -> Result<(), ProvisionError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
            .map_err(|source| ProvisionError::io("set permissions on", path, source))
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    type Tree = BTreeMap<PathBuf, Vec<u8>>;

    #[fixture]
    fn source_tree() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        let files: [(&str, Vec<u8>); 4] = [
            ("dir1/gzipTest", b"gzipTest contents".to_vec()),
            ("dir1/dir2/gzipTest2", b"nested contents".to_vec()),
            ("dir1/dir2/dir3/gzipTest3", b"deeply nested".to_vec()),
            (
                "binary",
                (0..4096_u32).map(|value| (value % 251) as u8).collect(),
            ),
        ];
        for (name, contents) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
            fs::write(&path, contents).expect("write source file");
        }
        dir
    }

    fn read_tree(root: &Path) -> Tree {
        fn walk(root: &Path, dir: &Path, tree: &mut Tree) {
            for entry in fs::read_dir(dir).expect("read dir") {
                let path = entry.expect("dir entry").path();
                if path.is_dir() {
                    walk(root, &path, tree);
                } else {
                    let relative = path.strip_prefix(root).expect("relative").to_path_buf();
                    tree.insert(relative, fs::read(&path).expect("read file"));
                }
            }
        }
        let mut tree = Tree::new();
        walk(root, root, &mut tree);
        tree
    }

    fn zip_tree(root: &Path) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().unix_permissions(0o644);
        for (relative, contents) in read_tree(root) {
            let name = relative.to_string_lossy().replace('\\', "/");
            writer.start_file(name, options).expect("start zip entry");
            writer.write_all(&contents).expect("write zip entry");
        }
        writer.finish().expect("finish zip").into_inner()
    }

    fn tar_gz_tree(root: &Path) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(".", root).expect("append tree");
        builder
            .into_inner()
            .expect("finish tar")
            .finish()
            .expect("finish gzip")
    }

    #[rstest]
    #[case(ArchiveKind::Zip)]
    #[case(ArchiveKind::TarGz)]
    fn installed_archive_reproduces_source_tree(
        source_tree: TempDir,
        #[case] kind: ArchiveKind,
    ) {
        let archive = match kind {
            ArchiveKind::Zip => zip_tree(source_tree.path()),
            ArchiveKind::TarGz => tar_gz_tree(source_tree.path()),
        };
        let destination = TempDir::new().expect("destination");
        install_archive(kind, &archive, destination.path()).expect("install archive");
        assert_eq!(read_tree(destination.path()), read_tree(source_tree.path()));
    }

    #[test]
    fn zip_entries_escaping_destination_are_rejected() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("../escaped.txt", SimpleFileOptions::default())
            .expect("start entry");
        writer.write_all(b"payload").expect("write entry");
        let archive = writer.finish().expect("finish zip").into_inner();

        let root = TempDir::new().expect("root");
        let destination = root.path().join("dest");
        fs::create_dir(&destination).expect("create destination");

        let error = install_archive(ArchiveKind::Zip, &archive, &destination)
            .expect_err("traversal must fail");
        assert!(matches!(error, ProvisionError::PathTraversal { .. }));
        assert!(!root.path().join("escaped.txt").exists());
    }

    #[rstest]
    #[case("a/b/../c", "a/c")]
    #[case("./build/avalanchego", "build/avalanchego")]
    #[case("dir/", "dir")]
    fn sanitize_keeps_contained_paths(#[case] entry: &str, #[case] expected: &str) {
        let dest = Path::new("/opt/dest");
        let resolved = sanitize_archive_path(dest, entry).expect("contained path");
        assert_eq!(resolved, dest.join(expected));
    }

    #[rstest]
    #[case("../outside")]
    #[case("a/../../outside")]
    #[case("/etc/passwd")]
    fn sanitize_rejects_escaping_paths(#[case] entry: &str) {
        let error = sanitize_archive_path(Path::new("/opt/dest"), entry)
            .expect_err("escaping path must fail");
        assert!(matches!(error, ProvisionError::PathTraversal { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn tar_entries_keep_their_mode() {
        use std::os::unix::fs::PermissionsExt;

        let mut header = tar::Header::new_gnu();
        header.set_size(4);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Regular);
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder
            .append_data(&mut header, "tool/run", &b"exec"[..])
            .expect("append entry");
        let archive = builder
            .into_inner()
            .expect("finish tar")
            .finish()
            .expect("finish gzip");

        let destination = TempDir::new().expect("destination");
        install_archive(ArchiveKind::TarGz, &archive, destination.path()).expect("install");
        let mode = fs::metadata(destination.path().join("tool/run"))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn tar_symlinks_are_skipped() {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_entry_type(tar::EntryType::Symlink);
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder
            .append_link(&mut header, "link", "/etc/passwd")
            .expect("append link");
        let archive = builder
            .into_inner()
            .expect("finish tar")
            .finish()
            .expect("finish gzip");

        let destination = TempDir::new().expect("destination");
        install_archive(ArchiveKind::TarGz, &archive, destination.path()).expect("install");
        assert!(!destination.path().join("link").exists());
    }

    #[test]
    fn corrupt_gzip_stream_is_an_error() {
        let destination = TempDir::new().expect("destination");
        let error = install_archive(ArchiveKind::TarGz, b"not gzip", destination.path())
            .expect_err("corrupt archive must fail");
        assert!(matches!(error, ProvisionError::Io { .. }));
    }

    #[test]
    fn selects_archive_kind_by_os() {
        assert_eq!(ArchiveKind::for_os("macos"), ArchiveKind::Zip);
        assert_eq!(ArchiveKind::for_os("windows"), ArchiveKind::Zip);
        assert_eq!(ArchiveKind::for_os("linux"), ArchiveKind::TarGz);
    }
}
