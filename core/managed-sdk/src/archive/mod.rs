//! Archive extraction for SDK releases.
//!
//! SDK releases are published as tar.gz (Linux, macOS) or ZIP (Windows)
//! archives. Both extractors share the same contract:
//!
//! - entries are materialised in archive order, one listener message each
//! - no entry may land outside the destination, including through a symlink
//!   created by an earlier entry
//! - permission bits stored in the archive are restored on Unix; directory
//!   modes are applied once every entry is written, so read-only directories
//!   can still be filled
//! - symlinks are recreated verbatim and replace whatever is at their path
//! - a directory entry replaces a symlink at its path and never writes
//!   through it
//! - the first failure aborts; entries already written stay on disk and
//!   directories keep owner write access

mod tar_gz;
mod zip_archive;

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::errors::ExtractError;

pub use tar_gz::TarGzExtractorProvider;
pub use zip_archive::ZipExtractorProvider;

/// Receives one human-readable message per extracted entry.
pub trait ExtractorListener: Send + Sync {
    /// Called after an entry has been materialised (or skipped).
    fn on_message(&self, message: &str);
}

impl<F> ExtractorListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_message(&self, message: &str) {
        self(message);
    }
}

/// Unpacks one archive format into a destination directory.
pub trait ExtractorProvider: Send + Sync {
    /// Extracts `archive` into `destination`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::PathTraversal`] for an entry resolving outside
    /// `destination`, [`ExtractError::Archive`] for corrupt archives and
    /// [`ExtractError::Io`] for filesystem failures.
    fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        listener: &dyn ExtractorListener,
    ) -> Result<(), ExtractError>;
}

/// Archive formats SDK releases are published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// Gzip-compressed tarball.
    TarGz,
    /// ZIP archive.
    Zip,
}

impl ArchiveKind {
    /// Detects the format from the file extension (`.tar.gz`, `.tgz`, `.zip`).
    #[must_use = "returns the archive kind without side effects"]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// File extension used in release file names.
    #[must_use = "returns the extension without side effects"]
    pub fn extension(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }

    /// Returns the extractor for this format.
    #[must_use]
    pub fn provider(self) -> Box<dyn ExtractorProvider> {
        match self {
            Self::TarGz => Box::new(TarGzExtractorProvider),
            Self::Zip => Box::new(ZipExtractorProvider),
        }
    }
}

/// Extracts `archive` into `destination`, picking the extractor from the
/// file extension.
///
/// # Errors
///
/// Returns [`ExtractError::UnsupportedArchive`] for unknown extensions, and
/// any error of the selected [`ExtractorProvider`].
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use managed_sdk::archive::extract_archive;
///
/// extract_archive(
///     Path::new("google-cloud-sdk.tar.gz"),
///     Path::new("/tmp/sdk"),
///     &|message: &str| println!("{message}"),
/// )?;
/// # Ok::<(), managed_sdk::ExtractError>(())
/// ```
pub fn extract_archive(
    archive: &Path,
    destination: &Path,
    listener: &dyn ExtractorListener,
) -> Result<(), ExtractError> {
    let kind = ArchiveKind::from_path(archive).ok_or_else(|| ExtractError::UnsupportedArchive {
        path: archive.to_path_buf(),
    })?;
    kind.provider().extract(archive, destination, listener)
}

/// Destination directory of one extraction, with its canonical form used to
/// detect escapes through symlinks.
pub(crate) struct Destination {
    root: PathBuf,
    canonical: PathBuf,
}

impl Destination {
    /// Creates the destination directory and remembers its canonical path.
    pub(crate) fn prepare(root: &Path) -> Result<Self, ExtractError> {
        create_dir(root)?;
        let canonical = root.canonicalize().map_err(|e| {
            ExtractError::io(format!("Failed to resolve directory: {}", root.display()), e)
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            canonical,
        })
    }

    /// Maps an entry path to its output path.
    ///
    /// The entry is normalised lexically. Absolute paths, drive prefixes and
    /// `..` climbing above the root are rejected, as is any already existing
    /// ancestor that resolves outside the destination.
    pub(crate) fn resolve(&self, entry: &Path) -> Result<PathBuf, ExtractError> {
        let traversal = || ExtractError::path_traversal(entry, &self.root);

        let mut relative = PathBuf::new();
        for component in entry.components() {
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

        let output = self.root.join(&relative);
        let mut ancestor = output.parent();
        while let Some(dir) = ancestor {
            if dir.symlink_metadata().is_ok() {
                let resolved = dir.canonicalize().map_err(|_| traversal())?;
                if !resolved.starts_with(&self.canonical) {
                    return Err(traversal());
                }
                break;
            }
            ancestor = dir.parent();
        }
        Ok(output)
    }
}

pub(crate) fn create_dir(path: &Path) -> Result<(), ExtractError> {
    fs::create_dir_all(path)
        .map_err(|e| ExtractError::io(format!("Failed to create directory: {}", path.display()), e))
}

pub(crate) fn create_parent(path: &Path) -> Result<(), ExtractError> {
    match path.parent() {
        Some(parent) => create_dir(parent),
        None => Ok(()),
    }
}

/// Removes a symlink sitting at `path` so that writing there never follows it.
pub(crate) fn remove_symlink(path: &Path) -> Result<(), ExtractError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(path)
            .map_err(|e| ExtractError::io(format!("Failed to replace: {}", path.display()), e)),
        _ => Ok(()),
    }
}

/// Creates `link` pointing at `target`, replacing an existing file or link.
pub(crate) fn create_symlink(link: &Path, target: &Path) -> Result<(), ExtractError> {
    create_parent(link)?;
    if let Ok(meta) = fs::symlink_metadata(link) {
        let removed = if meta.is_dir() {
            fs::remove_dir_all(link)
        } else {
            fs::remove_file(link)
        };
        removed.map_err(|e| ExtractError::io(format!("Failed to replace: {}", link.display()), e))?;
    }

    #[cfg(unix)]
    let created = std::os::unix::fs::symlink(target, link);
    #[cfg(windows)]
    let created = std::os::windows::fs::symlink_file(target, link);

    created.map_err(|e| {
        ExtractError::io(format!("Failed to create symlink: {}", link.display()), e)
    })
}

/// Returns `true` if `path` itself is a symlink.
#[cfg(unix)]
fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
}

/// Applies permission bits on Unix. A symlink at `path` is left untouched,
/// since `chmod` would follow it.
#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, mode: u32) -> Result<(), ExtractError> {
    use std::os::unix::fs::PermissionsExt;

    if is_symlink(path) {
        return Ok(());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
        .map_err(|e| ExtractError::io(format!("Failed to set permissions: {}", path.display()), e))
}

/// Permission bits are not applied outside Unix.
#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn set_mode(_path: &Path, _mode: u32) -> Result<(), ExtractError> {
    Ok(())
}

/// Mode of a directory while extraction is in progress.
pub(crate) fn directory_mode(mode: u32) -> u32 {
    mode | 0o700
}

/// Directory entries of one extraction and their archived modes.
#[derive(Debug, Default)]
pub(crate) struct DirectoryModes {
    pending: Vec<(PathBuf, u32)>,
}

impl DirectoryModes {
    /// Materialises a directory entry with owner access, remembering `mode`
    /// for [`DirectoryModes::apply`].
    ///
    /// A symlink already at `path` is removed first, so neither the
    /// directory nor its permissions end up wherever the link points.
    pub(crate) fn create(&mut self, path: &Path, mode: Option<u32>) -> Result<(), ExtractError> {
        remove_symlink(path)?;
        create_dir(path)?;
        if let Some(mode) = mode {
            set_mode(path, directory_mode(mode))?;
            self.pending.push((path.to_path_buf(), mode));
        }
        Ok(())
    }

    /// Applies the archived modes, deepest directories first. Directories
    /// replaced by a later entry are skipped.
    pub(crate) fn apply(mut self) -> Result<(), ExtractError> {
        self.pending
            .sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
        for (path, mode) in self.pending {
            if fs::symlink_metadata(&path).is_ok_and(|meta| meta.is_dir()) {
                set_mode(&path, mode)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_kind_detected_from_extension() {
        assert_eq!(
            ArchiveKind::from_path(Path::new("google-cloud-sdk.tar.gz")),
            Some(ArchiveKind::TarGz)
        );
        assert_eq!(
            ArchiveKind::from_path(Path::new("/tmp/sdk.TGZ")),
            Some(ArchiveKind::TarGz)
        );
        assert_eq!(
            ArchiveKind::from_path(Path::new("google-cloud-sdk.zip")),
            Some(ArchiveKind::Zip)
        );
        assert_eq!(ArchiveKind::from_path(Path::new("sdk.tar.bz2")), None);
        assert_eq!(ArchiveKind::from_path(Path::new("/")), None);
    }

    #[test]
    fn extract_archive_rejects_unknown_extension() {
        let temp = assert_fs::TempDir::new().unwrap();
        let err = extract_archive(
            &temp.path().join("sdk.rar"),
            &temp.path().join("out"),
            &|_: &str| {},
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedArchive { .. }));
    }

    #[test]
    fn resolve_accepts_nested_and_normalised_paths() {
        let temp = assert_fs::TempDir::new().unwrap();
        let destination = Destination::prepare(temp.path()).unwrap();

        assert_eq!(
            destination.resolve(Path::new("sdk/bin/gcloud")).unwrap(),
            temp.path().join("sdk/bin/gcloud")
        );
        assert_eq!(
            destination.resolve(Path::new("./sdk/lib/../bin/gcloud")).unwrap(),
            temp.path().join("sdk/bin/gcloud")
        );
    }

    #[test]
    fn resolve_rejects_escaping_paths() {
        let temp = assert_fs::TempDir::new().unwrap();
        let destination = Destination::prepare(&temp.path().join("dest")).unwrap();

        for entry in ["../evil", "sdk/../../evil", "/etc/passwd"] {
            let err = destination.resolve(Path::new(entry)).unwrap_err();
            assert!(
                matches!(err, ExtractError::PathTraversal { .. }),
                "{entry} should be rejected"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn resolve_rejects_paths_through_escaping_symlink() {
        let temp = assert_fs::TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        let dest = temp.path().join("dest");
        let destination = Destination::prepare(&dest).unwrap();
        std::os::unix::fs::symlink(&outside, dest.join("link")).unwrap();

        let err = destination.resolve(Path::new("link/file")).unwrap_err();
        assert!(matches!(err, ExtractError::PathTraversal { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn create_symlink_replaces_existing_entry() {
        let temp = assert_fs::TempDir::new().unwrap();
        let link = temp.path().join("link");
        fs::write(&link, "plain file").unwrap();

        create_symlink(&link, Path::new("target-a")).unwrap();
        create_symlink(&link, Path::new("target-b")).unwrap();

        assert_eq!(fs::read_link(&link).unwrap(), Path::new("target-b"));
    }

    #[test]
    fn directory_mode_keeps_owner_access() {
        assert_eq!(directory_mode(0o555), 0o755);
        assert_eq!(directory_mode(0o750), 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn directory_entry_replaces_symlink_without_touching_target() {
        use std::os::unix::fs::PermissionsExt;

        let temp = assert_fs::TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::set_permissions(&outside, fs::Permissions::from_mode(0o700)).unwrap();
        let link = temp.path().join("d");
        std::os::unix::fs::symlink(&outside, &link).unwrap();

        let mut modes = DirectoryModes::default();
        modes.create(&link, Some(0o777)).unwrap();
        modes.apply().unwrap();

        let meta = fs::symlink_metadata(&link).unwrap();
        assert!(meta.is_dir());
        assert_eq!(meta.permissions().mode() & 0o777, 0o777);
        let outside_mode = fs::metadata(&outside).unwrap().permissions().mode() & 0o777;
        assert_eq!(outside_mode, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn archived_directory_modes_are_applied_last() {
        use std::os::unix::fs::PermissionsExt;

        let temp = assert_fs::TempDir::new().unwrap();
        let parent = temp.path().join("ro");
        let child = parent.join("nested");

        let mut modes = DirectoryModes::default();
        modes.create(&parent, Some(0o555)).unwrap();
        modes.create(&child, Some(0o500)).unwrap();
        fs::write(child.join("file"), "written after the directory").unwrap();
        modes.apply().unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&parent), 0o555);
        assert_eq!(mode(&child), 0o500);

        fs::set_permissions(&child, fs::Permissions::from_mode(0o755)).unwrap();
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn set_mode_does_not_follow_symlinks() {
        use std::os::unix::fs::PermissionsExt;

        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, "data").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o600)).unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        set_mode(&link, 0o777).unwrap();

        assert_eq!(fs::metadata(&target).unwrap().permissions().mode() & 0o777, 0o600);
    }
}
