//! ZIP extraction.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{
    Destination, DirectoryModes, ExtractorListener, ExtractorProvider, create_parent,
    create_symlink, remove_symlink, set_mode,
};
use crate::errors::ExtractError;

/// Mode of file entries written without Unix metadata.
const DEFAULT_FILE_MODE: u32 = 0o644;
/// Mode of directory entries written without Unix metadata.
const DEFAULT_DIR_MODE: u32 = 0o755;

/// Extracts ZIP archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractorProvider;

impl ExtractorProvider for ZipExtractorProvider {
    fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        listener: &dyn ExtractorListener,
    ) -> Result<(), ExtractError> {
        let destination = Destination::prepare(destination)?;
        let file = File::open(archive).map_err(|e| {
            ExtractError::io(format!("Failed to open archive: {}", archive.display()), e)
        })?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| {
            ExtractError::archive(format!("Failed to read ZIP archive: {}", archive.display()), e)
        })?;

        let mut directories = DirectoryModes::default();
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(|e| {
                ExtractError::archive(format!("Failed to read archive entry {i}"), e)
            })?;
            // Archivers on Windows sometimes store backslash separators.
            let entry_path = PathBuf::from(entry.name().replace('\\', "/"));
            let output = destination.resolve(&entry_path)?;
            let is_dir = entry.is_dir();
            let mode = entry_mode(entry.unix_mode(), is_dir);

            if is_dir {
                directories.create(&output, Some(mode))?;
                listener.on_message(&format!("Created directory: {}", output.display()));
            } else if entry.is_symlink() {
                let mut target = String::new();
                entry.read_to_string(&mut target).map_err(|e| {
                    let message = format!("Failed to read link target: {}", entry_path.display());
                    ExtractError::io(message, e)
                })?;
                create_symlink(&output, Path::new(&target))?;
                listener.on_message(&format!("Linked: {} -> {target}", output.display()));
            } else {
                create_parent(&output)?;
                remove_symlink(&output)?;
                let mut out = File::create(&output).map_err(|e| {
                    ExtractError::io(format!("Failed to create file: {}", output.display()), e)
                })?;
                std::io::copy(&mut entry, &mut out).map_err(|e| {
                    ExtractError::io(format!("Failed to extract: {}", output.display()), e)
                })?;
                drop(out);
                set_mode(&output, mode)?;
                listener.on_message(&format!("Extracting: {}", output.display()));
            }
        }
        directories.apply()?;

        debug!(archive = %archive.display(), entries = zip.len(), "extracted zip archive");
        Ok(())
    }
}

/// Permission bits of an entry, defaulting when the archive has none.
fn entry_mode(unix_mode: Option<u32>, is_dir: bool) -> u32 {
    match unix_mode {
        Some(mode) if mode & 0o7777 != 0 => mode & 0o7777,
        _ if is_dir => DEFAULT_DIR_MODE,
        _ => DEFAULT_FILE_MODE,
    }
}
