//! tar.gz extraction.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::{debug, warn};

use super::{
    Destination, DirectoryModes, ExtractorListener, ExtractorProvider, create_parent,
    create_symlink, remove_symlink, set_mode,
};
use crate::errors::ExtractError;

/// Extracts gzip-compressed tarballs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzExtractorProvider;

impl ExtractorProvider for TarGzExtractorProvider {
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
        let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));

        let entries = tar.entries().map_err(|e| {
            ExtractError::archive(format!("Failed to read tar entries: {}", archive.display()), e)
        })?;
        let mut directories = DirectoryModes::default();
        let mut count = 0usize;
        for entry in entries {
            let mut entry = entry.map_err(|e| {
                ExtractError::archive(format!("Failed to read tar entry: {}", archive.display()), e)
            })?;
            let entry_path = entry
                .path()
                .map_err(|e| ExtractError::archive("Failed to get entry path", e))?
                .into_owned();
            let output = destination.resolve(&entry_path)?;
            let header = entry.header();
            let entry_type = header.entry_type();
            let mode = header.mode().ok();

            match entry_type {
                EntryType::Directory => {
                    directories.create(&output, mode)?;
                    listener.on_message(&format!("Created directory: {}", output.display()));
                }
                EntryType::Regular | EntryType::Continuous => {
                    create_parent(&output)?;
                    remove_symlink(&output)?;
                    let mut out = File::create(&output).map_err(|e| {
                        ExtractError::io(format!("Failed to create file: {}", output.display()), e)
                    })?;
                    std::io::copy(&mut entry, &mut out).map_err(|e| {
                        ExtractError::io(format!("Failed to extract: {}", output.display()), e)
                    })?;
                    drop(out);
                    if let Some(mode) = mode {
                        set_mode(&output, mode)?;
                    }
                    listener.on_message(&format!("Extracting: {}", output.display()));
                }
                EntryType::Symlink => {
                    let target = entry
                        .link_name()
                        .map_err(|e| ExtractError::archive("Failed to get link target", e))?
                        .ok_or_else(|| {
                            ExtractError::archive(
                                format!("Symlink without target: {}", entry_path.display()),
                                "missing link name",
                            )
                        })?
                        .into_owned();
                    create_symlink(&output, &target)?;
                    listener.on_message(&format!(
                        "Linked: {} -> {}",
                        output.display(),
                        target.display()
                    ));
                }
                other => {
                    warn!(
                        entry = %entry_path.display(),
                        kind = ?other,
                        "skipping unsupported tar entry"
                    );
                    listener.on_message(&format!("Skipped: {}", output.display()));
                }
            }
            count += 1;
        }
        directories.apply()?;

        debug!(archive = %archive.display(), entries = count, "extracted tar.gz archive");
        Ok(())
    }
}
