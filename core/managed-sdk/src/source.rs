//! Where install archives come from.
//!
//! Fetching releases over the network is left to the caller. A transport
//! implements [`ArchiveSource`] (typically on top of [`download_url`]) and
//! hands the byte stream to [`ManagedSdk::install`](crate::ManagedSdk::install).

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::io::AsyncRead;

use crate::archive::ArchiveKind;
use crate::errors::{ExtractError, SdkError};
use crate::platform::OsProfile;
use crate::version::Version;

/// Base URL of the release channel.
const RELEASE_CHANNEL_URL: &str = "https://dl.google.com/dl/cloudsdk/channels/rapid";

/// Boxed byte stream of an archive.
pub type ArchiveStream = Box<dyn AsyncRead + Send + Unpin>;

/// Supplies the bytes of an SDK release archive.
pub trait ArchiveSource: Send + Sync {
    /// File name used when staging the archive, e.g. `google-cloud-sdk.tar.gz`.
    fn file_name(&self) -> &str;

    /// Format of the archive.
    fn kind(&self) -> ArchiveKind;

    /// Opens the archive for reading.
    fn open(&self) -> impl Future<Output = Result<ArchiveStream, SdkError>> + Send;
}

/// An archive already present on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileArchiveSource {
    path: PathBuf,
    file_name: String,
    kind: ArchiveKind,
}

impl FileArchiveSource {
    /// Wraps the archive at `path`, detecting its format from the extension.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Extract`] with [`ExtractError::UnsupportedArchive`]
    /// if the extension is not a known archive format.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SdkError> {
        let path = path.into();
        let unsupported = || ExtractError::UnsupportedArchive { path: path.clone() };
        let kind = ArchiveKind::from_path(&path).ok_or_else(unsupported)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(unsupported)?
            .to_string();
        Ok(Self {
            path,
            file_name,
            kind,
        })
    }

    /// Path of the archive.
    #[must_use = "returns the path without side effects"]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArchiveSource for FileArchiveSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn kind(&self) -> ArchiveKind {
        self.kind
    }

    async fn open(&self) -> Result<ArchiveStream, SdkError> {
        let file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            SdkError::io(format!("Failed to open archive: {}", self.path.display()), e)
        })?;
        Ok(Box::new(file))
    }
}

/// Returns the canonical download URL of `version` for `os`.
///
/// # Examples
///
/// ```
/// use managed_sdk::{Architecture, OsFamily, OsProfile, Version, download_url};
///
/// let os = OsProfile::new(OsFamily::MacOs, Architecture::X86_64);
/// assert_eq!(
///     download_url(&Version::fixed("191.0.0")?, os),
///     "https://dl.google.com/dl/cloudsdk/channels/rapid/downloads/google-cloud-sdk-191.0.0-darwin-x86_64.tar.gz"
/// );
/// # Ok::<(), managed_sdk::SdkError>(())
/// ```
#[must_use = "returns the URL without side effects"]
pub fn download_url(version: &Version, os: OsProfile) -> String {
    let extension = os.archive_kind().extension();
    match version {
        Version::Latest => format!("{RELEASE_CHANNEL_URL}/google-cloud-sdk.{extension}"),
        Version::Fixed(version) => format!(
            "{RELEASE_CHANNEL_URL}/downloads/google-cloud-sdk-{version}-{os}.{extension}"
        ),
    }
}
