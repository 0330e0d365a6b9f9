//! Error types for managed SDK operations.
//!
//! [`ExtractError`] is produced by the archive extractors, [`SdkError`] by
//! everything above them. Expected negative answers ("not installed") are
//! never errors; ambiguous or inconsistent on-disk state always is.

use std::path::PathBuf;

use managed_sdk_process::{CommandError, ProcessError};
use thiserror::Error;

/// Failure while unpacking an archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// An entry would be written outside the extraction destination.
    ///
    /// The whole extraction is aborted when this is detected.
    #[error(
        "archive entry '{}' escapes extraction destination {}",
        entry.display(),
        destination.display()
    )]
    PathTraversal {
        /// The offending entry path as stored in the archive.
        entry: PathBuf,
        /// The extraction destination.
        destination: PathBuf,
    },

    /// Reading the archive or writing to the filesystem failed.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The archive is corrupt or could not be decoded.
    #[error("invalid archive: {message}")]
    Archive {
        /// Description of the decoding failure.
        message: String,
        /// The underlying decoder error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No extractor exists for this archive format.
    #[error("unsupported archive format: {}", path.display())]
    UnsupportedArchive {
        /// Path of the archive.
        path: PathBuf,
    },
}

impl ExtractError {
    /// Creates a new `PathTraversal` error.
    #[must_use]
    pub fn path_traversal(entry: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::PathTraversal {
            entry: entry.into(),
            destination: destination.into(),
        }
    }

    /// Creates a new `Io` error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Creates a new `Archive` error.
    #[must_use]
    pub fn archive(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Archive {
            message: message.into(),
            source: source.into(),
        }
    }
}

/// Consolidated error type for managed SDK operations.
#[derive(Debug, Error)]
pub enum SdkError {
    /// The current operating system or architecture is not supported.
    #[error("unsupported platform: {os} on {arch}")]
    UnsupportedOs {
        /// Operating system name.
        os: String,
        /// Architecture name.
        arch: String,
    },

    /// The managed SDK location could not be determined.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// A fixed version string cannot be used.
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion {
        /// The rejected version string.
        version: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The installed state could not be determined.
    #[error("verification failed: {message}")]
    Verification {
        /// Description of what could not be verified.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A fixed version install holds a different version than requested.
    #[error("installed SDK version {found} does not match expected version {expected}")]
    VersionMismatch {
        /// The requested version.
        expected: String,
        /// The version recorded on disk.
        found: String,
    },

    /// Another operation holds the install lock.
    #[error(
        "install lock {} is held{}",
        lock.display(),
        owner.as_ref().map(|o| format!(" by {o}")).unwrap_or_default()
    )]
    LockContention {
        /// Path of the lock file.
        lock: PathBuf,
        /// Description of the live owner, if it could be read.
        owner: Option<String>,
    },

    /// The operation is not valid for this managed SDK.
    #[error("unsupported operation: {message}")]
    UnsupportedOperation {
        /// Why the operation was rejected.
        message: String,
    },

    /// The operation was cancelled before it completed.
    #[error("operation was cancelled")]
    Cancelled,

    /// Running an SDK command failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Extracting the SDK archive failed.
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// A filesystem operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl SdkError {
    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidVersion` error.
    #[must_use]
    pub fn invalid_version(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `Verification` error without a source.
    #[must_use]
    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `Verification` error with a source error.
    #[must_use]
    pub fn verification_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Verification {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a new `VersionMismatch` error.
    #[must_use]
    pub fn version_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::VersionMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates a new `UnsupportedOperation` error.
    #[must_use]
    pub fn unsupported_operation(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
        }
    }

    /// Creates a new `Io` error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Returns `true` if the operation was aborted by cancellation or a
    /// timeout, in which case it is safe to retry.
    #[must_use = "returns classification without side effects"]
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Command(CommandError::Execution(err)) => err.is_interrupted(),
            _ => false,
        }
    }
}

impl From<ProcessError> for SdkError {
    fn from(err: ProcessError) -> Self {
        Self::Command(CommandError::Execution(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn path_traversal_displays_entry_and_destination() {
        let err = ExtractError::path_traversal("../evil", "/tmp/dest");
        assert_eq!(
            err.to_string(),
            "archive entry '../evil' escapes extraction destination /tmp/dest"
        );
    }

    #[test]
    fn version_mismatch_displays_both_versions() {
        let err = SdkError::version_mismatch("99.0.0", "100.0.0");
        assert_eq!(
            err.to_string(),
            "installed SDK version 100.0.0 does not match expected version 99.0.0"
        );
    }

    #[test]
    fn lock_contention_mentions_owner_when_known() {
        let err = SdkError::LockContention {
            lock: PathBuf::from("/sdk/LATEST/.install.lock"),
            owner: Some("pid 42".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "install lock /sdk/LATEST/.install.lock is held by pid 42"
        );

        let err = SdkError::LockContention {
            lock: PathBuf::from("/sdk/LATEST/.install.lock"),
            owner: None,
        };
        assert_eq!(err.to_string(), "install lock /sdk/LATEST/.install.lock is held");
    }

    #[test]
    fn command_errors_display_transparently() {
        let err = SdkError::from(CommandError::non_zero_exit(1, "boom"));
        assert_eq!(err.to_string(), "process exited with non-zero exit code: 1");
    }

    #[test]
    fn interruption_is_detected_through_layers() {
        assert!(SdkError::Cancelled.is_interrupted());
        assert!(SdkError::from(ProcessError::Cancelled).is_interrupted());
        assert!(
            SdkError::from(ProcessError::TimedOut {
                timeout: Duration::from_secs(1)
            })
            .is_interrupted()
        );
        assert!(!SdkError::verification("unreadable VERSION").is_interrupted());
        assert!(!SdkError::from(CommandError::non_zero_exit(1, "")).is_interrupted());
    }
}
