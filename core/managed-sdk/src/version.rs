//! Requested SDK version.

use std::fmt;
use std::str::FromStr;

use crate::errors::SdkError;

/// Directory segment and display name of the floating version.
pub const LATEST: &str = "LATEST";

/// The version of the SDK a [`ManagedSdk`](crate::ManagedSdk) manages.
///
/// A fixed version is pinned and never updated in place. The floating
/// [`Version::Latest`] is periodically checked and updated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    /// Floating alias for the newest release.
    Latest,
    /// A pinned release, e.g. `"191.0.0"`.
    Fixed(String),
}

impl Version {
    /// Creates a fixed version after validating the string.
    ///
    /// The version becomes a directory name, so it must be non-empty, must not
    /// be the reserved `LATEST` alias and must not contain path separators or
    /// `..`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::InvalidVersion`] if the string is not usable.
    pub fn fixed(version: impl Into<String>) -> Result<Self, SdkError> {
        let version = version.into();
        let trimmed = version.trim();
        if trimmed.is_empty() {
            return Err(SdkError::invalid_version(version, "version is empty"));
        }
        if trimmed != version {
            return Err(SdkError::invalid_version(
                version,
                "version has surrounding whitespace",
            ));
        }
        if version.eq_ignore_ascii_case(LATEST) {
            return Err(SdkError::invalid_version(
                version,
                "use Version::Latest for the floating version",
            ));
        }
        if version.contains(['/', '\\']) || version.contains("..") {
            return Err(SdkError::invalid_version(
                version,
                "version must not contain path separators or '..'",
            ));
        }
        Ok(Self::Fixed(version))
    }

    /// Returns the string used as install directory segment.
    #[must_use = "returns the version string without side effects"]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Latest => LATEST,
            Self::Fixed(version) => version,
        }
    }

    /// Returns `true` for the floating version.
    #[must_use = "returns version kind without side effects"]
    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }

    /// Only the floating version may be updated in place.
    #[must_use = "returns version kind without side effects"]
    pub fn allows_update(&self) -> bool {
        self.is_latest()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Version {
    type Err = SdkError;

    /// Parses `"latest"` (any case) as [`Version::Latest`], anything else as a
    /// fixed version.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(LATEST) {
            Ok(Self::Latest)
        } else {
            Self::fixed(s)
        }
    }
}
