//! Operating system detection for the managed SDK.
//!
//! The set of supported platforms is closed: every consumer matches
//! exhaustively on [`OsFamily`] and [`Architecture`], so adding a platform is a
//! compile error everywhere a decision depends on it.
//!
//! ## Supported Platforms
//!
//! - Linux (`x86`, `x86_64`, `arm64`)
//! - macOS (`x86_64`, `arm64`)
//! - Windows (`x86`, `x86_64`, `arm64`)

use std::fmt;

use crate::archive::ArchiveKind;
use crate::errors::SdkError;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    /// Linux distributions.
    Linux,
    /// Apple macOS.
    MacOs,
    /// Microsoft Windows.
    Windows,
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    /// 32-bit x86.
    X86,
    /// 64-bit x86.
    X86_64,
    /// 64-bit ARM.
    Arm64,
}

/// Operating system and architecture of the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsProfile {
    /// Operating system family.
    pub family: OsFamily,
    /// CPU architecture.
    pub architecture: Architecture,
}

impl OsFamily {
    /// Maps a [`std::env::consts::OS`] value to a family.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::UnsupportedOs`] for any other operating system.
    pub fn from_os_name(os: &str) -> Result<Self, SdkError> {
        match os {
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::MacOs),
            "windows" => Ok(Self::Windows),
            other => Err(SdkError::UnsupportedOs {
                os: other.to_string(),
                arch: std::env::consts::ARCH.to_string(),
            }),
        }
    }

    /// Returns the family name used in SDK download file names.
    #[must_use = "returns the name without side effects"]
    pub fn download_name(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "darwin",
            Self::Windows => "windows",
        }
    }
}

impl Architecture {
    /// Maps a [`std::env::consts::ARCH`] value to an architecture.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::UnsupportedOs`] for any other architecture.
    pub fn from_arch_name(arch: &str) -> Result<Self, SdkError> {
        match arch {
            "x86" => Ok(Self::X86),
            "x86_64" => Ok(Self::X86_64),
            "aarch64" => Ok(Self::Arm64),
            other => Err(SdkError::UnsupportedOs {
                os: std::env::consts::OS.to_string(),
                arch: other.to_string(),
            }),
        }
    }

    /// Returns the architecture name used in SDK download file names.
    #[must_use = "returns the name without side effects"]
    pub fn download_name(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm",
        }
    }
}

impl OsProfile {
    /// Detects the platform this process runs on.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::UnsupportedOs`] if the operating system or the
    /// architecture is not supported.
    ///
    /// # Examples
    ///
    /// ```
    /// use managed_sdk::OsProfile;
    ///
    /// let os = OsProfile::detect()?;
    /// println!("Running on: {os}");
    /// # Ok::<(), managed_sdk::SdkError>(())
    /// ```
    pub fn detect() -> Result<Self, SdkError> {
        Self::from_names(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Builds a profile from `std::env::consts`-style names.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::UnsupportedOs`] for unknown names.
    pub fn from_names(os: &str, arch: &str) -> Result<Self, SdkError> {
        Ok(Self {
            family: OsFamily::from_os_name(os)?,
            architecture: Architecture::from_arch_name(arch)?,
        })
    }

    /// Creates a profile from known parts.
    #[must_use]
    pub const fn new(family: OsFamily, architecture: Architecture) -> Self {
        Self {
            family,
            architecture,
        }
    }

    /// Returns whether this platform is Windows.
    #[must_use = "returns platform check result without side effects"]
    pub fn is_windows(self) -> bool {
        matches!(self.family, OsFamily::Windows)
    }

    /// Returns the suffix of script launchers (`gcloud.cmd` on Windows).
    #[must_use = "returns the suffix without side effects"]
    pub fn launcher_suffix(self) -> &'static str {
        match self.family {
            OsFamily::Windows => ".cmd",
            OsFamily::Linux | OsFamily::MacOs => "",
        }
    }

    /// Returns the suffix of native executables.
    #[must_use = "returns the suffix without side effects"]
    pub fn executable_suffix(self) -> &'static str {
        match self.family {
            OsFamily::Windows => ".exe",
            OsFamily::Linux | OsFamily::MacOs => "",
        }
    }

    /// Returns the archive format SDK releases are published in.
    #[must_use = "returns the archive kind without side effects"]
    pub fn archive_kind(self) -> ArchiveKind {
        match self.family {
            OsFamily::Windows => ArchiveKind::Zip,
            OsFamily::Linux | OsFamily::MacOs => ArchiveKind::TarGz,
        }
    }
}

impl fmt::Display for OsProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.family.download_name(),
            self.architecture.download_name()
        )
    }
}
