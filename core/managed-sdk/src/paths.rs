//! Path management for managed SDK installations.
//!
//! ## Directory Structure
//!
//! ```text
//! <managed root>/                    # see resolve_managed_sdk_root
//!   downloads/<version>/             # archives being installed
//!   LATEST/                          # floating version
//!     .install.lock                  # install/update lock + owner record
//!     google-cloud-sdk/              # SDK home
//!       bin/gcloud                   # launcher (gcloud.cmd on Windows)
//!       VERSION                      # plain-text version marker
//!   191.0.0/                         # a fixed version
//!     ...
//! ```
//!
//! ## Root resolution
//!
//! The root is resolved once from an [`EnvSnapshot`]:
//!
//! 1. `MANAGED_SDK_HOME` if set and non-blank
//! 2. Windows: `%LOCALAPPDATA%\google\ct4j-cloud-sdk` if the variable is set
//!    and the directory exists, otherwise `~/.cache/google/ct4j-cloud-sdk`
//! 3. macOS: `~/Library/Application Support/google-cloud-tools-java/managed-cloud-sdk`
//!    if `Application Support` exists, otherwise the XDG path below
//! 4. Linux: `~/.cache/google-cloud-tools-java/managed-cloud-sdk`

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::config::SdkProfile;
use crate::errors::SdkError;
use crate::platform::{OsFamily, OsProfile};
use crate::version::Version;

/// Environment variable to override the managed SDK root directory.
pub const MANAGED_SDK_HOME_ENV: &str = "MANAGED_SDK_HOME";

/// Windows per-user local application data directory.
const LOCAL_APP_DATA_ENV: &str = "LOCALAPPDATA";

/// Name of the plain-text version marker inside the SDK home.
pub const VERSION_FILE: &str = "VERSION";

/// Name of the lock file inside a version directory.
pub const LOCK_FILE: &str = ".install.lock";

/// Name of the directory holding archives during install.
const DOWNLOADS_DIR: &str = "downloads";

/// Values of the environment consulted during root resolution.
///
/// Captured once so that resolution is a pure function of this snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    /// The user's home directory.
    pub home_dir: Option<PathBuf>,
    /// Value of `LOCALAPPDATA`.
    pub local_app_data: Option<String>,
    /// Value of `MANAGED_SDK_HOME`.
    pub override_root: Option<String>,
}

impl EnvSnapshot {
    /// Reads the current process environment.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            home_dir: dirs::home_dir(),
            local_app_data: std::env::var(LOCAL_APP_DATA_ENV).ok(),
            override_root: std::env::var(MANAGED_SDK_HOME_ENV).ok(),
        }
    }
}

/// Resolves the directory holding all managed SDK versions for `os`.
///
/// # Errors
///
/// Returns [`SdkError::Configuration`] if no override is set and the home
/// directory is unknown.
pub fn resolve_managed_sdk_root(os: OsFamily, env: &EnvSnapshot) -> Result<PathBuf, SdkError> {
    if let Some(root) = non_blank(env.override_root.as_deref()) {
        return Ok(PathBuf::from(root));
    }

    let home = env.home_dir.as_deref().ok_or_else(|| {
        SdkError::configuration(format!(
            "Cannot determine home directory. Set {MANAGED_SDK_HOME_ENV} environment variable."
        ))
    })?;
    let partial = Path::new("google-cloud-tools-java").join("managed-cloud-sdk");
    let xdg = home.join(".cache").join(&partial);

    let root = match os {
        OsFamily::Windows => {
            // Shorter path, Windows installs hit the path length limit.
            let short = Path::new("google").join("ct4j-cloud-sdk");
            match non_blank(env.local_app_data.as_deref()) {
                Some(local_app_data) if Path::new(local_app_data).exists() => {
                    Path::new(local_app_data).join(short)
                }
                Some(local_app_data) => {
                    warn!(path = local_app_data, "LOCALAPPDATA does not exist");
                    home.join(".cache").join(short)
                }
                None => {
                    warn!("LOCALAPPDATA environment is invalid or missing");
                    home.join(".cache").join(short)
                }
            }
        }
        OsFamily::MacOs => {
            let application_support = home.join("Library").join("Application Support");
            if application_support.exists() {
                application_support.join(partial)
            } else {
                warn!(path = %application_support.display(), "directory does not exist");
                xdg
            }
        }
        OsFamily::Linux => xdg,
    };
    Ok(root)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Paths of one managed SDK version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkPaths {
    root: PathBuf,
    version_dir: PathBuf,
    home: PathBuf,
    executable: PathBuf,
    installer: PathBuf,
    downloads: PathBuf,
}

impl SdkPaths {
    /// Computes the paths of `version` below `root`.
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        version: &Version,
        os: OsProfile,
        profile: &SdkProfile,
    ) -> Self {
        let root = root.into();
        let version_dir = root.join(version.as_str());
        let home = version_dir.join(&profile.home_dir_name);
        let executable = home.join("bin").join(profile.executable_file_name(os));
        let installer = home.join(profile.installer_file_name(os));
        let downloads = root.join(DOWNLOADS_DIR).join(version.as_str());
        Self {
            root,
            version_dir,
            home,
            executable,
            installer,
            downloads,
        }
    }

    /// Directory holding all managed versions.
    #[must_use = "returns the path without side effects"]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of this version; the archive is extracted here.
    #[must_use = "returns the path without side effects"]
    pub fn version_dir(&self) -> &Path {
        &self.version_dir
    }

    /// The SDK home, `<root>/<version>/<home dir name>`.
    #[must_use = "returns the path without side effects"]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The SDK launcher in `bin/`.
    #[must_use = "returns the path without side effects"]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// The installer script inside the SDK home.
    #[must_use = "returns the path without side effects"]
    pub fn installer(&self) -> &Path {
        &self.installer
    }

    /// The version marker inside the SDK home.
    #[must_use = "returns the path without side effects"]
    pub fn version_file(&self) -> PathBuf {
        self.home.join(VERSION_FILE)
    }

    /// The install lock of this version.
    #[must_use = "returns the path without side effects"]
    pub fn lock_file(&self) -> PathBuf {
        self.version_dir.join(LOCK_FILE)
    }

    /// Where a downloaded archive named `file_name` is staged. Each version
    /// stages separately since versions are locked independently.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Configuration`] unless `file_name` is a single
    /// plain path component.
    pub fn download_path(&self, file_name: &str) -> Result<PathBuf, SdkError> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.downloads.join(name)),
            _ => Err(SdkError::configuration(format!(
                "archive file name must be a plain file name, got '{file_name}'"
            ))),
        }
    }
}
