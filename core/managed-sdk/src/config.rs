//! Configuration passed to a [`ManagedSdk`](crate::ManagedSdk) at construction.
//!
//! There is no process-wide state: user agent, environment overrides and lock
//! behaviour travel with the instance that uses them.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::platform::OsProfile;

/// User agent reported to the SDK by default.
pub const DEFAULT_USER_AGENT: &str = "google-cloud-tools-rust";

/// Default time to wait for a competing install to release the lock.
const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(10 * 60);

/// Behaviour when the install lock is held by someone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPolicy {
    /// Fail immediately with [`SdkError::LockContention`](crate::SdkError::LockContention).
    FailFast,
    /// Poll until the lock is free or `timeout` elapses.
    Wait {
        /// Upper bound on the time spent waiting.
        timeout: Duration,
    },
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self::Wait {
            timeout: DEFAULT_LOCK_WAIT,
        }
    }
}

/// Where the wrapped SDK keeps its launcher and installer inside an
/// installation root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkProfile {
    /// Name of the SDK home directory inside the version directory. The
    /// release archive is expected to contain it as its top-level folder.
    pub home_dir_name: String,
    /// Launcher name in `bin/`, without platform suffix.
    pub executable_name: String,
    /// Installer script run after extraction on Unix.
    pub unix_installer: String,
    /// Installer script run after extraction on Windows.
    pub windows_installer: String,
    /// Arguments passed to the installer script.
    pub installer_args: Vec<String>,
}

impl SdkProfile {
    /// Profile of the Google Cloud SDK.
    #[must_use]
    pub fn cloud_sdk() -> Self {
        Self {
            home_dir_name: "google-cloud-sdk".to_string(),
            executable_name: "gcloud".to_string(),
            unix_installer: "install.sh".to_string(),
            windows_installer: "install.bat".to_string(),
            installer_args: [
                "--path-update=false",
                "--command-completion=false",
                "--quiet",
                "--usage-reporting=false",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }

    /// Returns the launcher file name for `os`, e.g. `gcloud.cmd` on Windows.
    #[must_use = "returns the file name without side effects"]
    pub fn executable_file_name(&self, os: OsProfile) -> String {
        format!("{}{}", self.executable_name, os.launcher_suffix())
    }

    /// Returns the installer script name for `os`.
    #[must_use = "returns the file name without side effects"]
    pub fn installer_file_name(&self, os: OsProfile) -> &str {
        if os.is_windows() {
            &self.windows_installer
        } else {
            &self.unix_installer
        }
    }
}

impl Default for SdkProfile {
    fn default() -> Self {
        Self::cloud_sdk()
    }
}

/// Settings of one managed SDK instance.
///
/// # Example
///
/// ```
/// use managed_sdk::{LockPolicy, ManagedSdkConfig};
///
/// let config = ManagedSdkConfig {
///     user_agent: "my-plugin/1.2".to_string(),
///     lock_policy: LockPolicy::FailFast,
///     ..ManagedSdkConfig::default()
/// };
/// assert!(config.sdk_environment().contains_key("CLOUDSDK_METRICS_ENVIRONMENT"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedSdkConfig {
    /// Client identification passed to the SDK's usage metrics.
    pub user_agent: String,
    /// Extra environment entries for every SDK command. Applied after the
    /// entries derived from the user agent, so they can override them.
    pub environment: BTreeMap<String, String>,
    /// What to do when the install lock is held.
    pub lock_policy: LockPolicy,
    /// Layout of the wrapped SDK.
    pub sdk_profile: SdkProfile,
    /// Run the SDK's installer script after extraction.
    pub run_installer: bool,
    /// Components the installer sets up instead of its defaults. Empty keeps
    /// the defaults.
    pub override_components: BTreeSet<String>,
    /// Timeout applied to SDK commands that do not set their own.
    pub command_timeout: Option<Duration>,
}

impl ManagedSdkConfig {
    /// Returns the environment every SDK command runs with, on top of the
    /// inherited one.
    #[must_use = "returns the environment without side effects"]
    pub fn sdk_environment(&self) -> BTreeMap<String, String> {
        let (agent, agent_version) = match self.user_agent.split_once('/') {
            Some((agent, version)) => (agent, version),
            None => (self.user_agent.as_str(), ""),
        };

        let mut environment = BTreeMap::new();
        environment.insert(
            "CLOUDSDK_METRICS_ENVIRONMENT".to_string(),
            agent.to_string(),
        );
        if !agent_version.is_empty() {
            environment.insert(
                "CLOUDSDK_METRICS_ENVIRONMENT_VERSION".to_string(),
                agent_version.to_string(),
            );
        }
        environment.insert("CLOUDSDK_CORE_DISABLE_PROMPTS".to_string(), "1".to_string());
        environment.extend(
            self.environment
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        environment
    }

    /// Returns the arguments passed to the installer script.
    #[must_use = "returns the arguments without side effects"]
    pub fn installer_args(&self) -> Vec<String> {
        let mut args = self.sdk_profile.installer_args.clone();
        if !self.override_components.is_empty() {
            args.push("--override-components".to_string());
            args.extend(self.override_components.iter().cloned());
        }
        args
    }
}

impl Default for ManagedSdkConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            environment: BTreeMap::new(),
            lock_policy: LockPolicy::default(),
            sdk_profile: SdkProfile::default(),
            run_installer: true,
            override_components: BTreeSet::new(),
            command_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Architecture, OsFamily};

    #[test]
    fn default_profile_targets_cloud_sdk() {
        let profile = SdkProfile::default();
        let linux = OsProfile::new(OsFamily::Linux, Architecture::X86_64);
        let windows = OsProfile::new(OsFamily::Windows, Architecture::X86_64);

        assert_eq!(profile.home_dir_name, "google-cloud-sdk");
        assert_eq!(profile.executable_file_name(linux), "gcloud");
        assert_eq!(profile.executable_file_name(windows), "gcloud.cmd");
        assert_eq!(profile.installer_file_name(linux), "install.sh");
        assert_eq!(profile.installer_file_name(windows), "install.bat");
    }

    #[test]
    fn override_components_follow_profile_args() {
        let config = ManagedSdkConfig {
            override_components: ["kubectl", "app-engine-java"]
                .into_iter()
                .map(String::from)
                .collect(),
            ..ManagedSdkConfig::default()
        };
        let args = config.installer_args();
        assert_eq!(
            args[args.len() - 3..],
            ["--override-components", "app-engine-java", "kubectl"]
        );
        assert_eq!(args[..4], SdkProfile::default().installer_args[..]);

        assert_eq!(
            ManagedSdkConfig::default().installer_args(),
            SdkProfile::default().installer_args
        );
    }

    #[test]
    fn user_agent_with_version_is_split() {
        let config = ManagedSdkConfig {
            user_agent: "my-plugin/1.2".to_string(),
            ..ManagedSdkConfig::default()
        };
        let env = config.sdk_environment();
        assert_eq!(env["CLOUDSDK_METRICS_ENVIRONMENT"], "my-plugin");
        assert_eq!(env["CLOUDSDK_METRICS_ENVIRONMENT_VERSION"], "1.2");
        assert_eq!(env["CLOUDSDK_CORE_DISABLE_PROMPTS"], "1");
    }

    #[test]
    fn explicit_environment_overrides_derived_entries() {
        let mut config = ManagedSdkConfig::default();
        config
            .environment
            .insert("CLOUDSDK_CORE_DISABLE_PROMPTS".to_string(), "0".to_string());
        let env = config.sdk_environment();
        assert_eq!(env["CLOUDSDK_CORE_DISABLE_PROMPTS"], "0");
        assert_eq!(env["CLOUDSDK_METRICS_ENVIRONMENT"], DEFAULT_USER_AGENT);
        assert!(!env.contains_key("CLOUDSDK_METRICS_ENVIRONMENT_VERSION"));
    }

    #[test]
    fn default_lock_policy_waits() {
        assert!(matches!(LockPolicy::default(), LockPolicy::Wait { .. }));
    }
}
