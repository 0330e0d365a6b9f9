//! Install, verify, update and invoke one managed SDK version.
//!
//! [`ManagedSdk`] reconciles what is on disk under
//! `<managed root>/<version>/<sdk home>` with the requested [`Version`].
//! Queries ([`ManagedSdk::is_installed`], [`ManagedSdk::is_up_to_date`]) never
//! modify anything. Mutations ([`ManagedSdk::install`], [`ManagedSdk::update`],
//! [`ManagedSdk::install_component`]) run under the version's
//! [`InstallLock`] and are strictly sequential inside.
//!
//! ```text
//!              install                 update (latest only)
//!   Absent ─────────────▶ InstalledCurrent ◀──────────── InstalledStale
//!                               │  newer release published      ▲
//!                               └───────────────────────────────┘
//!
//!   VERSION marker differs from a fixed version: InstalledMismatch (terminal)
//! ```

use std::iter;
use std::path::{Path, PathBuf};

use managed_sdk_process::{
    CancellationToken, CommandError, CommandExecutor, LineListener, ProcessExecutor,
    ProcessInvocation,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::archive::ExtractorListener;
use crate::components::parse_component_list;
use crate::config::ManagedSdkConfig;
use crate::errors::SdkError;
use crate::lock::InstallLock;
use crate::paths::{EnvSnapshot, SdkPaths, resolve_managed_sdk_root};
use crate::platform::OsProfile;
use crate::source::ArchiveSource;
use crate::version::Version;

/// Installed state of a managed SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallState {
    /// No usable installation: the SDK home or its launcher is missing.
    Absent,
    /// Installed and, for the floating version, without pending updates.
    InstalledCurrent,
    /// Installed floating version with updates available.
    InstalledStale,
    /// Installed fixed version whose `VERSION` marker names another version.
    ///
    /// Only reported by [`ManagedSdk::state`]; [`ManagedSdk::is_installed`]
    /// raises [`SdkError::VersionMismatch`] instead.
    InstalledMismatch,
}

impl InstallState {
    /// Returns `true` if the launcher is present.
    #[must_use = "returns the state check without side effects"]
    pub fn is_installed(self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// Result of [`ManagedSdk::install`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A verified installation was already present; nothing was touched.
    AlreadyInstalled,
    /// The archive was extracted and verified.
    Installed,
}

/// A managed SDK of one version at one location.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use managed_sdk::{FileArchiveSource, ManagedSdk, ManagedSdkConfig, Version};
///
/// # async fn run() -> Result<(), managed_sdk::SdkError> {
/// let sdk = ManagedSdk::new(Version::Latest, ManagedSdkConfig::default())?;
/// if !sdk.is_installed().await?.is_installed() {
///     let source = FileArchiveSource::new("google-cloud-sdk.tar.gz")?;
///     sdk.install(&source, Arc::new(|line: &str| println!("{line}"))).await?;
/// }
/// if !sdk.is_up_to_date().await? {
///     sdk.update(Arc::new(|line: &str| println!("{line}"))).await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ManagedSdk {
    version: Version,
    os: OsProfile,
    paths: SdkPaths,
    config: ManagedSdkConfig,
    commands: CommandExecutor,
}

impl ManagedSdk {
    /// Creates a managed SDK at the default location for this platform.
    ///
    /// The platform and the environment are read once here.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::UnsupportedOs`] on unsupported platforms and
    /// [`SdkError::Configuration`] if the location cannot be determined.
    pub fn new(version: Version, config: ManagedSdkConfig) -> Result<Self, SdkError> {
        let os = OsProfile::detect()?;
        let root = resolve_managed_sdk_root(os.family, &EnvSnapshot::capture())?;
        Ok(Self::with_root(version, root, os, config))
    }

    /// Creates a managed SDK below an explicit `root`.
    #[must_use]
    pub fn with_root(
        version: Version,
        root: impl Into<PathBuf>,
        os: OsProfile,
        config: ManagedSdkConfig,
    ) -> Self {
        let paths = SdkPaths::new(root, &version, os, &config.sdk_profile);
        let executor = ProcessExecutor::new().with_environment(config.sdk_environment());
        Self {
            version,
            os,
            paths,
            config,
            commands: CommandExecutor::new(executor),
        }
    }

    /// Uses `token` to cancel lock waits, staging and SDK commands.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        let executor = self
            .commands
            .process_executor()
            .clone()
            .with_cancellation(token);
        self.commands = CommandExecutor::new(executor);
        self
    }

    /// Token observed by every operation of this instance.
    #[must_use = "returns the token without side effects"]
    pub fn cancellation_token(&self) -> &CancellationToken {
        self.commands.process_executor().cancellation_token()
    }

    /// The managed version.
    #[must_use = "returns the version without side effects"]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// The platform this instance was created for.
    #[must_use = "returns the platform without side effects"]
    pub fn os_profile(&self) -> OsProfile {
        self.os
    }

    /// The configuration this instance was created with.
    #[must_use = "returns the configuration without side effects"]
    pub fn config(&self) -> &ManagedSdkConfig {
        &self.config
    }

    /// Directory holding all managed versions.
    #[must_use = "returns the path without side effects"]
    pub fn managed_root(&self) -> &Path {
        self.paths.root()
    }

    /// The SDK home, `<managed root>/<version>/google-cloud-sdk` by default.
    #[must_use = "returns the path without side effects"]
    pub fn sdk_home(&self) -> &Path {
        self.paths.home()
    }

    /// The SDK launcher, `bin/gcloud` (`bin/gcloud.cmd` on Windows).
    #[must_use = "returns the path without side effects"]
    pub fn executable_path(&self) -> &Path {
        self.paths.executable()
    }

    /// Checks the on-disk installation without running anything.
    ///
    /// The floating version is reported as [`InstallState::InstalledCurrent`]
    /// whenever the launcher exists; use [`ManagedSdk::is_up_to_date`] or
    /// [`ManagedSdk::state`] for staleness.
    ///
    /// # Errors
    ///
    /// - [`SdkError::Verification`] if the `VERSION` marker of a fixed version
    ///   cannot be read
    /// - [`SdkError::VersionMismatch`] if it names another version
    pub async fn is_installed(&self) -> Result<InstallState, SdkError> {
        if !is_dir(self.paths.home()).await || !is_file(self.paths.executable()).await {
            return Ok(InstallState::Absent);
        }

        if let Version::Fixed(expected) = &self.version {
            let version_file = self.paths.version_file();
            let contents = tokio::fs::read_to_string(&version_file)
                .await
                .map_err(|e| {
                    SdkError::verification_with_source(
                        format!("Failed to read {}", version_file.display()),
                        e,
                    )
                })?;
            let found = contents.trim();
            if found != expected {
                return Err(SdkError::version_mismatch(expected.as_str(), found));
            }
        }
        Ok(InstallState::InstalledCurrent)
    }

    /// Asks the SDK whether any component has a pending update.
    ///
    /// A fixed version is always up to date. A missing launcher is not.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Verification`] if the SDK command fails or prints
    /// something unparsable, or [`SdkError::Command`] if it was cancelled or
    /// timed out.
    pub async fn is_up_to_date(&self) -> Result<bool, SdkError> {
        if !is_file(self.paths.executable()).await {
            return Ok(false);
        }
        if !self.version.is_latest() {
            return Ok(true);
        }

        let output = self
            .capture([
                "components",
                "list",
                "--format=json",
                "--filter=state.name:Update Available",
            ])
            .await?;
        let components = parse_component_list(&output)?;
        Ok(!components.iter().any(|c| c.has_update()))
    }

    /// Combines [`ManagedSdk::is_installed`] and [`ManagedSdk::is_up_to_date`].
    ///
    /// # Errors
    ///
    /// Returns the errors of both queries, except that a version mismatch is
    /// reported as [`InstallState::InstalledMismatch`].
    pub async fn state(&self) -> Result<InstallState, SdkError> {
        let installed = match self.is_installed().await {
            Ok(state) => state,
            Err(SdkError::VersionMismatch { .. }) => return Ok(InstallState::InstalledMismatch),
            Err(err) => return Err(err),
        };
        if installed == InstallState::Absent {
            return Ok(InstallState::Absent);
        }
        if self.is_up_to_date().await? {
            Ok(InstallState::InstalledCurrent)
        } else {
            Ok(InstallState::InstalledStale)
        }
    }

    /// Asks the SDK whether component `id` is installed, without network
    /// access.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Verification`] if the SDK command fails or `id`
    /// matches more than one component.
    pub async fn has_component(&self, id: &str) -> Result<bool, SdkError> {
        if !is_file(self.paths.executable()).await {
            return Ok(false);
        }

        let filter = format!("--filter=id:{id}");
        let output = self
            .capture([
                "components",
                "list",
                "--only-local-state",
                "--format=json",
                filter.as_str(),
            ])
            .await?;
        let components = parse_component_list(&output)?;
        if components.len() > 1 {
            return Err(SdkError::verification(format!("Invalid component {id}")));
        }
        Ok(!components.is_empty())
    }

    /// Installs the SDK from `source` unless a verified installation exists.
    ///
    /// The archive is staged in `<managed root>/downloads`, extracted into
    /// the version directory, and the SDK installer script runs if
    /// [`ManagedSdkConfig::run_installer`] is set. Progress lines from
    /// extraction and the installer go to `listener`. The staged archive is
    /// removed afterwards. A failure leaves whatever was already written in
    /// place; the next install extracts over it.
    ///
    /// # Errors
    ///
    /// - [`SdkError::Configuration`] if the source's file name is not a plain
    ///   file name
    /// - [`SdkError::LockContention`] or [`SdkError::Cancelled`] while
    ///   acquiring the lock
    /// - [`SdkError::VersionMismatch`] if a different fixed version occupies
    ///   the directory
    /// - [`SdkError::Extract`] if the archive is invalid or malicious
    /// - [`SdkError::Command`] if the installer script fails
    /// - [`SdkError::Verification`] if the result is not a usable install
    pub async fn install<S>(
        &self,
        source: &S,
        listener: LineListener,
    ) -> Result<InstallOutcome, SdkError>
    where
        S: ArchiveSource,
    {
        self.check_cancelled()?;
        let archive = self.paths.download_path(source.file_name())?;
        let lock = self.lock("install").await?;

        match self.is_installed().await {
            Ok(InstallState::Absent) => {}
            Ok(_) if lock.recovered_stale_owner().is_none() => {
                debug!(home = %self.sdk_home().display(), "SDK already installed");
                return Ok(InstallOutcome::AlreadyInstalled);
            }
            Ok(_) => {
                warn!(
                    home = %self.sdk_home().display(),
                    "previous install was interrupted, reinstalling"
                );
            }
            Err(err @ SdkError::VersionMismatch { .. }) => return Err(err),
            Err(err) => {
                warn!(
                    home = %self.sdk_home().display(),
                    error = %err,
                    "existing install unusable, reinstalling"
                );
            }
        }

        info!(version = %self.version, home = %self.sdk_home().display(), "installing SDK");
        let result = self.install_from(source, &archive, &listener).await;
        if let Err(err) = tokio::fs::remove_file(&archive).await
            && err.kind() != std::io::ErrorKind::NotFound
        {
            warn!(archive = %archive.display(), error = %err, "failed to remove staged archive");
        }
        result?;

        info!(version = %self.version, "SDK installed");
        drop(lock);
        Ok(InstallOutcome::Installed)
    }

    async fn install_from<S>(
        &self,
        source: &S,
        archive: &Path,
        listener: &LineListener,
    ) -> Result<(), SdkError>
    where
        S: ArchiveSource,
    {
        self.stage(source, archive).await?;
        self.check_cancelled()?;
        self.extract(source, archive, listener).await?;
        self.check_cancelled()?;
        if self.config.run_installer {
            self.run_installer(listener).await?;
        }

        match self.is_installed().await? {
            InstallState::Absent => Err(SdkError::verification(format!(
                "installation did not produce {}",
                self.executable_path().display()
            ))),
            _ => Ok(()),
        }
    }

    async fn stage<S>(&self, source: &S, archive: &Path) -> Result<(), SdkError>
    where
        S: ArchiveSource,
    {
        if let Some(parent) = archive.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                SdkError::io(format!("Failed to create directory: {}", parent.display()), e)
            })?;
        }
        let mut reader = source.open().await?;
        let mut file = tokio::fs::File::create(archive).await.map_err(|e| {
            SdkError::io(format!("Failed to create file: {}", archive.display()), e)
        })?;

        let copied = tokio::select! {
            () = self.cancellation_token().cancelled() => return Err(SdkError::Cancelled),
            copied = tokio::io::copy(&mut reader, &mut file) => copied,
        };
        let copied = copied.map_err(|e| {
            SdkError::io(format!("Failed to stage archive: {}", archive.display()), e)
        })?;
        file.flush()
            .await
            .map_err(|e| SdkError::io(format!("Failed to write: {}", archive.display()), e))?;

        debug!(archive = %archive.display(), bytes = copied, "staged SDK archive");
        Ok(())
    }

    async fn extract<S>(
        &self,
        source: &S,
        archive: &Path,
        listener: &LineListener,
    ) -> Result<(), SdkError>
    where
        S: ArchiveSource,
    {
        let provider = source.kind().provider();
        let archive = archive.to_path_buf();
        let destination = self.paths.version_dir().to_path_buf();
        let listener = listener.clone();

        tokio::task::spawn_blocking(move || {
            let forward = move |message: &str| listener(message);
            provider.extract(&archive, &destination, &forward as &dyn ExtractorListener)
        })
        .await
        .map_err(|e| SdkError::io("Extraction task failed", std::io::Error::other(e)))??;
        Ok(())
    }

    async fn run_installer(&self, listener: &LineListener) -> Result<(), SdkError> {
        let installer = self.paths.installer();
        if !is_file(installer).await {
            return Err(SdkError::verification(format!(
                "installer script not found: {}",
                installer.display()
            )));
        }

        let script = installer.to_string_lossy().into_owned();
        let mut command = if self.os.is_windows() {
            vec!["cmd.exe".to_string(), "/c".to_string(), script]
        } else {
            vec![script]
        };
        command.extend(self.config.installer_args());

        let invocation = ProcessInvocation::new(command)
            .with_working_directory(self.sdk_home())
            .default_timeout(self.config.command_timeout);
        debug!(command = ?invocation.command(), "running SDK installer");
        self.stream(invocation, listener).await
    }

    /// Updates the floating version in place with `components update`.
    ///
    /// SDK output goes to `listener`. Returns the exit code, always `0`.
    ///
    /// # Errors
    ///
    /// - [`SdkError::UnsupportedOperation`] for a fixed version, before
    ///   anything on disk is touched
    /// - [`SdkError::LockContention`] or [`SdkError::Cancelled`] while
    ///   acquiring the lock
    /// - [`SdkError::Command`] with [`CommandError::NonZeroExit`] if the
    ///   update fails; its stderr is empty since output went to `listener`
    pub async fn update(&self, listener: LineListener) -> Result<i32, SdkError> {
        if !self.version.allows_update() {
            return Err(SdkError::unsupported_operation(format!(
                "cannot update fixed version {} of the SDK",
                self.version
            )));
        }
        self.check_cancelled()?;
        let _lock = self.lock("update").await?;

        info!(home = %self.sdk_home().display(), "updating SDK");
        self.stream(self.command(["components", "update", "--quiet"]), &listener)
            .await?;
        info!("SDK updated");
        Ok(0)
    }

    /// Installs SDK component `id` with `components install`.
    ///
    /// # Errors
    ///
    /// Same as [`ManagedSdk::update`] apart from the version restriction.
    pub async fn install_component(
        &self,
        id: &str,
        listener: LineListener,
    ) -> Result<(), SdkError> {
        self.check_cancelled()?;
        let _lock = self.lock("component").await?;

        info!(component = id, "installing SDK component");
        self.stream(
            self.command(["components", "install", id, "--quiet"]),
            &listener,
        )
        .await
    }

    async fn lock(&self, owner: &str) -> Result<InstallLock, SdkError> {
        InstallLock::acquire(
            &self.paths.lock_file(),
            owner,
            self.config.lock_policy,
            self.cancellation_token(),
        )
        .await
    }

    fn check_cancelled(&self) -> Result<(), SdkError> {
        if self.cancellation_token().is_cancelled() {
            Err(SdkError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Builds an invocation of the SDK launcher with `args`, using the
    /// configured command timeout.
    #[must_use]
    pub fn command<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> ProcessInvocation {
        let executable = self.executable_path().to_string_lossy().into_owned();
        ProcessInvocation::new(iter::once(executable).chain(args.into_iter().map(String::from)))
            .default_timeout(self.config.command_timeout)
    }

    /// Executor running SDK commands with the user agent environment and
    /// this instance's cancellation token.
    #[must_use = "returns the executor without side effects"]
    pub fn command_executor(&self) -> &CommandExecutor {
        &self.commands
    }

    async fn capture<'a>(
        &self,
        args: impl IntoIterator<Item = &'a str>,
    ) -> Result<String, SdkError> {
        self.commands
            .capture(self.command(args))
            .await
            .map_err(|err| {
                if matches!(&err, CommandError::Execution(e) if e.is_interrupted()) {
                    SdkError::Command(err)
                } else {
                    SdkError::verification_with_source("SDK command failed", err)
                }
            })
    }

    async fn stream(
        &self,
        invocation: ProcessInvocation,
        listener: &LineListener,
    ) -> Result<(), SdkError> {
        let out = listener.clone();
        let err = listener.clone();
        let exit_code = self
            .commands
            .stream(invocation, move |line: &str| out(line), move |line: &str| err(line))
            .await?;
        if exit_code != 0 {
            return Err(CommandError::non_zero_exit(exit_code, "").into());
        }
        Ok(())
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Architecture, OsFamily};
    use std::sync::Arc;

    fn linux() -> OsProfile {
        OsProfile::new(OsFamily::Linux, Architecture::X86_64)
    }

    fn fixed(root: &Path, version: &str) -> ManagedSdk {
        ManagedSdk::with_root(
            Version::fixed(version).unwrap(),
            root,
            linux(),
            ManagedSdkConfig::default(),
        )
    }

    fn write_install(root: &Path, version_segment: &str, version_marker: Option<&str>) {
        let home = root.join(version_segment).join("google-cloud-sdk");
        std::fs::create_dir_all(home.join("bin")).unwrap();
        std::fs::write(home.join("bin").join("gcloud"), "#!/bin/sh\n").unwrap();
        if let Some(marker) = version_marker {
            std::fs::write(home.join("VERSION"), marker).unwrap();
        }
    }

    #[test]
    fn accessors_follow_layout() {
        let sdk = ManagedSdk::with_root(
            Version::Latest,
            "/sdk",
            OsProfile::new(OsFamily::Windows, Architecture::X86_64),
            ManagedSdkConfig::default(),
        );
        assert_eq!(sdk.managed_root(), Path::new("/sdk"));
        assert_eq!(sdk.sdk_home(), Path::new("/sdk/LATEST/google-cloud-sdk"));
        assert_eq!(
            sdk.executable_path(),
            Path::new("/sdk/LATEST/google-cloud-sdk/bin/gcloud.cmd")
        );
        assert!(sdk.version().is_latest());
        assert!(sdk.os_profile().is_windows());
    }

    #[tokio::test]
    async fn empty_root_is_absent() {
        let temp = assert_fs::TempDir::new().unwrap();
        let sdk = fixed(temp.path(), "191.0.0");
        assert_eq!(sdk.is_installed().await.unwrap(), InstallState::Absent);
        assert_eq!(sdk.state().await.unwrap(), InstallState::Absent);
        assert!(!sdk.is_up_to_date().await.unwrap());
    }

    #[tokio::test]
    async fn home_without_launcher_is_absent() {
        let temp = assert_fs::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("191.0.0/google-cloud-sdk")).unwrap();
        let sdk = fixed(temp.path(), "191.0.0");
        assert_eq!(sdk.is_installed().await.unwrap(), InstallState::Absent);
    }

    #[tokio::test]
    async fn matching_version_marker_is_current() {
        let temp = assert_fs::TempDir::new().unwrap();
        write_install(temp.path(), "191.0.0", Some("191.0.0\n"));
        let sdk = fixed(temp.path(), "191.0.0");
        assert_eq!(
            sdk.is_installed().await.unwrap(),
            InstallState::InstalledCurrent
        );
        assert!(sdk.is_up_to_date().await.unwrap());
    }

    #[tokio::test]
    async fn differing_version_marker_is_mismatch() {
        let temp = assert_fs::TempDir::new().unwrap();
        write_install(temp.path(), "99.0.0", Some("100.0.0"));
        let sdk = fixed(temp.path(), "99.0.0");

        match sdk.is_installed().await.unwrap_err() {
            SdkError::VersionMismatch { expected, found } => {
                assert_eq!(expected, "99.0.0");
                assert_eq!(found, "100.0.0");
            }
            other => panic!("expected VersionMismatch, got {other:?}"),
        }
        assert_eq!(sdk.state().await.unwrap(), InstallState::InstalledMismatch);
    }

    #[tokio::test]
    async fn missing_version_marker_is_verification_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        write_install(temp.path(), "191.0.0", None);
        let sdk = fixed(temp.path(), "191.0.0");
        assert!(matches!(
            sdk.is_installed().await,
            Err(SdkError::Verification { source: Some(_), .. })
        ));
    }

    #[tokio::test]
    async fn latest_ignores_version_marker() {
        let temp = assert_fs::TempDir::new().unwrap();
        write_install(temp.path(), "LATEST", None);
        let sdk = ManagedSdk::with_root(
            Version::Latest,
            temp.path(),
            linux(),
            ManagedSdkConfig::default(),
        );
        assert_eq!(
            sdk.is_installed().await.unwrap(),
            InstallState::InstalledCurrent
        );
    }

    #[tokio::test]
    async fn update_of_fixed_version_is_rejected_before_touching_disk() {
        let temp = assert_fs::TempDir::new().unwrap();
        let root = temp.path().join("never-created");
        let sdk = fixed(&root, "191.0.0");

        let err = sdk.update(Arc::new(|_: &str| {})).await.unwrap_err();

        assert!(matches!(err, SdkError::UnsupportedOperation { .. }));
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn cancelled_instance_refuses_to_install() {
        let temp = assert_fs::TempDir::new().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let sdk = fixed(temp.path(), "191.0.0").with_cancellation(token);
        let source = crate::source::FileArchiveSource::new(temp.path().join("sdk.tar.gz")).unwrap();

        let err = sdk.install(&source, Arc::new(|_: &str| {})).await.unwrap_err();

        assert!(matches!(err, SdkError::Cancelled));
        assert!(!temp.path().join("191.0.0").exists());
    }

    struct NamedSource(&'static str);

    impl ArchiveSource for NamedSource {
        fn file_name(&self) -> &str {
            self.0
        }

        fn kind(&self) -> crate::archive::ArchiveKind {
            crate::archive::ArchiveKind::TarGz
        }

        async fn open(&self) -> Result<crate::source::ArchiveStream, SdkError> {
            Ok(Box::new(tokio::io::empty()))
        }
    }

    #[tokio::test]
    async fn archive_name_outside_staging_directory_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let victim = temp.path().join("victim");
        std::fs::write(&victim, "keep me").unwrap();
        let root = temp.path().join("root");
        let sdk = fixed(&root, "191.0.0");

        let err = sdk
            .install(&NamedSource("../../../victim"), Arc::new(|_: &str| {}))
            .await
            .unwrap_err();

        assert!(matches!(err, SdkError::Configuration { .. }));
        assert_eq!(std::fs::read_to_string(&victim).unwrap(), "keep me");
        assert!(!root.join("191.0.0").exists());
    }

    #[test]
    fn install_state_reports_presence() {
        assert!(!InstallState::Absent.is_installed());
        assert!(InstallState::InstalledStale.is_installed());
        assert!(InstallState::InstalledMismatch.is_installed());
    }
}
