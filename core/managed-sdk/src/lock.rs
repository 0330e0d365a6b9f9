//! Exclusive install lock for one managed SDK version directory.
//!
//! The lock is an OS advisory lock on `<root>/<version>/.install.lock`. The
//! kernel releases it when the owning process dies, so the OS lock alone
//! decides liveness. The file additionally carries a JSON owner record,
//! written after acquisition and truncated on release. Finding a record while
//! the OS lock was free means the previous owner died mid-operation and its
//! work cannot be trusted.
//!
//! Locks are tied to an open file handle, so acquiring the same lock twice
//! from one process contends like any other acquisition.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use fs4::FileExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::LockPolicy;
use crate::errors::SdkError;

/// Interval between acquisition attempts under [`LockPolicy::Wait`].
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Owner record stored in the lock file while the lock is held.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOwner {
    /// Process id of the holder.
    #[serde(default)]
    pub pid: u32,
    /// What the holder is doing, e.g. `install`.
    #[serde(default)]
    pub owner: String,
    /// Acquisition time in seconds since the Unix epoch.
    #[serde(default)]
    pub acquired_at: u64,
}

impl LockOwner {
    fn current(owner: &str) -> Self {
        Self {
            pid: std::process::id(),
            owner: owner.to_string(),
            acquired_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs()),
        }
    }
}

impl fmt::Display for LockOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {} ({})", self.pid, self.owner)
    }
}

/// A held install lock. Released when dropped.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
    stale_owner: Option<LockOwner>,
}

impl InstallLock {
    /// Acquires the lock at `path` according to `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::LockContention`] if the lock is held and the policy
    /// gives up, [`SdkError::Cancelled`] if `cancel` fires while waiting, and
    /// [`SdkError::Io`] if the lock file cannot be used.
    pub async fn acquire(
        path: &Path,
        owner: &str,
        policy: LockPolicy,
        cancel: &CancellationToken,
    ) -> Result<Self, SdkError> {
        let started = Instant::now();
        loop {
            if cancel.is_cancelled() {
                return Err(SdkError::Cancelled);
            }
            if let Some(lock) = Self::try_acquire(path, owner)? {
                return Ok(lock);
            }

            let timeout = match policy {
                LockPolicy::FailFast => return Err(contention(path)),
                LockPolicy::Wait { timeout } => timeout,
            };
            if started.elapsed() >= timeout {
                return Err(contention(path));
            }
            debug!(lock = %path.display(), "install lock held, waiting");
            tokio::select! {
                () = cancel.cancelled() => return Err(SdkError::Cancelled),
                () = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }

    /// Makes a single attempt to acquire the lock at `path`.
    ///
    /// Returns `Ok(None)` if another handle holds it.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Io`] if the lock file cannot be created, locked or
    /// written.
    pub fn try_acquire(path: &Path, owner: &str) -> Result<Option<Self>, SdkError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SdkError::io(format!("Failed to create directory: {}", parent.display()), e)
            })?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| SdkError::io(format!("Failed to open lock: {}", path.display()), e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
            Err(err) if is_lock_violation(&err) => return Ok(None),
            Err(err) => {
                return Err(SdkError::io(
                    format!("Failed to lock: {}", path.display()),
                    err,
                ));
            }
        }

        let stale_owner = read_owner(&mut file)
            .map_err(|e| SdkError::io(format!("Failed to read lock: {}", path.display()), e))?;
        if let Some(stale) = &stale_owner {
            warn!(
                lock = %path.display(),
                previous_owner = %stale,
                "recovered install lock from an owner that did not release it"
            );
        }

        write_owner(&mut file, &LockOwner::current(owner))
            .map_err(|e| SdkError::io(format!("Failed to write lock: {}", path.display()), e))?;
        debug!(lock = %path.display(), owner, "acquired install lock");

        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
            stale_owner,
        }))
    }

    /// Path of the lock file.
    #[must_use = "returns the path without side effects"]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The owner record left behind by a holder that died, if any.
    ///
    /// When present, work done under that previous lock must not be trusted.
    #[must_use = "returns the stale owner without side effects"]
    pub fn recovered_stale_owner(&self) -> Option<&LockOwner> {
        self.stale_owner.as_ref()
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.set_len(0) {
            warn!(lock = %self.path.display(), error = %err, "failed to clear lock owner record");
        }
        if let Err(err) = FileExt::unlock(&self.file) {
            warn!(lock = %self.path.display(), error = %err, "failed to release install lock");
        } else {
            debug!(lock = %self.path.display(), "released install lock");
        }
    }
}

fn contention(path: &Path) -> SdkError {
    SdkError::LockContention {
        lock: path.to_path_buf(),
        owner: describe_holder(path),
    }
}

/// Best effort read of the live holder's record. Fails on platforms with
/// mandatory locks, where the description is simply omitted.
fn describe_holder(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    let owner: LockOwner = serde_json::from_str(contents.trim()).ok()?;
    Some(owner.to_string())
}

fn read_owner(file: &mut File) -> std::io::Result<Option<LockOwner>> {
    let mut contents = String::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_string(&mut contents)?;
    let contents = contents.trim();
    if contents.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(contents).unwrap_or_default()))
}

fn write_owner(file: &mut File, owner: &LockOwner) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    serde_json::to_writer(&mut *file, owner)?;
    file.flush()?;
    file.sync_data()
}

/// `ERROR_LOCK_VIOLATION`, reported by Windows for a held lock.
fn is_lock_violation(err: &std::io::Error) -> bool {
    cfg!(windows) && err.raw_os_error() == Some(33)
}
