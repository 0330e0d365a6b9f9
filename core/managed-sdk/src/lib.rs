#![warn(clippy::pedantic)]

//! # Managed SDK
//!
//! Keeps a locally managed copy of the Google Cloud SDK (or another SDK with
//! the same layout) installed, verified and up to date, and runs its
//! commands.
//!
//! ## Directory Structure
//!
//! ```text
//! <managed root>/
//!   downloads/<version>/       # archives staged during install
//!   LATEST/                    # floating version, updated in place
//!     .install.lock
//!     google-cloud-sdk/
//!   191.0.0/                   # fixed versions, never updated
//!     .install.lock
//!     google-cloud-sdk/
//! ```
//!
//! ## Modules
//!
//! - [`archive`]: tar.gz and ZIP extraction with path traversal protection
//! - [`ManagedSdk`]: installed-state queries, install, update and components
//! - [`InstallLock`]: cross-process mutual exclusion per version directory
//! - [`ArchiveSource`]: the byte stream an install reads from
//!
//! Process execution lives in the `managed-sdk-process` crate, re-exported
//! here as [`process`].

pub mod archive;
mod components;
mod config;
mod errors;
mod lock;
mod paths;
mod platform;
mod sdk;
mod source;
mod version;

pub use managed_sdk_process as process;
pub use managed_sdk_process::{CancellationToken, LineListener};

pub use archive::{ArchiveKind, ExtractorListener, ExtractorProvider};
pub use components::{ComponentState, SdkComponent, UPDATE_AVAILABLE, parse_component_list};
pub use config::{DEFAULT_USER_AGENT, LockPolicy, ManagedSdkConfig, SdkProfile};
pub use errors::{ExtractError, SdkError};
pub use lock::{InstallLock, LockOwner};
pub use paths::{EnvSnapshot, MANAGED_SDK_HOME_ENV, SdkPaths, resolve_managed_sdk_root};
pub use platform::{Architecture, OsFamily, OsProfile};
pub use sdk::{InstallOutcome, InstallState, ManagedSdk};
pub use source::{ArchiveSource, ArchiveStream, FileArchiveSource, download_url};
pub use version::{LATEST, Version};
