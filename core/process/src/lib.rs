#![warn(clippy::pedantic)]

//! # Managed SDK process execution
//!
//! Runs external commands without deadlocking on their output.
//!
//! ## Layers
//!
//! - [`StreamConsumer`] drains one output stream in a background task, either
//!   accumulating it or forwarding it line by line.
//! - [`ProcessExecutor`] spawns a child, drains stdout and stderr concurrently
//!   and waits for termination, with optional timeout and cooperative
//!   cancellation.
//! - [`CommandExecutor`] offers *capture* (fail on non-zero exit, return
//!   stdout) and *stream* (forward lines, return the exit code) modes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use managed_sdk_process::{CommandExecutor, ProcessInvocation};
//!
//! # async fn demo() -> Result<(), managed_sdk_process::CommandError> {
//! let commands = CommandExecutor::default();
//! let json = commands
//!     .capture(ProcessInvocation::new(["gcloud", "components", "list", "--format=json"]))
//!     .await?;
//! println!("{json}");
//! # Ok(())
//! # }
//! ```

mod command;
mod consumer;
mod errors;
mod executor;
mod invocation;

pub use command::CommandExecutor;
pub use consumer::{ConsumerHandle, LineListener, StreamConsumer};
pub use errors::{CommandError, ProcessError};
pub use executor::{CapturedOutput, ProcessExecutor, SIGNALED_EXIT_CODE};
pub use invocation::ProcessInvocation;
pub use tokio_util::sync::CancellationToken;
