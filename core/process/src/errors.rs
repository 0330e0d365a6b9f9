//! Error types for process execution.
//!
//! Two layers are modelled separately. [`ProcessError`] covers everything that
//! can go wrong while launching a child and draining its output. A non-zero
//! exit code is *not* a `ProcessError`; the executor hands it back to the
//! caller. [`CommandError`] is produced by the command layer, which does judge
//! exit codes in capture mode.

use std::time::Duration;
use thiserror::Error;

/// Failure while launching, draining, or terminating an external process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The invocation had no program to run.
    #[error("cannot run an empty command")]
    EmptyCommand,

    /// The binary could not be started (missing, not executable, ...).
    #[error("failed to launch '{program}': {source}")]
    Launch {
        /// Program that was being started.
        program: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// Reading a stream or waiting on the child failed.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The wall-clock timeout elapsed and the process tree was terminated.
    #[error("process timed out after {timeout:?}")]
    TimedOut {
        /// The configured timeout.
        timeout: Duration,
    },

    /// Cancellation was requested and the process tree was terminated.
    #[error("process was cancelled")]
    Cancelled,
}

impl ProcessError {
    /// Creates a new `Launch` error.
    #[must_use]
    pub fn launch(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Launch {
            program: program.into(),
            source,
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

    /// Returns `true` for outcomes that aborted the run on purpose
    /// (timeout or cancellation) rather than through a fault.
    #[must_use = "returns classification without side effects"]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::TimedOut { .. } | Self::Cancelled)
    }
}

/// Failure reported by [`CommandExecutor`](crate::CommandExecutor).
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process ran to completion but exited with a non-zero code.
    ///
    /// `stderr` holds the captured standard error. It is empty when the
    /// command ran in stream mode, where stderr went to a listener instead.
    #[error("process exited with non-zero exit code: {exit_code}")]
    NonZeroExit {
        /// The exit code, surfaced verbatim.
        exit_code: i32,
        /// Captured standard error text.
        stderr: String,
    },

    /// The process could not be run or its output could not be read.
    #[error("command execution failed: {0}")]
    Execution(#[from] ProcessError),
}

impl CommandError {
    /// Creates a new `NonZeroExit` error.
    #[must_use]
    pub fn non_zero_exit(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::NonZeroExit {
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Returns the exit code if the process ran to completion.
    #[must_use = "returns the exit code without side effects"]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { exit_code, .. } => Some(*exit_code),
            Self::Execution(_) => None,
        }
    }

    /// Whether running the same command again may reasonably succeed.
    ///
    /// Launch failures and stream faults are treated as fatal.
    #[must_use = "returns classification without side effects"]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NonZeroExit { .. } => true,
            Self::Execution(err) => err.is_interrupted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn launch_error_displays_program() {
        let err = ProcessError::launch("gcloud", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.to_string().starts_with("failed to launch 'gcloud'"));
    }

    #[test]
    fn timed_out_displays_duration() {
        let err = ProcessError::TimedOut {
            timeout: Duration::from_secs(3),
        };
        assert_eq!(err.to_string(), "process timed out after 3s");
    }

    #[test]
    fn non_zero_exit_displays_code() {
        let err = CommandError::non_zero_exit(2, "boom");
        assert_eq!(err.to_string(), "process exited with non-zero exit code: 2");
        assert_eq!(err.exit_code(), Some(2));
    }

    #[test]
    fn interrupted_outcomes_are_retryable() {
        assert!(CommandError::from(ProcessError::Cancelled).is_retryable());
        assert!(
            CommandError::from(ProcessError::TimedOut {
                timeout: Duration::from_secs(1)
            })
            .is_retryable()
        );
        assert!(CommandError::non_zero_exit(1, "").is_retryable());
    }

    #[test]
    fn launch_and_io_failures_are_not_retryable() {
        let launch = CommandError::from(ProcessError::launch(
            "missing",
            io::Error::from(io::ErrorKind::NotFound),
        ));
        let io_fault = CommandError::from(ProcessError::io(
            "reading stdout",
            io::Error::from(io::ErrorKind::BrokenPipe),
        ));
        assert!(!launch.is_retryable());
        assert!(!io_fault.is_retryable());
        assert_eq!(launch.exit_code(), None);
    }
}
