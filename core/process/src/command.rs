//! Command execution modes built on [`ProcessExecutor`].
//!
//! - **capture**: buffer everything, fail on a non-zero exit, return stdout.
//! - **stream**: forward output line by line to listeners and return the exit
//!   code without judging it. Long-running installs can make meaningful
//!   progress before exiting non-zero, so the caller decides.

use tracing::error;

use crate::consumer::StreamConsumer;
use crate::errors::CommandError;
use crate::executor::{CapturedOutput, ProcessExecutor};
use crate::invocation::ProcessInvocation;

/// Runs commands in capture or stream mode.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    executor: ProcessExecutor,
}

impl CommandExecutor {
    /// Creates a command executor on top of `executor`.
    #[must_use]
    pub fn new(executor: ProcessExecutor) -> Self {
        Self { executor }
    }

    /// Returns the underlying process executor.
    #[must_use = "returns the executor without side effects"]
    pub fn process_executor(&self) -> &ProcessExecutor {
        &self.executor
    }

    /// Runs `invocation` and returns its standard output verbatim.
    ///
    /// The output is not trimmed.
    ///
    /// # Errors
    ///
    /// - [`CommandError::NonZeroExit`] carrying the captured stderr if the
    ///   process exits with a non-zero code
    /// - [`CommandError::Execution`] if the process cannot be launched, a
    ///   stream faults, or the run times out or is cancelled
    pub async fn capture(&self, invocation: ProcessInvocation) -> Result<String, CommandError> {
        let output = self.capture_output(invocation).await?;
        if output.exit_code != 0 {
            error!(
                exit_code = output.exit_code,
                stderr = %output.stderr,
                "command exited with non-zero exit code"
            );
            return Err(CommandError::non_zero_exit(output.exit_code, output.stderr));
        }
        Ok(output.stdout)
    }

    /// Runs `invocation` and returns exit code, stdout and stderr without
    /// judging the exit code.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Execution`] if the process cannot be run to
    /// completion.
    pub async fn capture_output(
        &self,
        invocation: ProcessInvocation,
    ) -> Result<CapturedOutput, CommandError> {
        let output = self
            .executor
            .run(
                invocation,
                StreamConsumer::accumulate(),
                StreamConsumer::accumulate(),
            )
            .await?;
        Ok(output)
    }

    /// Runs `invocation`, forwarding each output line to the listeners as it
    /// arrives, and returns the exit code.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Execution`] if the process cannot be run to
    /// completion. A non-zero exit code is *not* an error here.
    pub async fn stream<O, E>(
        &self,
        invocation: ProcessInvocation,
        out_listener: O,
        err_listener: E,
    ) -> Result<i32, CommandError>
    where
        O: Fn(&str) + Send + Sync + 'static,
        E: Fn(&str) + Send + Sync + 'static,
    {
        let output = self
            .executor
            .run(
                invocation,
                StreamConsumer::forward(out_listener),
                StreamConsumer::forward(err_listener),
            )
            .await?;
        Ok(output.exit_code)
    }
}

impl From<ProcessExecutor> for CommandExecutor {
    fn from(executor: ProcessExecutor) -> Self {
        Self::new(executor)
    }
}
