//! External process execution with concurrent output draining.
//!
//! [`ProcessExecutor::run`] spawns the child, hands both pipes to their
//! consumers *before* waiting for termination, and joins the wait and both
//! drains at one point. Waiting first can deadlock: a child that fills the OS
//! pipe buffer of a stream nobody reads blocks forever.
//!
//! ## Environment merge order
//!
//! 1. the environment inherited from the current process,
//! 2. the executor's base entries ([`ProcessExecutor::with_environment`]),
//! 3. the invocation's own overrides.
//!
//! A later layer replaces a key set by an earlier one.
//!
//! ## Termination
//!
//! A timeout or a cancellation request kills the whole process tree (on Unix
//! the child leads its own process group) and ends both drains as a normal
//! end-of-stream. Both outcomes are reported as distinct [`ProcessError`]
//! variants rather than I/O failures.
//!
//! The timeout bounds the whole run, output included: a leader that exited
//! while a descendant still holds one of its pipes open is interrupted too.

use std::collections::BTreeMap;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::consumer::StreamConsumer;
use crate::errors::ProcessError;
use crate::invocation::ProcessInvocation;

/// Exit code reported for a process that was terminated by a signal.
pub const SIGNALED_EXIT_CODE: i32 = -1;

/// Result of one completed process run.
///
/// `stdout` / `stderr` are empty for streams drained in forward mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Exit code of the process, surfaced verbatim.
    pub exit_code: i32,
    /// Accumulated standard output.
    pub stdout: String,
    /// Accumulated standard error.
    pub stderr: String,
}

impl CapturedOutput {
    /// Returns `true` if the process exited with code 0.
    #[must_use = "returns the status without side effects"]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external processes.
///
/// The executor owns a [`CancellationToken`]; cancelling it terminates every
/// run in flight and makes later runs fail with [`ProcessError::Cancelled`].
/// Cloning the executor shares the token.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    base_environment: BTreeMap<String, String>,
    cancel: CancellationToken,
}

enum Interruption {
    TimedOut(Duration),
    Cancelled,
}

impl ProcessExecutor {
    /// Creates an executor with no base environment and a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds environment entries applied to every run before the invocation's
    /// own overrides.
    #[must_use]
    pub fn with_environment<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.base_environment
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Uses `token` for cooperative cancellation instead of a private one.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the token that cancels runs of this executor.
    #[must_use = "returns the token without side effects"]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Requests cancellation of all runs, current and future.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once cancellation was requested.
    #[must_use = "returns the state without side effects"]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `invocation`, draining stdout and stderr with the given consumers.
    ///
    /// A non-zero exit code is returned in [`CapturedOutput::exit_code`], not
    /// raised. A process killed by a signal reports [`SIGNALED_EXIT_CODE`].
    ///
    /// # Errors
    ///
    /// - [`ProcessError::EmptyCommand`] if the invocation has no program
    /// - [`ProcessError::Launch`] if the program cannot be started; no draining
    ///   has begun at that point
    /// - [`ProcessError::Io`] if waiting or reading a stream fails
    /// - [`ProcessError::TimedOut`] if the invocation's timeout elapsed
    /// - [`ProcessError::Cancelled`] if cancellation was requested
    pub async fn run(
        &self,
        invocation: ProcessInvocation,
        stdout: StreamConsumer,
        stderr: StreamConsumer,
    ) -> Result<CapturedOutput, ProcessError> {
        let Some(program) = invocation.program() else {
            return Err(ProcessError::EmptyCommand);
        };
        if self.cancel.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }

        let mut command = Command::new(program);
        command
            .args(invocation.args())
            .envs(&self.base_environment)
            .envs(invocation.environment())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = invocation.working_directory() {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        debug!(program, args = ?invocation.args(), "launching process");
        let mut child = command
            .spawn()
            .map_err(|e| ProcessError::launch(program, e))?;
        // The leader's pid names its process group even after it is reaped.
        let pid = child.id();

        let (Some(stdout_pipe), Some(stderr_pipe)) = (child.stdout.take(), child.stderr.take())
        else {
            return Err(ProcessError::io(
                format!("output pipes of '{program}' were not captured"),
                io::Error::from(io::ErrorKind::BrokenPipe),
            ));
        };

        let terminate = self.cancel.child_token();
        let stdout_handle = stdout.consume("stdout", stdout_pipe, terminate.clone());
        let stderr_handle = stderr.consume("stderr", stderr_pipe, terminate.clone());

        // Descendants holding a pipe keep a drain open after the leader
        // exits, so the deadline covers the drains as well as the wait.
        let interruption = {
            let completion = async {
                tokio::join!(child.wait(), stdout_handle.get(), stderr_handle.get())
            };
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => Interruption::Cancelled,
                timeout = deadline(invocation.timeout()) => Interruption::TimedOut(timeout),
                (status, stdout_text, stderr_text) = completion => {
                    let status = status.map_err(|e| {
                        ProcessError::io(format!("failed to wait for '{program}'"), e)
                    })?;
                    let exit_code = status.code().unwrap_or(SIGNALED_EXIT_CODE);
                    debug!(program, exit_code, "process exited");
                    return Ok(CapturedOutput {
                        exit_code,
                        stdout: stdout_text?,
                        stderr: stderr_text?,
                    });
                }
            }
        };

        terminate_tree(&mut child, pid).await;
        terminate.cancel();
        match interruption {
            Interruption::TimedOut(timeout) => {
                warn!(program, ?timeout, "process timed out and was terminated");
                Err(ProcessError::TimedOut { timeout })
            }
            Interruption::Cancelled => {
                warn!(program, "process cancelled and terminated");
                Err(ProcessError::Cancelled)
            }
        }
    }
}

/// Resolves once `timeout` has elapsed, or never without one.
async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(timeout) => {
            tokio::time::sleep(timeout).await;
            timeout
        }
        None => std::future::pending().await,
    }
}

/// Kills the process group led by `pid`, then the child itself.
///
/// The group is signalled even when the leader already exited.
async fn terminate_tree(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        #[allow(clippy::cast_possible_wrap)]
        let group = Pid::from_raw(pid as i32);
        if let Err(e) = killpg(group, Signal::SIGKILL) {
            debug!(pid, error = %e, "failed to signal process group");
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.kill().await {
        debug!(error = %e, "failed to kill child process");
    }
}
