//! Description of a single external process run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An external command to run, consumed by value exactly once.
///
/// The command is an argument vector: the first element is the program, the
/// rest are passed verbatim. No shell is involved, so metacharacters in
/// arguments carry no special meaning.
///
/// Environment overrides are layered on top of the inherited environment.
/// See [`ProcessExecutor`](crate::ProcessExecutor) for the merge order.
///
/// # Example
///
/// ```
/// use managed_sdk_process::ProcessInvocation;
/// use std::time::Duration;
///
/// let invocation = ProcessInvocation::new(["gcloud", "components", "list"])
///     .env("CLOUDSDK_CORE_DISABLE_PROMPTS", "1")
///     .with_timeout(Duration::from_secs(60));
/// assert_eq!(invocation.timeout(), Some(Duration::from_secs(60)));
/// assert_eq!(invocation.program(), Some("gcloud"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    command: Vec<String>,
    working_directory: Option<PathBuf>,
    environment: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl ProcessInvocation {
    /// Creates an invocation from an argument vector.
    #[must_use]
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            working_directory: None,
            environment: BTreeMap::new(),
            timeout: None,
        }
    }

    /// Sets the working directory of the child process.
    #[must_use]
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Adds one environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Adds several environment overrides. Later entries win.
    #[must_use]
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets a wall-clock timeout for the run.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the timeout only if none was configured yet.
    #[must_use]
    pub fn default_timeout(mut self, timeout: Option<Duration>) -> Self {
        if self.timeout.is_none() {
            self.timeout = timeout;
        }
        self
    }

    /// Returns the program, if the command is not empty.
    #[must_use = "returns the program without side effects"]
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Returns the arguments following the program.
    #[must_use = "returns the arguments without side effects"]
    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }

    /// Returns the full argument vector.
    #[must_use = "returns the command without side effects"]
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Returns the configured working directory.
    #[must_use = "returns the directory without side effects"]
    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    /// Returns the environment overrides.
    #[must_use = "returns the overrides without side effects"]
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Returns the configured timeout.
    #[must_use = "returns the timeout without side effects"]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_and_args_split_the_command() {
        let invocation = ProcessInvocation::new(["gcloud", "components", "list"]);
        assert_eq!(invocation.program(), Some("gcloud"));
        assert_eq!(invocation.args(), ["components", "list"]);
    }

    #[test]
    fn empty_command_has_no_program() {
        let invocation = ProcessInvocation::new(Vec::<String>::new());
        assert_eq!(invocation.program(), None);
        assert!(invocation.args().is_empty());
    }

    #[test]
    fn later_env_overrides_win() {
        let invocation = ProcessInvocation::new(["true"])
            .env("KEY", "first")
            .envs([("KEY", "second"), ("OTHER", "x")]);
        assert_eq!(invocation.environment().get("KEY").unwrap(), "second");
        assert_eq!(invocation.environment().len(), 2);
    }

    #[test]
    fn working_directory_and_timeout_start_unset() {
        let invocation = ProcessInvocation::new(["true"]);
        assert_eq!(invocation.working_directory(), None);
        assert_eq!(invocation.timeout(), None);

        let invocation = invocation.with_working_directory("/opt/sdk");
        assert_eq!(invocation.working_directory(), Some(Path::new("/opt/sdk")));
    }

    #[test]
    fn default_timeout_does_not_replace_explicit_timeout() {
        let invocation = ProcessInvocation::new(["true"])
            .with_timeout(Duration::from_secs(5))
            .default_timeout(Some(Duration::from_secs(60)));
        assert_eq!(invocation.timeout(), Some(Duration::from_secs(5)));

        let invocation =
            ProcessInvocation::new(["true"]).default_timeout(Some(Duration::from_secs(60)));
        assert_eq!(invocation.timeout(), Some(Duration::from_secs(60)));
    }
}
