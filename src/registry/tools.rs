//! External tool invocation with per-attempt timeouts and bounded retries.

use crate::error::{Result, SbomError};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Upper bound on a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// A fully described tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set an environment variable on top of the inherited environment.
    #[must_use]
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Program name as shown in logs and errors.
    #[must_use]
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Printable command line, used for debug logging.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(OsStr::to_string_lossy)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How failed attempts are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each subsequent one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

enum Attempt {
    Done(Vec<u8>),
    Retryable(SbomError),
    Fatal(SbomError),
}

/// Runs external tools, capturing stdout on success.
///
/// Every attempt is bounded by `timeout`; a timed-out child is killed.
/// Non-zero exits and timeouts are retried up to the policy's limit, while
/// a failure to spawn the program at all is reported immediately.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    timeout: Duration,
    retry: RetryPolicy,
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(300), RetryPolicy::default())
    }
}

impl ToolRunner {
    #[must_use]
    pub const fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run `command` to completion and return its stdout.
    pub async fn run(&self, command: &ToolCommand) -> Result<Vec<u8>> {
        let name = command.name();
        let mut last_error = None;

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                tracing::debug!(
                    "Retrying {} (attempt {}/{}) after {:?}",
                    name,
                    attempt + 1,
                    self.retry.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            match self.run_once(command, &name).await {
                Attempt::Done(stdout) => return Ok(stdout),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Retryable(err) => {
                    tracing::debug!("{} attempt {} failed: {}", name, attempt + 1, err);
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| SbomError::subprocess(name, None, "no attempts were made")))
    }

    async fn run_once(&self, command: &ToolCommand, name: &str) -> Attempt {
        tracing::debug!("Running {}", command.display());

        let mut child = Command::new(&command.program);
        child
            .args(&command.args)
            .envs(command.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, child.output()).await {
            Err(_) => Attempt::Retryable(SbomError::subprocess(
                name,
                None,
                format!("timed out after {:?}", self.timeout),
            )),
            Ok(Err(e)) => Attempt::Fatal(SbomError::subprocess(
                name,
                None,
                format!("failed to start {}: {e}", command.program.display()),
            )),
            Ok(Ok(output)) if output.status.success() => Attempt::Done(output.stdout),
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let message = if stderr.is_empty() {
                    "no diagnostic output".to_string()
                } else {
                    stderr
                };
                Attempt::Retryable(SbomError::subprocess(name, output.status.code(), message))
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn runner(timeout_ms: u64, max_retries: u32) -> ToolRunner {
        ToolRunner::new(
            Duration::from_millis(timeout_ms),
            RetryPolicy {
                max_retries,
                backoff: Duration::from_millis(1),
            },
        )
    }

    #[test]
    fn test_backoff_doubles_and_is_capped() {
        let policy = RetryPolicy {
            max_retries: 5,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(40), MAX_BACKOFF);
    }

    #[test]
    fn test_command_display_and_name() {
        let cmd = ToolCommand::new("/usr/bin/oras")
            .args(["manifest", "fetch"])
            .arg("quay.io/a@sha256:aa");
        assert_eq!(cmd.name(), "oras");
        assert_eq!(cmd.display(), "/usr/bin/oras manifest fetch quay.io/a@sha256:aa");
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let cmd = ToolCommand::new("sh").args(["-c", "printf '{\"ok\":true}'"]);
        let stdout = runner(5_000, 0).run(&cmd).await.expect("command succeeds");
        assert_eq!(stdout, br#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_passes_environment() {
        let cmd = ToolCommand::new("sh")
            .args(["-c", "printf '%s' \"$DOCKER_CONFIG\""])
            .env("DOCKER_CONFIG", "/tmp/scoped");
        let stdout = runner(5_000, 0).run(&cmd).await.expect("command succeeds");
        assert_eq!(stdout, b"/tmp/scoped");
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr_and_status() {
        let cmd = ToolCommand::new("sh").args(["-c", "echo 'manifest unknown' >&2; exit 3"]);
        let err = runner(5_000, 1).run(&cmd).await.expect_err("command fails");
        match err {
            SbomError::Subprocess {
                program,
                status,
                message,
            } => {
                assert_eq!(program, "sh");
                assert_eq!(status, Some(3));
                assert_eq!(message, "manifest unknown");
            }
            other => panic!("Expected Subprocess error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let dir = tempfile::tempdir().expect("temp dir");
        let marker = dir.path().join("attempted");
        // Fails on the first run, succeeds once the marker exists.
        let script = format!(
            "if [ -e '{0}' ]; then printf done; else touch '{0}'; exit 1; fi",
            marker.display()
        );
        let cmd = ToolCommand::new("sh").args(["-c", script.as_str()]);

        let stdout = runner(5_000, 2).run(&cmd).await.expect("second attempt succeeds");
        assert_eq!(stdout, b"done");
    }

    #[tokio::test]
    async fn test_timeout_is_a_subprocess_error() {
        let cmd = ToolCommand::new("sleep").arg("5");
        let err = runner(50, 0).run(&cmd).await.expect_err("times out");
        assert_eq!(err.kind_name(), "subprocess");
        assert!(err.to_string().contains("timed out"), "{err}");
    }

    #[tokio::test]
    async fn test_missing_program_fails_without_retry() {
        let cmd = ToolCommand::new("/nonexistent/definitely-not-a-tool");
        let err = runner(5_000, 3).run(&cmd).await.expect_err("spawn fails");
        assert!(err.to_string().contains("failed to start"), "{err}");
    }
}
