//! The process boundary.
//!
//! [`CommandRunner`] is the seam between the harness and the outside world.
//! Production code uses [`ProcessRunner`]; tests swap in the nullables from
//! `rmr-nullables`.

use crate::error::RunError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;

/// What a finished process left behind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs one invocation of the node binary.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Program name, for logs.
    fn program(&self) -> &str;

    /// Run with `args` and wait at most `timeout` for it to exit.
    async fn run(&self, args: &[String], timeout: Duration) -> Result<CommandOutput, RunError>;
}

/// Spawns the real binary with `tokio::process`.
///
/// The child is killed if the timeout elapses first.
pub struct ProcessRunner {
    program: String,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, args: &[String], timeout: Duration) -> Result<CommandOutput, RunError> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(RunError::Spawn {
                    program: self.program.clone(),
                    reason: e.to_string(),
                })
            }
            Err(_) => return Err(RunError::TimedOut(timeout)),
        };

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let runner = ProcessRunner::new("sh");
        let output = runner
            .run(&sh("printf '{\"ok\":true}'"), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(output.is_success());
        assert_eq!(output.stdout, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn captures_failure_stderr() {
        let runner = ProcessRunner::new("sh");
        let output = runner
            .run(&sh("echo boom >&2; exit 3"), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stderr.trim(), "boom");
    }

    #[tokio::test]
    async fn slow_process_times_out() {
        let runner = ProcessRunner::new("sh");
        let result = runner.run(&sh("sleep 5"), Duration::from_millis(100)).await;
        assert!(matches!(result, Err(RunError::TimedOut(_))));
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let runner = ProcessRunner::new("/nonexistent/injectived");
        let result = runner.run(&[], Duration::from_secs(1)).await;
        assert!(matches!(result, Err(RunError::Spawn { .. })));
    }
}
