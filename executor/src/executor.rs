//! The single chokepoint for CLI calls: base args, output parsing, retry.

use crate::error::{ExecError, RunError};
use crate::runner::CommandRunner;
use rmr_types::HarnessConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Runs node CLI commands with the harness-wide flags and retry policy.
///
/// Attempt `n` (0-indexed) that fails is followed by a sleep of
/// `backoff_base * 2^n` before the next attempt; the last attempt is not
/// followed by a sleep.
pub struct CommandExecutor {
    runner: Arc<dyn CommandRunner>,
    base_args: Vec<String>,
    timeout: Duration,
    retries: u32,
    backoff_base: Duration,
}

impl CommandExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &HarnessConfig) -> Self {
        Self {
            runner,
            base_args: config.base_args(),
            timeout: config.command_timeout(),
            retries: config.retries,
            backoff_base: config.backoff_base(),
        }
    }

    /// Delay slept after failed attempt `attempt` (0-indexed).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Execute with the configured number of attempts.
    pub async fn execute(&self, args: &[String]) -> Result<Value, ExecError> {
        self.execute_with_retries(args, self.retries).await
    }

    /// Execute with at most `retries` attempts in total (at least one).
    pub async fn execute_with_retries(
        &self,
        args: &[String],
        retries: u32,
    ) -> Result<Value, ExecError> {
        let attempts = retries.max(1);
        let full_args: Vec<String> = args.iter().chain(self.base_args.iter()).cloned().collect();
        let rendered = format!("{} {}", self.runner.program(), full_args.join(" "));

        let mut attempt = 0;
        loop {
            info!(attempt = attempt + 1, command = %rendered, "executing command");

            let err = match self.runner.run(&full_args, self.timeout).await {
                Ok(output) if output.is_success() => return Ok(parse_output(&output.stdout)),
                Ok(output) => {
                    error!(
                        attempt = attempt + 1,
                        code = ?output.code,
                        stderr = %output.stderr.trim(),
                        "command failed"
                    );
                    ExecError::Failed {
                        attempts: attempt + 1,
                        code: output.code,
                        stderr: output.stderr,
                    }
                }
                Err(RunError::TimedOut(timeout)) => {
                    error!(attempt = attempt + 1, ?timeout, "command timed out");
                    ExecError::TimedOut {
                        attempts: attempt + 1,
                        timeout,
                    }
                }
                Err(e @ RunError::Spawn { .. }) => {
                    error!(attempt = attempt + 1, error = %e, "unexpected error running command");
                    ExecError::Spawn {
                        attempts: attempt + 1,
                        reason: e.to_string(),
                    }
                }
            };

            if attempt + 1 >= attempts {
                return Err(err);
            }

            let delay = self.backoff_delay(attempt);
            warn!(attempt = attempt + 1, ?delay, "retrying after backoff");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Interpret the stdout of a successful command.
///
/// Empty output becomes `{"success": true}`, JSON is parsed, and anything
/// else is wrapped as `{"output": "<text>"}`.
pub fn parse_output(stdout: &str) -> Value {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return json!({ "success": true });
    }
    match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => json!({ "output": trimmed }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays canned outcomes and records when each attempt happened.
    struct Replay {
        outcomes: Mutex<VecDeque<Result<CommandOutput, RunError>>>,
        calls: Mutex<Vec<(Vec<String>, Instant)>>,
    }

    impl Replay {
        fn new(outcomes: Vec<Result<CommandOutput, RunError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }
    }

    #[async_trait]
    impl CommandRunner for Replay {
        fn program(&self) -> &str {
            "injectived"
        }

        async fn run(&self, args: &[String], _timeout: Duration) -> Result<CommandOutput, RunError> {
            self.calls
                .lock()
                .unwrap()
                .push((args.to_vec(), Instant::now()));
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(CommandOutput::failure(1, "exhausted")))
        }
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn executor(runner: Arc<Replay>) -> CommandExecutor {
        CommandExecutor::new(runner, &HarnessConfig::default())
    }

    #[test]
    fn parse_output_shapes() {
        assert_eq!(parse_output(""), json!({ "success": true }));
        assert_eq!(parse_output("  \n"), json!({ "success": true }));
        assert_eq!(parse_output("{\"code\":0}"), json!({ "code": 0 }));
        assert_eq!(
            parse_output("inj1testcandidate\n"),
            json!({ "output": "inj1testcandidate" })
        );
        assert_eq!(parse_output("{not json"), json!({ "output": "{not json" }));
    }

    #[test]
    fn backoff_doubles() {
        let exec = executor(Replay::new(vec![]));
        assert_eq!(exec.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(exec.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(exec.backoff_delay(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn appends_base_args() {
        let runner = Replay::new(vec![Ok(CommandOutput::success("{}"))]);
        let exec = executor(runner.clone());
        exec.execute(&args(&["query", "block"])).await.unwrap();

        let calls = runner.calls.lock().unwrap();
        let sent = &calls[0].0;
        assert_eq!(&sent[..2], &["query".to_string(), "block".to_string()]);
        assert_eq!(&sent[2..], HarnessConfig::default().base_args().as_slice());
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_two_failures_with_escalating_backoff() {
        let runner = Replay::new(vec![
            Ok(CommandOutput::failure(1, "connection refused")),
            Err(RunError::TimedOut(Duration::from_secs(300))),
            Ok(CommandOutput::success("{\"code\":0}")),
        ]);
        let exec = executor(runner.clone());

        let start = Instant::now();
        let value = exec.execute_with_retries(&args(&["query", "block"]), 3).await.unwrap();
        assert_eq!(value, json!({ "code": 0 }));
        assert_eq!(start.elapsed(), Duration::from_secs(3));

        let times = runner.call_times();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_secs(1));
        assert_eq!(times[2] - times[1], Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_exactly_three_attempts() {
        let runner = Replay::new(vec![
            Ok(CommandOutput::failure(1, "first")),
            Ok(CommandOutput::failure(1, "second")),
            Ok(CommandOutput::failure(2, "third")),
            Ok(CommandOutput::success("{}")),
        ]);
        let exec = executor(runner.clone());

        let err = exec
            .execute_with_retries(&args(&["query", "block"]), 3)
            .await
            .unwrap_err();
        assert_eq!(runner.call_times().len(), 3);
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.exit_code(), Some(2));
        assert!(err.to_string().contains("third"));
        assert!(err.to_string().contains("exit code 2"));
    }

    #[tokio::test(start_paused = true)]
    async fn last_timeout_is_reported_as_timeout() {
        let runner = Replay::new(vec![
            Ok(CommandOutput::failure(1, "flaky")),
            Err(RunError::TimedOut(Duration::from_secs(300))),
        ]);
        let exec = executor(runner);
        let err = exec
            .execute_with_retries(&args(&["query", "block"]), 2)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.exit_code(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_errors_are_retried_like_failures() {
        let runner = Replay::new(vec![
            Err(RunError::Spawn {
                program: "injectived".into(),
                reason: "not found".into(),
            }),
            Ok(CommandOutput::success("")),
        ]);
        let exec = executor(runner);
        let value = exec.execute(&args(&["keys", "show", "val"])).await.unwrap();
        assert_eq!(value, json!({ "success": true }));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_still_runs_once() {
        let runner = Replay::new(vec![Ok(CommandOutput::failure(1, "nope"))]);
        let exec = executor(runner.clone());

        let start = Instant::now();
        let err = exec
            .execute_with_retries(&args(&["query", "block"]), 0)
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), 1);
        assert_eq!(runner.call_times().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
