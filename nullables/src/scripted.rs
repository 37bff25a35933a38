//! Nullable runner: replays canned process outcomes in order.

use async_trait::async_trait;
use rmr_executor::{CommandOutput, CommandRunner, RunError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Returns pre-configured outcomes, one per invocation.
///
/// Once the script runs out every call exits with code 1.
pub struct ScriptedRunner {
    outcomes: Mutex<VecDeque<Result<CommandOutput, RunError>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful invocation printing `value` as JSON.
    pub fn push_json(self, value: Value) -> Self {
        self.push_output(CommandOutput::success(value.to_string()))
    }

    pub fn push_output(self, output: CommandOutput) -> Self {
        self.outcomes.lock().unwrap().push_back(Ok(output));
        self
    }

    pub fn push_failure(self, code: i32, stderr: &str) -> Self {
        self.push_output(CommandOutput::failure(code, stderr))
    }

    pub fn push_timeout(self) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Err(RunError::TimedOut(Duration::from_secs(300))));
        self
    }

    /// Queue the same JSON response `times` times.
    pub fn repeat_json(mut self, value: Value, times: usize) -> Self {
        for _ in 0..times {
            self = self.push_json(value.clone());
        }
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.outcomes.lock().unwrap().len()
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    fn program(&self) -> &str {
        "scripted-injectived"
    }

    async fn run(&self, args: &[String], _timeout: Duration) -> Result<CommandOutput, RunError> {
        self.calls.lock().unwrap().push(args.to_vec());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CommandOutput::failure(1, "Error: no scripted response left")))
    }
}
