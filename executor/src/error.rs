use std::time::Duration;
use thiserror::Error;

/// A single process invocation that did not produce an exit status.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("command timed out after {0:?}")]
    TimedOut(Duration),

    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },
}

/// A CLI call that failed on every attempt. Describes the last attempt.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("command failed ({}) after {attempts} attempt(s): {stderr}", describe_code(.code))]
    Failed {
        attempts: u32,
        code: Option<i32>,
        stderr: String,
    },

    #[error("command timed out after {timeout:?} ({attempts} attempt(s))")]
    TimedOut { attempts: u32, timeout: Duration },

    #[error("failed to launch command after {attempts} attempt(s): {reason}")]
    Spawn { attempts: u32, reason: String },
}

impl ExecError {
    pub fn attempts(&self) -> u32 {
        match self {
            ExecError::Failed { attempts, .. }
            | ExecError::TimedOut { attempts, .. }
            | ExecError::Spawn { attempts, .. } => *attempts,
        }
    }

    /// Exit code of the last attempt, when the process exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::Failed { code, .. } => *code,
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecError::TimedOut { .. })
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
