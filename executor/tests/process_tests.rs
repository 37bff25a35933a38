//! The executor driving a real child process.
//!
//! `sh -c <script>` stands in for the node binary; the connection flags the
//! executor appends land in the script's positional parameters.

#![cfg(unix)]

use std::sync::Arc;

use rmr_executor::{CommandExecutor, ExecError, ProcessRunner};
use rmr_types::HarnessConfig;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn executor(config: &HarnessConfig) -> CommandExecutor {
    CommandExecutor::new(Arc::new(ProcessRunner::new("sh")), config)
}

fn script(body: &str) -> Vec<String> {
    vec!["-c".to_string(), body.to_string()]
}

fn fast_config() -> HarnessConfig {
    HarnessConfig {
        backoff_base_ms: 10,
        command_timeout_secs: 1,
        ..HarnessConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_stdout_is_parsed() {
    let exec = executor(&fast_config());
    let value = exec
        .execute(&script("printf '{\"code\":0,\"txhash\":\"AB\"}'"))
        .await
        .unwrap();
    assert_eq!(value, json!({ "code": 0, "txhash": "AB" }));
}

#[tokio::test]
async fn connection_flags_reach_the_process() {
    let exec = executor(&fast_config());
    // $0 is the first appended flag, the rest follow in $@
    let value = exec.execute(&script("echo \"$0 $@\"")).await.unwrap();
    let line = value["output"].as_str().unwrap();
    assert!(line.starts_with("--chain-id injective-1 --node tcp://localhost:26657"));
    assert!(line.ends_with("--yes --output json"));
}

#[tokio::test]
async fn non_zero_exit_exhausts_retries() {
    let exec = executor(&fast_config());
    let err = exec
        .execute(&script("echo 'account sequence mismatch' >&2; exit 2"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::Failed { attempts: 3, code: Some(2), .. }));
    assert!(err.to_string().contains("account sequence mismatch"));
}

#[tokio::test]
async fn hung_process_times_out() {
    let exec = executor(&fast_config());
    let err = exec
        .execute_with_retries(&script("sleep 10"), 1)
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.attempts(), 1);
}
