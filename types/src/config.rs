//! Harness configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ConfigError;

/// Everything the harness needs to talk to a node and pace its waits.
///
/// Built once (from a TOML file, from CLI flags, or programmatically in
/// tests) and passed by reference into every component.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Node CLI binary to invoke.
    #[serde(default = "default_binary")]
    pub binary: String,

    #[serde(default = "default_chain_id")]
    pub chain_id: String,

    /// Tendermint RPC endpoint passed as `--node`.
    #[serde(default = "default_node_url")]
    pub node_url: String,

    #[serde(default = "default_grpc_url")]
    pub grpc_url: String,

    #[serde(default = "default_keyring_backend")]
    pub keyring_backend: String,

    /// Per-invocation process timeout in seconds.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Attempts per CLI invocation before giving up.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// First backoff delay in milliseconds; doubles on every retry.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// How long to wait for a proposal to reach a terminal status.
    #[serde(default = "default_proposal_timeout_secs")]
    pub proposal_timeout_secs: u64,

    /// Wait between submitting a proposal and voting on it.
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,

    #[serde(default = "default_block_time_secs")]
    pub block_time_secs: u64,

    /// Blocks to wait after an admin update before reading it back.
    #[serde(default = "default_update_settle_blocks")]
    pub update_settle_blocks: u64,

    /// Wait between a passed launch proposal and the market being queryable.
    #[serde(default = "default_market_creation_delay_secs")]
    pub market_creation_delay_secs: u64,

    #[serde(default = "default_testcandidate_key")]
    pub testcandidate_key: String,

    #[serde(default = "default_validator_key")]
    pub validator_key: String,

    /// Key used for proposal submission and admin updates.
    #[serde(default = "default_admin_key")]
    pub admin_key: String,

    #[serde(default = "default_imr")]
    pub default_imr: f64,

    #[serde(default = "default_mmr")]
    pub default_mmr: f64,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_binary() -> String {
    "injectived".to_string()
}

fn default_chain_id() -> String {
    "injective-1".to_string()
}

fn default_node_url() -> String {
    "tcp://localhost:26657".to_string()
}

fn default_grpc_url() -> String {
    "localhost:9900".to_string()
}

fn default_keyring_backend() -> String {
    "test".to_string()
}

fn default_command_timeout_secs() -> u64 {
    300
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_proposal_timeout_secs() -> u64 {
    60
}

fn default_settle_delay_secs() -> u64 {
    5
}

fn default_block_time_secs() -> u64 {
    3
}

fn default_update_settle_blocks() -> u64 {
    2
}

fn default_market_creation_delay_secs() -> u64 {
    10
}

fn default_testcandidate_key() -> String {
    "testcandidate".to_string()
}

fn default_validator_key() -> String {
    "val".to_string()
}

fn default_admin_key() -> String {
    "testcandidate".to_string()
}

fn default_imr() -> f64 {
    0.05
}

fn default_mmr() -> f64 {
    0.03
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl HarnessConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("HarnessConfig is always serializable to TOML")
    }

    /// Flags appended to every CLI invocation.
    pub fn base_args(&self) -> Vec<String> {
        vec![
            "--chain-id".to_string(),
            self.chain_id.clone(),
            "--node".to_string(),
            self.node_url.clone(),
            "--keyring-backend".to_string(),
            self.keyring_backend.clone(),
            "--yes".to_string(),
            "--output".to_string(),
            "json".to_string(),
        ]
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn proposal_timeout(&self) -> Duration {
        Duration::from_secs(self.proposal_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn block_time(&self) -> Duration {
        Duration::from_secs(self.block_time_secs)
    }

    pub fn market_creation_delay(&self) -> Duration {
        Duration::from_secs(self.market_creation_delay_secs)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            chain_id: default_chain_id(),
            node_url: default_node_url(),
            grpc_url: default_grpc_url(),
            keyring_backend: default_keyring_backend(),
            command_timeout_secs: default_command_timeout_secs(),
            retries: default_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            poll_interval_secs: default_poll_interval_secs(),
            proposal_timeout_secs: default_proposal_timeout_secs(),
            settle_delay_secs: default_settle_delay_secs(),
            block_time_secs: default_block_time_secs(),
            update_settle_blocks: default_update_settle_blocks(),
            market_creation_delay_secs: default_market_creation_delay_secs(),
            testcandidate_key: default_testcandidate_key(),
            validator_key: default_validator_key(),
            admin_key: default_admin_key(),
            default_imr: default_imr(),
            default_mmr: default_mmr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = HarnessConfig::default();
        let toml_str = config.to_toml_string();
        let parsed = HarnessConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.chain_id, config.chain_id);
        assert_eq!(parsed.retries, config.retries);
        assert_eq!(parsed.default_imr, config.default_imr);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = HarnessConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.binary, "injectived");
        assert_eq!(config.node_url, "tcp://localhost:26657");
        assert_eq!(config.validator_key, "val");
        assert_eq!(config.admin_key, "testcandidate");
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            chain_id = "injective-777"
            retries = 5
            default_mmr = 0.02
        "#;
        let config = HarnessConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.chain_id, "injective-777");
        assert_eq!(config.retries, 5);
        assert_eq!(config.default_mmr, 0.02);
        assert_eq!(config.default_imr, 0.05);
    }

    #[test]
    fn base_args_carry_connection_and_output_flags() {
        let config = HarnessConfig::default();
        assert_eq!(
            config.base_args(),
            vec![
                "--chain-id",
                "injective-1",
                "--node",
                "tcp://localhost:26657",
                "--keyring-backend",
                "test",
                "--yes",
                "--output",
                "json",
            ]
        );
    }

    #[test]
    fn missing_file_returns_read_error() {
        let result = HarnessConfig::from_toml_file("/nonexistent/rmr.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
