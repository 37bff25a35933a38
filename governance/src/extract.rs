//! Pulling the proposal id out of a submit response.
//!
//! Nodes disagree on where the id lands: top-level `events`, events nested
//! under `logs`, or only inside `raw_log` (sometimes JSON, sometimes text).
//! Each location is one [`ProposalIdExtractor`]; an [`ExtractorChain`]
//! tries them in order and the first hit wins.

use crate::proposal::ProposalId;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

const SUBMIT_EVENT: &str = "submit_proposal";
const ID_ATTRIBUTE: &str = "proposal_id";

static RAW_LOG_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""proposal_id":"(\d+)""#).expect("compile proposal id pattern"));

/// One place a proposal id may be found.
pub trait ProposalIdExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, response: &Value) -> Option<String>;
}

/// Attribute of a typed event in the top-level `events` list.
pub struct EventAttribute {
    pub event_type: &'static str,
    pub key: &'static str,
}

impl Default for EventAttribute {
    fn default() -> Self {
        Self {
            event_type: SUBMIT_EVENT,
            key: ID_ATTRIBUTE,
        }
    }
}

impl ProposalIdExtractor for EventAttribute {
    fn name(&self) -> &'static str {
        "events"
    }

    fn extract(&self, response: &Value) -> Option<String> {
        find_in_events(response.get("events")?, self.event_type, self.key)
    }
}

/// Same attribute, inside `logs[].events`.
pub struct LogEventAttribute {
    pub event_type: &'static str,
    pub key: &'static str,
}

impl Default for LogEventAttribute {
    fn default() -> Self {
        Self {
            event_type: SUBMIT_EVENT,
            key: ID_ATTRIBUTE,
        }
    }
}

impl ProposalIdExtractor for LogEventAttribute {
    fn name(&self) -> &'static str {
        "logs"
    }

    fn extract(&self, response: &Value) -> Option<String> {
        find_in_logs(response.get("logs")?, self.event_type, self.key)
    }
}

/// `raw_log` holding a JSON-encoded `logs` array.
pub struct RawLogJson;

impl ProposalIdExtractor for RawLogJson {
    fn name(&self) -> &'static str {
        "raw_log_json"
    }

    fn extract(&self, response: &Value) -> Option<String> {
        let raw = response.get("raw_log")?.as_str()?;
        let logs: Value = serde_json::from_str(raw).ok()?;
        find_in_logs(&logs, SUBMIT_EVENT, ID_ATTRIBUTE)
    }
}

/// `"proposal_id":"<digits>"` anywhere in `raw_log`.
pub struct RawLogPattern;

impl ProposalIdExtractor for RawLogPattern {
    fn name(&self) -> &'static str {
        "raw_log_pattern"
    }

    fn extract(&self, response: &Value) -> Option<String> {
        let raw = response.get("raw_log")?.as_str()?;
        let captures = RAW_LOG_ID.captures(raw)?;
        Some(captures[1].to_string())
    }
}

/// Ordered list of extraction strategies.
pub struct ExtractorChain {
    strategies: Vec<Box<dyn ProposalIdExtractor>>,
}

impl ExtractorChain {
    pub fn new(strategies: Vec<Box<dyn ProposalIdExtractor>>) -> Self {
        Self { strategies }
    }

    /// Append a strategy tried after the existing ones.
    pub fn with(mut self, strategy: Box<dyn ProposalIdExtractor>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn extract(&self, response: &Value) -> Option<ProposalId> {
        self.strategies.iter().find_map(|strategy| {
            let id = strategy.extract(response)?;
            tracing::debug!(strategy = strategy.name(), proposal_id = %id, "extracted proposal id");
            Some(ProposalId::new(id))
        })
    }
}

impl Default for ExtractorChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(EventAttribute::default()),
            Box::new(LogEventAttribute::default()),
            Box::new(RawLogJson),
            Box::new(RawLogPattern),
        ])
    }
}

fn find_in_logs(logs: &Value, event_type: &str, key: &str) -> Option<String> {
    logs.as_array()?
        .iter()
        .find_map(|log| find_in_events(log.get("events")?, event_type, key))
}

fn find_in_events(events: &Value, event_type: &str, key: &str) -> Option<String> {
    events
        .as_array()?
        .iter()
        .filter(|event| event.get("type").and_then(Value::as_str) == Some(event_type))
        .filter_map(|event| event.get("attributes")?.as_array())
        .flatten()
        .find(|attr| attr.get("key").and_then(Value::as_str) == Some(key))
        .and_then(|attr| match attr.get("value")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}
