//! Nullable chain: an in-memory node behind the CLI surface.
//!
//! Understands the subcommands `ChainCli` issues, keeps proposals and
//! markets in memory, and answers with the JSON shapes the real binary
//! prints. Proposals resolve deterministically: after a vote, the proposal
//! reports `VOTING_PERIOD` for `polls_before_pass` status queries and then
//! settles on the next one.

use async_trait::async_trait;
use rmr_executor::{CommandOutput, CommandRunner, RunError};
use rmr_types::{parse_stored, validate};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

pub const STATUS_VOTING: &str = "PROPOSAL_STATUS_VOTING_PERIOD";
pub const STATUS_PASSED: &str = "PROPOSAL_STATUS_PASSED";
pub const STATUS_REJECTED: &str = "PROPOSAL_STATUS_REJECTED";
pub const STATUS_FAILED: &str = "PROPOSAL_STATUS_FAILED";

/// Where a submit response carries the new proposal id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseShape {
    /// Top-level `events[]`, plus a JSON `raw_log`.
    #[default]
    Events,
    /// Events nested under `logs[].events`.
    LogsEvents,
    /// Only a JSON-encoded `raw_log`.
    RawLog,
    /// Only free text in `raw_log` containing `"proposal_id":"<id>"`.
    RawLogText,
    /// No id anywhere.
    NoIdentifier,
}

struct NullProposal {
    status: &'static str,
    content: Value,
    vote: Option<String>,
    polls_after_vote: u32,
}

struct ChainState {
    height: u64,
    next_proposal_id: u64,
    tx_counter: u64,
    proposals: BTreeMap<String, NullProposal>,
    markets: BTreeMap<String, Value>,
    accounts: BTreeMap<String, String>,
    admins: BTreeSet<String>,
    polls_before_pass: u32,
    response_shape: ResponseShape,
    pending_failures: u32,
    calls: Vec<Vec<String>>,
}

/// A deterministic stand-in for the node binary.
pub struct NullChain {
    state: Mutex<ChainState>,
}

impl NullChain {
    /// A chain at height 1_000_000 with keys `testcandidate` (admin) and `val`.
    pub fn new() -> Self {
        let mut accounts = BTreeMap::new();
        accounts.insert("testcandidate".to_string(), "inj1testcandidate123456789".to_string());
        accounts.insert("val".to_string(), "inj1validator123456789".to_string());

        let mut admins = BTreeSet::new();
        admins.insert("testcandidate".to_string());

        Self {
            state: Mutex::new(ChainState {
                height: 1_000_000,
                next_proposal_id: 1,
                tx_counter: 0,
                proposals: BTreeMap::new(),
                markets: BTreeMap::new(),
                accounts,
                admins,
                polls_before_pass: 0,
                response_shape: ResponseShape::default(),
                pending_failures: 0,
                calls: Vec::new(),
            }),
        }
    }

    pub fn with_height(mut self, height: u64) -> Self {
        self.state_mut().height = height;
        self
    }

    /// Status queries after a vote that still report `VOTING_PERIOD`.
    pub fn with_polls_before_pass(mut self, polls: u32) -> Self {
        self.state_mut().polls_before_pass = polls;
        self
    }

    pub fn with_response_shape(mut self, shape: ResponseShape) -> Self {
        self.state_mut().response_shape = shape;
        self
    }

    pub fn with_account(mut self, name: &str, address: &str) -> Self {
        self.state_mut()
            .accounts
            .insert(name.to_string(), address.to_string());
        self
    }

    pub fn without_account(mut self, name: &str) -> Self {
        self.state_mut().accounts.remove(name);
        self
    }

    pub fn with_admin(mut self, key: &str) -> Self {
        self.state_mut().admins.insert(key.to_string());
        self
    }

    fn state_mut(&mut self) -> &mut ChainState {
        self.state.get_mut().unwrap()
    }

    /// Make the next `n` invocations exit non-zero.
    pub fn fail_next(&self, n: u32) {
        self.state.lock().unwrap().pending_failures = n;
    }

    /// Seed a market directly, bypassing governance.
    pub fn insert_market(&self, market_id: &str, ticker: &str, rmr: &str, imr: &str, mmr: &str) {
        self.state.lock().unwrap().markets.insert(
            market_id.to_string(),
            market_json(market_id, ticker, "tst", "usdt", rmr, imr, mmr),
        );
    }

    /// Overwrite the stored reduce margin ratio string verbatim.
    pub fn set_stored_rmr(&self, market_id: &str, stored: &str) {
        if let Some(market) = self.state.lock().unwrap().markets.get_mut(market_id) {
            market["reduce_margin_ratio"] = json!(stored);
        }
    }

    /// Remove a field from a stored market.
    pub fn remove_market_field(&self, market_id: &str, field: &str) {
        if let Some(Value::Object(market)) = self.state.lock().unwrap().markets.get_mut(market_id) {
            market.remove(field);
        }
    }

    pub fn market(&self, market_id: &str) -> Option<Value> {
        self.state.lock().unwrap().markets.get(market_id).cloned()
    }

    pub fn proposal_status(&self, proposal_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .proposals
            .get(proposal_id)
            .map(|p| p.status.to_string())
    }

    /// Every invocation so far, with base args.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Invocations whose leading args equal `prefix`.
    pub fn call_count(&self, prefix: &[&str]) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| {
                call.len() >= prefix.len() && call.iter().zip(prefix).all(|(a, b)| a == b)
            })
            .count()
    }
}

impl Default for NullChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for NullChain {
    fn program(&self) -> &str {
        "null-injectived"
    }

    async fn run(&self, args: &[String], _timeout: Duration) -> Result<CommandOutput, RunError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(args.to_vec());

        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Ok(CommandOutput::failure(
                1,
                "Error: post failed: dial tcp 127.0.0.1:26657: connection refused",
            ));
        }

        let invocation = Invocation::parse(args);
        Ok(state.dispatch(&invocation))
    }
}

// ── Argument handling ──────────────────────────────────────────────────

struct Invocation<'a> {
    positional: Vec<&'a str>,
    flags: BTreeMap<&'a str, &'a str>,
}

impl<'a> Invocation<'a> {
    fn parse(args: &'a [String]) -> Self {
        let mut positional = Vec::new();
        let mut flags = BTreeMap::new();
        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            if let Some(name) = arg.strip_prefix("--") {
                match args.get(i + 1) {
                    Some(value) if !value.starts_with("--") => {
                        flags.insert(name, value.as_str());
                        i += 2;
                    }
                    _ => {
                        flags.insert(name, "");
                        i += 1;
                    }
                }
            } else {
                positional.push(arg);
                i += 1;
            }
        }
        Self { positional, flags }
    }

    fn flag(&self, name: &str) -> Option<&'a str> {
        self.flags.get(name).copied()
    }
}

// ── Handlers ───────────────────────────────────────────────────────────

impl ChainState {
    fn dispatch(&mut self, inv: &Invocation<'_>) -> CommandOutput {
        let from = inv.flag("from").unwrap_or_default();
        match inv.positional.as_slice() {
            ["query", "block"] => json_output(json!({
                "block": { "header": { "height": self.height.to_string() } }
            })),
            ["query", "gov", "proposal", id] => self.query_proposal(id),
            ["query", "exchange", "perpetual-markets"] => {
                let markets: Vec<Value> = self
                    .markets
                    .values()
                    .map(|m| json!({ "market": m }))
                    .collect();
                json_output(json!({ "markets": markets }))
            }
            ["query", "exchange", "perpetual-market-info", id] => match self.markets.get(*id) {
                Some(market) => json_output(json!({ "market": market })),
                None => json_output(json!({ "error": format!("Market {id} not found") })),
            },
            ["tx", "gov", "submit-proposal", file] => self.submit_proposal(file),
            ["tx", "gov", "vote", id, option] => self.vote(id, option),
            ["tx", "exchange", "admin-update-perpetual-market", id] => {
                self.update_market(id, inv.flag("reduce-margin-ratio"), from)
            }
            ["keys", "show", name] => match self.accounts.get(*name) {
                Some(address) => CommandOutput::success(format!("{address}\n")),
                None => CommandOutput::failure(
                    1,
                    format!("Error: {name} is not a valid name or address: key not found"),
                ),
            },
            other => CommandOutput::failure(
                1,
                format!("Error: unknown command \"{}\"", other.join(" ")),
            ),
        }
    }

    fn next_txhash(&mut self) -> String {
        self.tx_counter += 1;
        format!("{:064X}", self.tx_counter)
    }

    fn submit_proposal(&mut self, file: &str) -> CommandOutput {
        let content = match std::fs::read_to_string(file) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(content) => content,
                Err(e) => return CommandOutput::failure(1, format!("Error: invalid proposal file: {e}")),
            },
            Err(e) => return CommandOutput::failure(1, format!("Error: open {file}: {e}")),
        };

        let id = self.next_proposal_id.to_string();
        self.next_proposal_id += 1;
        self.proposals.insert(
            id.clone(),
            NullProposal {
                status: STATUS_VOTING,
                content,
                vote: None,
                polls_after_vote: 0,
            },
        );

        let events = json!([{
            "type": "submit_proposal",
            "attributes": [
                { "key": "proposal_id", "value": id },
                { "key": "proposal_messages", "value": ",/injective.exchange.v1beta1.MsgInstantPerpetualMarketLaunch" }
            ]
        }]);
        let json_log = json!([{ "msg_index": 0, "events": events }]).to_string();
        let txhash = self.next_txhash();

        let response = match self.response_shape {
            ResponseShape::Events => json!({
                "txhash": txhash, "code": 0, "events": events, "raw_log": json_log
            }),
            ResponseShape::LogsEvents => json!({
                "txhash": txhash, "code": 0, "logs": [{ "msg_index": 0, "events": events }], "raw_log": ""
            }),
            ResponseShape::RawLog => json!({
                "txhash": txhash, "code": 0, "events": [], "raw_log": json_log
            }),
            ResponseShape::RawLogText => json!({
                "txhash": txhash, "code": 0,
                "raw_log": format!("proposal submitted {{\"proposal_id\":\"{id}\",\"proposer\":\"inj1testcandidate123456789\"}}")
            }),
            ResponseShape::NoIdentifier => json!({
                "txhash": txhash, "code": 0, "raw_log": ""
            }),
        };
        json_output(response)
    }

    fn vote(&mut self, id: &str, option: &str) -> CommandOutput {
        let txhash = self.next_txhash();
        let Some(proposal) = self.proposals.get_mut(id) else {
            return json_output(json!({
                "txhash": txhash, "code": 2, "raw_log": format!("proposal {id} not found")
            }));
        };
        if proposal.status != STATUS_VOTING {
            return json_output(json!({
                "txhash": txhash, "code": 3, "raw_log": format!("inactive proposal {id}")
            }));
        }
        proposal.vote = Some(option.to_string());
        json_output(json!({ "txhash": txhash, "code": 0 }))
    }

    fn query_proposal(&mut self, id: &str) -> CommandOutput {
        let polls_before_pass = self.polls_before_pass;
        let Some(proposal) = self.proposals.get_mut(id) else {
            return CommandOutput::failure(
                1,
                format!("Error: rpc error: code = NotFound desc = proposal {id} doesn't exist"),
            );
        };

        let mut launch = None;
        if proposal.status == STATUS_VOTING && proposal.vote.is_some() {
            if proposal.polls_after_vote < polls_before_pass {
                proposal.polls_after_vote += 1;
            } else if proposal.vote.as_deref() == Some("yes") {
                launch = Some(proposal.content.clone());
            } else {
                proposal.status = STATUS_REJECTED;
            }
        }

        if let Some(content) = launch {
            let status = if self.apply_launch(id, &content) {
                STATUS_PASSED
            } else {
                STATUS_FAILED
            };
            if let Some(proposal) = self.proposals.get_mut(id) {
                proposal.status = status;
            }
        }

        let (status, yes) = match self.proposals.get(id) {
            Some(p) => (p.status, if p.vote.as_deref() == Some("yes") { "1000000" } else { "0" }),
            None => (STATUS_FAILED, "0"),
        };
        json_output(json!({
            "proposal": {
                "id": id,
                "status": status,
                "final_tally_result": { "yes_count": yes, "no_count": "0" }
            }
        }))
    }

    /// Execute a passed launch proposal. False when the chain refuses it.
    fn apply_launch(&mut self, proposal_id: &str, content: &Value) -> bool {
        let Some(msg) = content.pointer("/messages/0") else {
            return false;
        };
        let field = |name: &str| msg.get(name).and_then(Value::as_str).unwrap_or_default();
        let ratio = |name: &str| parse_stored(field(name)).ok();

        let (Some(rmr), Some(imr), Some(mmr)) = (
            ratio("reduce_margin_ratio"),
            ratio("initial_margin_ratio"),
            ratio("maintenance_margin_ratio"),
        ) else {
            return false;
        };
        if !validate(rmr, imr, mmr) {
            return false;
        }

        let ticker = field("ticker");
        if self
            .markets
            .values()
            .any(|m| m.get("ticker").and_then(Value::as_str) == Some(ticker))
        {
            return false;
        }

        let number: u64 = proposal_id.parse().unwrap_or_default();
        let market_id = format!("0x{number:064x}");
        let market = market_json(
            &market_id,
            ticker,
            field("base_denom"),
            field("quote_denom"),
            field("reduce_margin_ratio"),
            field("initial_margin_ratio"),
            field("maintenance_margin_ratio"),
        );
        self.markets.insert(market_id, market);
        true
    }

    fn update_market(&mut self, id: &str, rmr: Option<&str>, from: &str) -> CommandOutput {
        let txhash = self.next_txhash();
        if !self.admins.contains(from) {
            return json_output(json!({
                "txhash": txhash, "code": 4,
                "raw_log": format!("unauthorized: {from} is not the exchange admin")
            }));
        }
        let Some(new_rmr) = rmr.and_then(|s| parse_stored(s).ok()) else {
            return json_output(json!({
                "txhash": txhash, "code": 7, "raw_log": "invalid reduce margin ratio"
            }));
        };
        let Some(market) = self.markets.get_mut(id) else {
            return json_output(json!({
                "txhash": txhash, "code": 1, "raw_log": format!("market {id} not found")
            }));
        };

        let imr = market
            .get("initial_margin_ratio")
            .and_then(Value::as_str)
            .and_then(|s| parse_stored(s).ok())
            .unwrap_or(0.0);
        if new_rmr < imr {
            return json_output(json!({
                "txhash": txhash, "code": 5,
                "raw_log": "reduce margin ratio must be greater than or equal to initial margin ratio"
            }));
        }

        market["reduce_margin_ratio"] = json!(rmr.unwrap_or_default());
        json_output(json!({ "txhash": txhash, "code": 0 }))
    }
}

fn market_json(
    market_id: &str,
    ticker: &str,
    base_denom: &str,
    quote_denom: &str,
    rmr: &str,
    imr: &str,
    mmr: &str,
) -> Value {
    json!({
        "market_id": market_id,
        "ticker": ticker,
        "oracle_base": base_denom,
        "oracle_quote": quote_denom,
        "quote_denom": quote_denom,
        "reduce_margin_ratio": rmr,
        "initial_margin_ratio": imr,
        "maintenance_margin_ratio": mmr,
        "maker_fee_rate": "0.001000",
        "taker_fee_rate": "0.002000",
        "status": "Active"
    })
}

fn json_output(value: Value) -> CommandOutput {
    CommandOutput::success(format!("{value:#}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    async fn run(chain: &NullChain, parts: &[&str]) -> CommandOutput {
        chain.run(&args(parts), Duration::from_secs(1)).await.unwrap()
    }

    fn parsed(output: &CommandOutput) -> Value {
        serde_json::from_str(&output.stdout).unwrap()
    }

    #[test]
    fn parse_splits_positionals_and_flags() {
        let raw = args(&["keys", "show", "val", "--address", "--chain-id", "injective-1", "--yes"]);
        let inv = Invocation::parse(&raw);
        assert_eq!(inv.positional, vec!["keys", "show", "val"]);
        assert_eq!(inv.flag("address"), Some(""));
        assert_eq!(inv.flag("chain-id"), Some("injective-1"));
        assert_eq!(inv.flag("yes"), Some(""));
    }

    #[tokio::test]
    async fn keys_show_prints_plain_address() {
        let chain = NullChain::new();
        let out = run(&chain, &["keys", "show", "val", "--address"]).await;
        assert_eq!(out.stdout.trim(), "inj1validator123456789");

        let missing = run(&chain, &["keys", "show", "nobody", "--address"]).await;
        assert_eq!(missing.code, Some(1));
    }

    #[tokio::test]
    async fn non_admin_update_is_rejected_with_code() {
        let chain = NullChain::new();
        chain.insert_market("0x01", "TST/USDT PERP", "0.100000", "0.050000", "0.030000");
        let out = run(
            &chain,
            &[
                "tx", "exchange", "admin-update-perpetual-market", "0x01",
                "--reduce-margin-ratio", "0.150000", "--from", "val",
            ],
        )
        .await;
        assert_eq!(parsed(&out)["code"], 4);
        assert_eq!(chain.market("0x01").unwrap()["reduce_margin_ratio"], "0.100000");
    }

    #[tokio::test]
    async fn extra_admins_and_accounts() {
        let chain = NullChain::new()
            .with_account("ops", "inj1ops000000000000")
            .with_admin("val");
        chain.insert_market("0x01", "TST/USDT PERP", "0.100000", "0.050000", "0.030000");

        let out = run(&chain, &["keys", "show", "ops", "--address"]).await;
        assert_eq!(out.stdout.trim(), "inj1ops000000000000");

        let out = run(
            &chain,
            &[
                "tx", "exchange", "admin-update-perpetual-market", "0x01",
                "--reduce-margin-ratio", "0.150000", "--from", "val",
            ],
        )
        .await;
        assert_eq!(parsed(&out)["code"], 0);
        assert_eq!(chain.market("0x01").unwrap()["reduce_margin_ratio"], "0.150000");
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let chain = NullChain::new();
        chain.fail_next(1);
        assert_eq!(run(&chain, &["query", "block"]).await.code, Some(1));
        assert!(run(&chain, &["query", "block"]).await.is_success());
        assert_eq!(chain.call_count(&["query", "block"]), 2);
    }

    #[tokio::test]
    async fn unknown_subcommand_fails() {
        let chain = NullChain::new();
        let out = run(&chain, &["tx", "bank", "send"]).await;
        assert_eq!(out.code, Some(1));
        assert!(out.stderr.contains("unknown command"));
    }
}
