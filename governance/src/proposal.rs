//! Proposal identity and the status values the chain reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier the chain assigned to a submitted proposal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(String);

impl ProposalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a governance proposal as seen by polling.
///
/// `Passed`, `Rejected` and `Failed` are terminal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// The response carried no status.
    Unspecified,
    DepositPeriod,
    Voting,
    Passed,
    Rejected,
    Failed,
    /// A status string this harness does not know.
    Unknown(String),
}

impl ProposalStatus {
    /// Parse the chain's enum name, with or without the `PROPOSAL_STATUS_` prefix.
    pub fn from_remote(raw: &str) -> Self {
        let name = raw.trim();
        let short = name.strip_prefix("PROPOSAL_STATUS_").unwrap_or(name);
        match short {
            "" | "UNSPECIFIED" => ProposalStatus::Unspecified,
            "DEPOSIT_PERIOD" => ProposalStatus::DepositPeriod,
            "VOTING_PERIOD" | "VOTING" => ProposalStatus::Voting,
            "PASSED" => ProposalStatus::Passed,
            "REJECTED" => ProposalStatus::Rejected,
            "FAILED" => ProposalStatus::Failed,
            _ => ProposalStatus::Unknown(name.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Passed | ProposalStatus::Rejected | ProposalStatus::Failed
        )
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalStatus::Unspecified => f.write_str("PROPOSAL_STATUS_UNSPECIFIED"),
            ProposalStatus::DepositPeriod => f.write_str("PROPOSAL_STATUS_DEPOSIT_PERIOD"),
            ProposalStatus::Voting => f.write_str("PROPOSAL_STATUS_VOTING_PERIOD"),
            ProposalStatus::Passed => f.write_str("PROPOSAL_STATUS_PASSED"),
            ProposalStatus::Rejected => f.write_str("PROPOSAL_STATUS_REJECTED"),
            ProposalStatus::Failed => f.write_str("PROPOSAL_STATUS_FAILED"),
            ProposalStatus::Unknown(raw) => f.write_str(raw),
        }
    }
}
