use crate::proposal::{ProposalId, ProposalStatus};
use rmr_executor::ExecError;
use rmr_types::RatioError;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("invalid margin ratios: rmr={rmr}, imr={imr}, mmr={mmr} violate constraint RMR >= IMR > MMR")]
    ConstraintViolation { rmr: f64, imr: f64, mmr: f64 },

    #[error("ratio cannot be stored: {0}")]
    Ratio(#[from] RatioError),

    #[error("node CLI call failed: {0}")]
    Execution(#[from] ExecError),

    #[error("proposal submission rejected with code {code}: {response}")]
    Submission { code: u64, response: Value },

    #[error("vote on proposal {proposal_id} rejected with code {code}: {response}")]
    Vote {
        proposal_id: ProposalId,
        code: u64,
        response: Value,
    },

    #[error("could not extract a proposal id from submit response: {response}")]
    IdentifierExtraction { response: Value },

    #[error("proposal {proposal_id} ended with status {status}")]
    ProposalFailed {
        proposal_id: ProposalId,
        status: ProposalStatus,
    },

    #[error("proposal {proposal_id} not terminal after {waited:?} ({polls} polls, last status {})", describe_status(.last_status))]
    Timeout {
        proposal_id: ProposalId,
        waited: Duration,
        polls: u32,
        last_status: Option<ProposalStatus>,
    },

    #[error("failed to write proposal file: {0}")]
    PayloadFile(String),
}

fn describe_status(status: &Option<ProposalStatus>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "none".to_string(),
    }
}
