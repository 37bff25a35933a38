//! Submit → vote → poll, one proposal at a time.

use crate::builder::ProposalPayload;
use crate::error::GovernanceError;
use crate::extract::ExtractorChain;
use crate::proposal::{ProposalId, ProposalStatus};
use rmr_executor::{tx_code, ChainCli, VoteOption};
use rmr_types::HarnessConfig;
use serde_json::Value;
use std::io::Write;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Drives one proposal through its lifecycle against a node.
///
/// Stages are never retried here; a failing stage ends the run with the
/// matching [`GovernanceError`].
pub struct LifecycleDriver<'a> {
    cli: &'a ChainCli,
    extractors: ExtractorChain,
    poll_interval: Duration,
    settle_delay: Duration,
}

impl<'a> LifecycleDriver<'a> {
    pub fn new(cli: &'a ChainCli, config: &HarnessConfig) -> Self {
        Self {
            cli,
            extractors: ExtractorChain::default(),
            poll_interval: config.poll_interval(),
            settle_delay: config.settle_delay(),
        }
    }

    pub fn with_extractors(mut self, extractors: ExtractorChain) -> Self {
        self.extractors = extractors;
        self
    }

    /// Write `payload` to a temporary file and submit it from `submitter_key`.
    pub async fn submit(
        &self,
        payload: &ProposalPayload,
        submitter_key: &str,
    ) -> Result<ProposalId, GovernanceError> {
        let json = payload
            .to_json()
            .map_err(|e| GovernanceError::PayloadFile(e.to_string()))?;
        let mut file = tempfile::Builder::new()
            .prefix("market_proposal_")
            .suffix(".json")
            .tempfile()
            .map_err(|e| GovernanceError::PayloadFile(e.to_string()))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| GovernanceError::PayloadFile(e.to_string()))?;

        debug!(path = %file.path().display(), "proposal file written");

        // The file is removed when `file` drops, after the CLI has read it.
        let response = self.cli.submit_proposal(file.path(), submitter_key).await?;

        let code = tx_code(&response);
        if code != 0 {
            warn!(code, "proposal submission rejected");
            return Err(GovernanceError::Submission { code, response });
        }

        match self.extractors.extract(&response) {
            Some(id) => {
                info!(proposal_id = %id, "proposal submitted");
                Ok(id)
            }
            None => Err(GovernanceError::IdentifierExtraction { response }),
        }
    }

    pub async fn vote(
        &self,
        proposal_id: &ProposalId,
        option: VoteOption,
        voter_key: &str,
    ) -> Result<(), GovernanceError> {
        let response = self
            .cli
            .vote(proposal_id.as_str(), option, voter_key)
            .await?;
        let code = tx_code(&response);
        if code != 0 {
            return Err(GovernanceError::Vote {
                proposal_id: proposal_id.clone(),
                code,
                response,
            });
        }
        info!(%proposal_id, %option, voter = voter_key, "vote cast");
        Ok(())
    }

    /// Current status as reported by `query gov proposal`.
    pub async fn query_status(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<ProposalStatus, GovernanceError> {
        let response = self.cli.query_proposal(proposal_id.as_str()).await?;
        Ok(status_of(&response))
    }

    /// Poll until the proposal passes, is refused, or `timeout` elapses.
    ///
    /// At most `floor(timeout / poll_interval) + 1` polls are made.
    pub async fn await_terminal(
        &self,
        proposal_id: &ProposalId,
        timeout: Duration,
    ) -> Result<ProposalStatus, GovernanceError> {
        let start = Instant::now();
        let mut polls = 0;
        let mut last_status = None;

        while start.elapsed() < timeout {
            let status = self.query_status(proposal_id).await?;
            polls += 1;
            debug!(%proposal_id, %status, polls, "proposal status");

            match status {
                ProposalStatus::Passed => {
                    info!(%proposal_id, "proposal passed");
                    return Ok(status);
                }
                ProposalStatus::Rejected | ProposalStatus::Failed => {
                    warn!(%proposal_id, %status, "proposal did not pass");
                    return Err(GovernanceError::ProposalFailed {
                        proposal_id: proposal_id.clone(),
                        status,
                    });
                }
                _ => last_status = Some(status),
            }

            sleep(self.poll_interval).await;
        }

        Err(GovernanceError::Timeout {
            proposal_id: proposal_id.clone(),
            waited: start.elapsed(),
            polls,
            last_status,
        })
    }

    /// Submit, wait for the proposal to settle, vote yes, then await the result.
    pub async fn run_to_completion(
        &self,
        payload: &ProposalPayload,
        submitter_key: &str,
        voter_key: &str,
        timeout: Duration,
    ) -> Result<ProposalId, GovernanceError> {
        let proposal_id = self.submit(payload, submitter_key).await?;
        sleep(self.settle_delay).await;
        self.vote(&proposal_id, VoteOption::Yes, voter_key).await?;
        self.await_terminal(&proposal_id, timeout).await?;
        Ok(proposal_id)
    }
}

fn status_of(response: &Value) -> ProposalStatus {
    response
        .pointer("/proposal/status")
        .or_else(|| response.get("status"))
        .and_then(Value::as_str)
        .map(ProposalStatus::from_remote)
        .unwrap_or(ProposalStatus::Unspecified)
}
