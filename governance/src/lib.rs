//! Governance flow for RMR market launches.
//!
//! Lifecycle: Build → Submitted → Voting → {Passed | Rejected | Failed}
//!
//! The builder refuses ratio triples that break `RMR >= IMR > MMR` before
//! anything reaches the chain. The driver submits, votes and polls; it never
//! retries a stage itself, all retrying happens per CLI call inside the
//! executor.

pub mod builder;
pub mod error;
pub mod extract;
pub mod lifecycle;
pub mod proposal;

pub use builder::{MarketLaunchMessage, MarketOptions, ProposalBuilder, ProposalPayload};
pub use error::GovernanceError;
pub use extract::{ExtractorChain, ProposalIdExtractor};
pub use lifecycle::LifecycleDriver;
pub use proposal::{ProposalId, ProposalStatus};
