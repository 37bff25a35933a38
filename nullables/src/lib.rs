//! Nullable infrastructure for deterministic testing.
//!
//! The harness reaches the chain only through
//! [`CommandRunner`](rmr_executor::CommandRunner). This crate provides
//! test-friendly implementations that:
//! - Answer the node CLI's subcommands from in-memory state
//! - Can be steered programmatically (poll counts, failures, response shapes)
//! - Record every invocation for assertions
//!
//! Usage: hand an `Arc` of one of these to `ChainCli::with_runner` in tests.

pub mod chain;
pub mod scripted;

pub use chain::{NullChain, ResponseShape};
pub use scripted::ScriptedRunner;
