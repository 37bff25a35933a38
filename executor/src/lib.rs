//! Node CLI invocation for the RMR harness.
//!
//! Every interaction with the chain goes through [`CommandExecutor`]: it
//! appends the connection flags, runs the binary through a
//! [`CommandRunner`], parses whatever came back into JSON and absorbs
//! transient failures with exponential backoff. [`ChainCli`] names the
//! subcommands the harness relies on.

pub mod chain;
pub mod error;
pub mod executor;
pub mod runner;

pub use chain::{tx_code, ChainCli, VoteOption, UNREADABLE_CODE};
pub use error::{ExecError, RunError};
pub use executor::{parse_output, CommandExecutor};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
