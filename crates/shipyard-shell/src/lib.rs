//! Shell execution for Shipyard.
//!
//! This crate provides the command layer used by every release target:
//! - [`Shell`]: runs commands, suppresses writes in dry-run mode
//! - [`ExecLog`]: append-only record of every intended operation
//! - [`CommandRunner`]: the process-spawning seam, swappable in tests

mod command;
mod error;
mod executor;
mod log;
mod runner;

#[cfg(any(test, feature = "testing"))]
mod testing;

pub use command::ShellCommand;
pub use error::{ExecError, ShellResult};
pub use executor::{ExecOptions, Shell};
pub use log::{ExecLog, ExecRecord, OperationKind};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};

#[cfg(any(test, feature = "testing"))]
pub use testing::ScriptedRunner;
