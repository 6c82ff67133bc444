//! Plugin system for Shipyard.
//!
//! This crate provides the release lifecycle and what targets build on:
//! - [`ReleaseTarget`]: the `init` / `bump` / `release` lifecycle
//! - [`ReleaseContext`]: state shared by all targets during a run
//! - [`StepRunner`]: prompts, progress display and dry-run simulation
//! - [`RetryPolicy`]: classification and backoff for remote calls
//! - [`within`]: a deadline over concurrent precondition checks

mod context;
mod deadline;
mod env;
mod error;
mod retry;
mod services;
mod step;
mod traits;
mod version;

pub use context::ReleaseContext;
pub use deadline::within;
pub use env::{Environment, ProcessEnvironment, StaticEnvironment};
pub use error::{ErrorKind, PluginError, PluginResult};
pub use retry::{Classification, RemoteError, RetryPolicy};
pub use services::PluginServices;
pub use step::{
    DialoguerPrompter, OtpState, Prompt, Prompter, RunMode, Step, StepOutcome, StepRecord,
    StepRunner, StepStatus,
};
pub use traits::Plugin;
pub use traits::target::{ReleaseFlag, ReleaseTarget};
pub use version::{DEFAULT_CHANNEL, DEFAULT_PRERELEASE_CHANNEL, ParsedVersion};

#[cfg(any(test, feature = "testing"))]
pub use step::ScriptedPrompter;
