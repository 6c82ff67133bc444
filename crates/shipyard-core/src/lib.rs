//! Core library for Shipyard.
//!
//! This crate provides the orchestration logic that drives release targets
//! through the `init`, `bump` and `release` phases.

mod error;
mod orchestrator;
mod version;

pub use error::{CoreError, CoreResult};
pub use orchestrator::{Orchestrator, ReleaseReport, TargetReport};
pub use version::{Increment, VersionManager, VersionTarget};
