//! Git abstraction layer for Shipyard.
//!
//! This crate provides Git operations on top of the shell executor:
//! - Repository inspection (latest tag, remote, working tree state)
//! - Release writes (commit, tag, push), suppressed in dry-run
//! - Remote URL parsing into host/owner/repository

mod error;
mod remote;
mod repository;

pub use error::{GitError, GitResult};
pub use remote::RepoInfo;
pub use repository::{Repository, version_from_tag};
