//! Git error types.

use thiserror::Error;

/// Git-related errors.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not a git repository.
    #[error("not a git repository")]
    NotARepo,

    /// No remote configured under the given name.
    #[error("remote not found: {0}")]
    RemoteNotFound(String),

    /// Remote URL could not be interpreted.
    #[error("invalid remote url: {0}")]
    InvalidRemote(String),

    /// Underlying command failed.
    #[error("git command failed: {0}")]
    Exec(#[from] shipyard_shell::ExecError),
}

/// Result type for git operations.
pub type GitResult<T> = Result<T, GitError>;
