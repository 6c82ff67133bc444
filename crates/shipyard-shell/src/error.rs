//! Shell error types.

use thiserror::Error;

/// Errors raised while running external commands.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process could not be started.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited with a non-zero status.
    #[error("`{command}` failed{}: {output}", status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    Failed {
        command: String,
        status: Option<i32>,
        output: String,
    },
}

impl ExecError {
    /// Returns the combined output of a failed command, if any.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Failed { output, .. } => Some(output),
            Self::Spawn { .. } => None,
        }
    }

    /// Returns the command line that failed.
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::Spawn { command, .. } | Self::Failed { command, .. } => command,
        }
    }
}

/// Result type for shell operations.
pub type ShellResult<T> = Result<T, ExecError>;
