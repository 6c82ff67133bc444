//! Core error types.

use thiserror::Error;

/// Core-related errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A release target failed; surfaced unchanged.
    #[error(transparent)]
    Plugin(#[from] shipyard_plugin::PluginError),

    /// Version parsing error.
    #[error("version error: {0}")]
    Version(#[from] semver::Error),

    /// Nothing to release to.
    #[error("no release targets enabled")]
    NoTargets,
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
