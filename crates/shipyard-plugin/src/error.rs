//! Plugin error types.

use std::time::Duration;

use shipyard_shell::ExecError;
use thiserror::Error;

/// Plugin-related errors.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Invalid plugin configuration.
    #[error("plugin configuration error: {0}")]
    Config(String),

    /// A required environment variable is not set.
    #[error("environment variable \"{variable}\" is required for {purpose}")]
    MissingVariable { variable: String, purpose: String },

    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Authenticated, but not permitted.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Precondition validation exceeded its budget.
    #[error("{operation} timed out after {}ms", budget.as_millis())]
    Timeout { operation: String, budget: Duration },

    /// A remote call failed; formatted as `<status> (<message>)`.
    #[error("{}", client_message(*status, message))]
    Client { status: Option<u16>, message: String },

    /// A release precondition does not hold.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A shell command failed.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The operator cancelled the operation.
    #[error("aborted: {0}")]
    Aborted(String),

    /// Version parsing error.
    #[error("invalid version: {0}")]
    Version(#[from] semver::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn client_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("{status} ({message})"),
        None => message.to_string(),
    }
}

/// Coarse classification of a [`PluginError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid configuration.
    Config,
    /// Bad credentials.
    Auth,
    /// Not permitted.
    Authorization,
    /// Validation deadline elapsed.
    Timeout,
    /// Preconditions could not be validated.
    Precondition,
    /// The release action itself failed.
    Release,
    /// Cancelled by the operator.
    Aborted,
}

impl PluginError {
    /// Creates a missing-variable error.
    #[must_use]
    pub fn missing_variable(variable: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self::MissingVariable {
            variable: variable.into(),
            purpose: purpose.into(),
        }
    }

    /// Creates a client error.
    #[must_use]
    pub fn client(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Client {
            status,
            message: message.into(),
        }
    }

    /// Returns the error classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::MissingVariable { .. } | Self::Version(_) => ErrorKind::Config,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Client { .. } | Self::Exec(_) | Self::Io(_) => ErrorKind::Release,
            Self::Aborted(_) => ErrorKind::Aborted,
        }
    }

    /// Returns `true` if a command failed for lack of a one-time password.
    #[must_use]
    pub fn requires_otp(&self) -> bool {
        match self {
            Self::Exec(err) => err
                .output()
                .is_some_and(|out| out.contains("one-time pass") || out.contains("EOTP")),
            _ => false,
        }
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
