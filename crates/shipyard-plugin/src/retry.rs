//! Retry policy for remote operations.

use std::fmt;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use shipyard_shell::ExecError;
use tracing::{debug, warn};

use crate::{PluginError, PluginResult};

static NPM_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"code E(\d{3})\b").expect("invalid regex"));

/// A failed remote call: HTTP-like status plus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Status code, when the failure carried one.
    pub status: Option<u16>,
    /// Underlying message.
    pub message: String,
}

impl RemoteError {
    /// Creates a remote error.
    #[must_use]
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Classifies this failure.
    #[must_use]
    pub fn classify(&self) -> Classification {
        match self.status {
            Some(408 | 429) => Classification::Transient,
            Some(400..=499) => Classification::Permanent,
            Some(500..=599) | None => Classification::Transient,
            Some(_) => {
                let message = self.message.to_lowercase();
                if message.contains("timeout")
                    || message.contains("timed out")
                    || message.contains("econnreset")
                {
                    Classification::Transient
                } else {
                    Classification::Permanent
                }
            }
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{status} ({})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<RemoteError> for PluginError {
    fn from(err: RemoteError) -> Self {
        PluginError::Client {
            status: err.status,
            message: err.message,
        }
    }
}

impl From<ExecError> for RemoteError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::Failed { output, .. } => {
                let status = NPM_CODE
                    .captures(&output)
                    .and_then(|caps| caps[1].parse().ok());
                Self::new(status, output)
            }
            ExecError::Spawn { .. } => Self::new(None, err.to_string()),
        }
    }
}

/// Whether a failure may succeed on a later attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Retry with backoff.
    Transient,
    /// Never retry.
    Permanent,
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    min_timeout: Duration,
    factor: u32,
    max_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_timeout: Duration::from_secs(1),
            factor: 2,
            max_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy: 3 attempts, 1s minimum backoff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total number of attempts (at least one).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn with_min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_factor(mut self, factor: u32) -> Self {
        self.factor = factor;
        self
    }

    /// Sets the backoff ceiling.
    #[must_use]
    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }

    /// Returns the maximum number of attempts.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay after the given failed attempt (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.saturating_pow(attempt.saturating_sub(1));
        self.min_timeout
            .saturating_mul(multiplier)
            .min(self.max_timeout)
    }

    /// Runs `call` until it succeeds, fails permanently, or runs out of
    /// attempts.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Client`] built from the last failure.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> PluginResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if err.classify() == Classification::Permanent {
                debug!(operation, error = %err, "permanent failure, not retrying");
                return Err(err.into());
            }
            if attempt >= self.max_attempts {
                warn!(operation, attempts = attempt, error = %err, "giving up");
                return Err(err.into());
            }

            let delay = self.backoff(attempt);
            warn!(
                operation,
                attempt,
                max_attempts = self.max_attempts,
                error = %err,
                "retrying in {}ms",
                delay.as_millis()
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy::new().with_min_timeout(Duration::ZERO)
    }

    async fn failing(policy: RetryPolicy, status: Option<u16>, message: &str) -> (u32, PluginError) {
        let calls = AtomicU32::new(0);
        let err = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                let err = RemoteError::new(status, message);
                async move { Err::<(), _>(err) }
            })
            .await
            .unwrap_err();
        (calls.load(Ordering::SeqCst), err)
    }

    #[test]
    fn test_classify() {
        let classify = |status| RemoteError::new(status, "x").classify();
        assert_eq!(classify(Some(401)), Classification::Permanent);
        assert_eq!(classify(Some(403)), Classification::Permanent);
        assert_eq!(classify(Some(404)), Classification::Permanent);
        assert_eq!(classify(Some(422)), Classification::Permanent);
        assert_eq!(classify(Some(408)), Classification::Transient);
        assert_eq!(classify(Some(429)), Classification::Transient);
        assert_eq!(classify(Some(500)), Classification::Transient);
        assert_eq!(classify(Some(503)), Classification::Transient);
        assert_eq!(classify(None), Classification::Transient);
    }

    #[test]
    fn test_classify_by_message() {
        assert_eq!(
            RemoteError::new(Some(0), "socket ECONNRESET").classify(),
            Classification::Transient
        );
        assert_eq!(
            RemoteError::new(Some(0), "weird").classify(),
            Classification::Permanent
        );
    }

    #[test]
    fn test_from_exec_error_extracts_status() {
        let err: RemoteError = ExecError::Failed {
            command: "npm whoami".to_string(),
            status: Some(1),
            output: "npm ERR! code E401\nnpm ERR! Unauthorized".to_string(),
        }
        .into();
        assert_eq!(err.status, Some(401));
    }

    #[test]
    fn test_from_exec_error_without_code() {
        let err: RemoteError = ExecError::Failed {
            command: "npm ping".to_string(),
            status: Some(1),
            output: "network down".to_string(),
        }
        .into();
        assert_eq!(err.status, None);
    }

    #[test]
    fn test_backoff() {
        let policy = RetryPolicy::new()
            .with_min_timeout(Duration::from_millis(100))
            .with_factor(2)
            .with_max_timeout(Duration::from_millis(300));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(300));
        assert_eq!(fast().backoff(5), Duration::ZERO);
    }

    #[test]
    fn test_max_attempts_at_least_one() {
        assert_eq!(RetryPolicy::new().with_max_attempts(0).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_permanent_invoked_once() {
        let (calls, err) = failing(fast(), Some(404), "Not Found").await;
        assert_eq!(calls, 1);
        assert_eq!(err.to_string(), "404 (Not Found)");

        let (calls, err) = failing(fast(), Some(401), "Bad credentials").await;
        assert_eq!(calls, 1);
        assert_eq!(err.to_string(), "401 (Bad credentials)");
    }

    #[tokio::test]
    async fn test_transient_exhausts_attempts() {
        let (calls, err) = failing(fast(), Some(500), "Internal Server Error").await;
        assert_eq!(calls, 3);
        assert!(matches!(err, PluginError::Client { status: Some(500), .. }));
        assert_eq!(err.to_string(), "500 (Internal Server Error)");
    }

    #[tokio::test]
    async fn test_custom_max_attempts() {
        let (calls, _) = failing(fast().with_max_attempts(5), Some(503), "unavailable").await;
        assert_eq!(calls, 5);
    }

    #[tokio::test]
    async fn test_recovers_after_transient() {
        let calls = AtomicU32::new(0);
        let value = fast()
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(RemoteError::new(Some(502), "Bad Gateway"))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
