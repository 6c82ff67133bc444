//! Deadline combinator for precondition bundles.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::{PluginError, PluginResult};

/// Awaits `future` for at most `budget`.
///
/// Join independent checks inside the future (`tokio::join!`) so they share
/// one deadline. When the budget elapses the future is dropped, cancelling
/// whatever was still pending.
///
/// # Errors
///
/// Returns [`PluginError::Timeout`] if the budget elapses, otherwise the
/// future's own result.
pub async fn within<T, F>(operation: &str, budget: Duration, future: F) -> PluginResult<T>
where
    F: Future<Output = PluginResult<T>>,
{
    if let Ok(result) = tokio::time::timeout(budget, future).await {
        result
    } else {
        warn!(operation, budget_ms = budget.as_millis(), "deadline elapsed");
        Err(PluginError::Timeout {
            operation: operation.to_string(),
            budget,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_within_budget() {
        let value = within("checks", Duration::from_secs(1), async {
            let (a, b) = tokio::join!(async { 1 }, async { 2 });
            Ok(a + b)
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_inner_error_is_not_timeout() {
        let err = within::<(), _>("checks", Duration::from_secs(1), async {
            Err(PluginError::Precondition("dirty".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, PluginError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_elapsed_budget() {
        let err = within::<(), _>("npm validation", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, PluginError::Timeout { .. }));
        assert_eq!(err.to_string(), "npm validation timed out after 50ms");
    }
}
