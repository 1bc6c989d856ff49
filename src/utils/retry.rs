use std::{future::Future, time::Duration};

use crate::{config::models::RetryConfig, core::error::ManagerResult};

/// Fixed attempt budget and fixed backoff between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.attempts, Duration::from_millis(config.backoff_ms))
    }
}

/// Re-run `op` while its commit is rejected as out of sequence.
///
/// `op` must open a fresh transaction on every call. Any other error, or the last
/// version conflict once the budget is spent, is returned as is.
pub async fn retry_on_version_conflict<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> ManagerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ManagerResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_version_conflict() && attempt < policy.attempts => {
                tracing::warn!(
                    attempt,
                    attempts = policy.attempts,
                    backoff_ms = policy.backoff.as_millis() as u64,
                    "Configuration changed underneath the transaction, retrying: {}",
                    e
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::core::error::ManagerError;

    fn conflict() -> ManagerError {
        ManagerError::VersionConflict {
            transaction_id: "tx".to_string(),
            message: "version mismatch".to_string(),
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result = retry_on_version_conflict(&policy, move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(conflict())
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_last_conflict() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let result: ManagerResult<()> = retry_on_version_conflict(&policy, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(conflict())
        })
        .await;
        assert!(result.unwrap_err().is_version_conflict());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let result: ManagerResult<()> = retry_on_version_conflict(&policy, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ManagerError::Restricted("port 22".to_string()))
        })
        .await;
        assert!(matches!(result, Err(ManagerError::Restricted(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
