//! Retries for flaky oracles.
use std::time::Duration;

use async_trait::async_trait;
use hd_account::{AddressOracle, OracleError, UsageMap};
use tracing::warn;

/// Default number of retries after the first failed attempt.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Wraps an oracle and retries failed queries a bounded number of times.
///
/// Discovery itself never retries; the last error is returned once retries run out.
#[derive(Debug, Clone)]
pub struct RetryingOracle<O> {
    inner: O,
    retry_count: u32,
    retry_interval: Duration,
}

impl<O> RetryingOracle<O> {
    /// Wraps `inner` with the default retry policy.
    pub const fn new(inner: O) -> Self {
        Self {
            inner,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    /// Sets how many times a failed query is retried.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Sets the pause between attempts.
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// The wrapped oracle.
    pub const fn inner(&self) -> &O {
        &self.inner
    }
}

#[async_trait]
impl<O: AddressOracle> AddressOracle for RetryingOracle<O> {
    async fn query(&self, addresses: &[String]) -> Result<UsageMap, OracleError> {
        let mut attempt = 0;
        loop {
            match self.inner.query(addresses).await {
                Ok(usage) => return Ok(usage),
                Err(e) if attempt < self.retry_count => {
                    attempt += 1;
                    warn!(%e, %attempt, max = self.retry_count, "oracle query failed, retrying");
                    tokio::time::sleep(self.retry_interval).await;
                }
                Err(e) => {
                    warn!(%e, "oracle query failed, giving up");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Fails the first `failures` queries, then reports everything unused.
    #[derive(Debug)]
    struct FlakyOracle {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyOracle {
        const fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl AddressOracle for FlakyOracle {
        async fn query(&self, addresses: &[String]) -> Result<UsageMap, OracleError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(OracleError::new(format!("timeout #{call}")));
            }
            Ok(addresses.iter().map(|a| (a.clone(), false)).collect())
        }
    }

    fn batch() -> Vec<String> {
        vec!["a".to_owned(), "b".to_owned()]
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_within_retry_count() {
        let oracle = RetryingOracle::new(FlakyOracle::new(2)).with_retry_count(2);

        let usage = oracle.query(&batch()).await.unwrap();
        assert_eq!(usage.len(), 2);
        assert_eq!(oracle.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error() {
        let oracle = RetryingOracle::new(FlakyOracle::new(5))
            .with_retry_count(2)
            .with_retry_interval(Duration::from_secs(1));

        let err = oracle.query(&batch()).await.unwrap_err();
        assert_eq!(err.to_string(), "timeout #2");
        assert_eq!(oracle.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_fails_fast() {
        let oracle = RetryingOracle::new(FlakyOracle::new(1)).with_retry_count(0);

        assert!(oracle.query(&batch()).await.is_err());
        assert_eq!(oracle.inner().calls.load(Ordering::SeqCst), 1);
    }
}
