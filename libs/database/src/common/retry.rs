use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Startup retry policy for backing connections (Redis, PostgreSQL).
///
/// Exponential backoff with jitter. Worker hosts restart alongside their
/// brokers often enough (deploys, node drains) that the first connection
/// attempt routinely races the broker coming up.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,

    /// Ceiling for the doubled delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

/// Retry an async operation with exponential backoff and jitter.
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, config: RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay_ms;

    for attempt in 1..=config.max_retries {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("Connection established after {} attempts", attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                let wait = jittered(delay);
                debug!(
                    "Connection attempt {}/{} failed: {}. Retrying in {}ms...",
                    attempt, config.max_retries, e, wait
                );
                tokio::time::sleep(Duration::from_millis(wait)).await;
                delay = (delay * 2).min(config.max_delay_ms);
            }
        }
    }

    // Final attempt surfaces its error to the caller
    operation().await.inspect_err(|e| {
        warn!(
            "Connection failed after {} attempts: {}",
            config.max_retries + 1,
            e
        );
    })
}

/// 50-100% of the nominal delay, to spread simultaneous restarts.
fn jittered(delay: u64) -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    let factor = (RandomState::new().hash_one(std::time::SystemTime::now()) % 50 + 50) as f64 / 100.0;
    (delay as f64 * factor) as u64
}

/// Retry with the default policy (3 retries from 100ms).
pub async fn retry<F, Fut, T, E>(operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff(operation, RetryConfig::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::new().with_initial_delay(1);

        let result: Result<u32, String> = retry_with_backoff(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(n)
                }
            },
            config,
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::new()
            .with_max_retries(2)
            .with_initial_delay(1);

        let result: Result<u32, String> = retry_with_backoff(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>("down".to_string())
            },
            config,
        )
        .await;

        assert!(result.is_err());
        // Initial attempt, two retries, then the surfaced final attempt
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_jitter_bounds() {
        for _ in 0..20 {
            let j = jittered(1000);
            assert!((500..=1000).contains(&j));
        }
    }
}
