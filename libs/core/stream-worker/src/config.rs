//! Worker configuration.
//!
//! `WorkerConfig` carries a queue's compile-time policy (copied from its
//! `StreamDef`) plus the runtime knobs of one worker instance: concurrency,
//! batch size, read timeouts and claim behavior.

use std::time::Duration;

use uuid::Uuid;

use crate::registry::StreamDef;

/// Retry delays are capped so a misconfigured backoff base cannot park a
/// job for hours.
const MAX_BACKOFF_MS: u64 = 120_000;

/// Configuration for a stream worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Redis stream name.
    pub stream_name: String,

    /// Consumer group name.
    pub consumer_group: String,

    /// Unique consumer ID (auto-generated if not provided).
    pub consumer_id: String,

    /// Dead letter queue stream name.
    pub dlq_stream: String,

    /// Maximum stream length before trimming.
    pub max_length: i64,

    /// Total attempts a job gets before it is parked as failed.
    pub max_attempts: u32,

    /// Base delay for exponential retry backoff, in milliseconds.
    pub backoff_base_ms: u64,

    /// Remove completed entries from the stream.
    pub remove_on_complete: bool,

    /// Bounded DLQ retention (entries).
    pub fail_retain: i64,

    /// Poll interval in milliseconds when not using blocking reads.
    pub poll_interval_ms: u64,

    /// Batch size for reading messages.
    pub batch_size: usize,

    /// Blocking read timeout in milliseconds (None = non-blocking polling).
    pub block_timeout_ms: Option<u64>,

    /// Maximum concurrent jobs to process.
    pub max_concurrent_jobs: usize,

    /// Idle time in milliseconds before a pending entry owned by another
    /// consumer is claimed. Should exceed the worst-case retry backoff,
    /// otherwise a waiting retry can be re-delivered (harmless under
    /// at-least-once, but noisy).
    pub claim_idle_ms: u64,
}

impl WorkerConfig {
    /// Create a WorkerConfig from a StreamDef, inheriting its policy.
    pub fn from_stream_def<S: StreamDef>() -> Self {
        Self {
            stream_name: S::STREAM_NAME.to_string(),
            consumer_group: S::CONSUMER_GROUP.to_string(),
            consumer_id: format!("worker-{}", Uuid::new_v4()),
            dlq_stream: S::DLQ_STREAM.to_string(),
            max_length: S::MAX_LENGTH,
            max_attempts: S::MAX_ATTEMPTS,
            backoff_base_ms: S::BACKOFF_BASE_MS,
            remove_on_complete: S::REMOVE_ON_COMPLETE,
            fail_retain: S::FAIL_RETAIN,
            poll_interval_ms: 1000,
            batch_size: 10,
            block_timeout_ms: Some(5000),
            max_concurrent_jobs: 1,
            claim_idle_ms: 30_000,
        }
    }

    /// Set the consumer ID.
    pub fn with_consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = id.into();
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval_ms(mut self, interval: u64) -> Self {
        self.poll_interval_ms = interval;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the blocking read timeout (None for polling mode).
    pub fn with_blocking(mut self, timeout_ms: Option<u64>) -> Self {
        self.block_timeout_ms = timeout_ms;
        self
    }

    /// Set the maximum concurrent jobs.
    pub fn with_max_concurrent_jobs(mut self, count: usize) -> Self {
        self.max_concurrent_jobs = count.max(1);
        self
    }

    /// Set the claim idle time for abandoned entries.
    pub fn with_claim_idle_ms(mut self, idle_ms: u64) -> Self {
        self.claim_idle_ms = idle_ms;
        self
    }

    /// Override the retry policy (tests and special deployments only; the
    /// StreamDef constants are the source of truth in production).
    pub fn with_retry_policy(mut self, max_attempts: u32, backoff_base_ms: u64) -> Self {
        self.max_attempts = max_attempts;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Whether reads block on the broker instead of polling.
    pub fn is_blocking(&self) -> bool {
        self.block_timeout_ms.is_some()
    }

    /// Delay before the next attempt, given the number of failed attempts
    /// so far: `base, base*2, base*4, ...`, capped.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let delay = self
            .backoff_base_ms
            .saturating_mul(2u64.saturating_pow(retry_count));
        Duration::from_millis(delay.min(MAX_BACKOFF_MS))
    }
}
