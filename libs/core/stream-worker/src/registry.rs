//! Stream registry types and definitions.
//!
//! This module provides:
//! - `StreamDef` trait for per-queue stream definitions and policies
//! - `StreamJob` / `StreamProcessor` traits for payloads and handlers
//! - `QueueJob` trait binding a job type to its queue at compile time
//! - `QueueName` enum, the central registry of the system's queues

use serde::{Serialize, de::DeserializeOwned};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::StreamError;
use async_trait::async_trait;

/// Stream definition trait.
///
/// Each queue implements this trait to fix its stream configuration and
/// retry/retention policy. Policies are compile-time constants, not runtime
/// configuration: producers and workers reading the same `StreamDef` cannot
/// disagree about a queue's behavior.
///
/// # Example
///
/// ```rust,ignore
/// use stream_worker::StreamDef;
///
/// pub struct EmailStream;
///
/// impl StreamDef for EmailStream {
///     const STREAM_NAME: &'static str = "email";
///     const CONSUMER_GROUP: &'static str = "email_workers";
///     const DLQ_STREAM: &'static str = "email:dlq";
///     const MAX_ATTEMPTS: u32 = 5;
///     const BACKOFF_BASE_MS: u64 = 5000;
/// }
/// ```
pub trait StreamDef: Send + Sync {
    /// The Redis stream name (the queue name on the wire).
    const STREAM_NAME: &'static str;

    /// The consumer group name for this stream.
    const CONSUMER_GROUP: &'static str;

    /// The dead letter queue stream name for failed jobs.
    const DLQ_STREAM: &'static str;

    /// Maximum stream length before auto-trim (MAXLEN).
    const MAX_LENGTH: i64 = 100_000;

    /// Total attempts a job gets before it is parked as failed.
    const MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential retry backoff, in milliseconds.
    /// Attempt `n` is re-scheduled after `base * 2^(n-1)`.
    const BACKOFF_BASE_MS: u64 = 1000;

    /// Remove completed jobs from the stream instead of keeping them.
    const REMOVE_ON_COMPLETE: bool = true;

    /// How many failed jobs the DLQ retains (oldest evicted beyond the cap).
    const FAIL_RETAIN: i64 = 1000;

    /// Get the stream name.
    fn stream_name() -> &'static str {
        Self::STREAM_NAME
    }

    /// Get the consumer group name.
    fn consumer_group() -> &'static str {
        Self::CONSUMER_GROUP
    }

    /// Get the DLQ stream name.
    fn dlq_stream() -> &'static str {
        Self::DLQ_STREAM
    }
}

/// Trait for stream job payloads.
///
/// Retry bookkeeping rides inside the payload (serde-defaulted), so a bare
/// producer payload deserializes cleanly and a re-queued retry carries its
/// attempt count with it.
pub trait StreamJob: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the job ID for logging and tracking.
    fn job_id(&self) -> String;

    /// Number of failed attempts so far.
    fn retry_count(&self) -> u32;

    /// Creates a new job with an incremented retry count.
    fn with_retry(&self) -> Self;

    /// Check whether the attempt that just failed was the job's last.
    ///
    /// A job with `retry_count` failed attempts behind it is executing
    /// attempt `retry_count + 1`; once that many attempts have been made
    /// the budget is spent.
    fn exhausted(&self, max_attempts: u32) -> bool {
        self.retry_count() + 1 >= max_attempts
    }
}

/// Binds a job type to the queue it belongs to.
///
/// This is what makes `JobDispatcher::enqueue` total: there is no string
/// queue name to mistype, the job type itself names its stream.
pub trait QueueJob: StreamJob {
    type Stream: StreamDef;
}

/// Trait for job processors.
///
/// Domain handlers implement this trait to process jobs from one stream.
/// Handlers must be idempotent: delivery is at-least-once and a job may be
/// re-executed after a crash or a claim race.
#[async_trait]
pub trait StreamProcessor<J: StreamJob>: Send + Sync {
    /// Process a single job.
    ///
    /// Return `Ok(())` for success. Failures are retried or dead-lettered
    /// according to their [`crate::ErrorCategory`]: use
    /// `StreamError::permanent` for inputs that can never succeed so the
    /// retry budget is not wasted on them.
    async fn process(&self, job: &J) -> Result<(), StreamError>;

    /// Get the processor name for logging.
    fn name(&self) -> &'static str;

    /// Health check for the processor.
    ///
    /// Override this to check external services. Default: always healthy.
    async fn health_check(&self) -> Result<bool, StreamError> {
        Ok(true)
    }
}

/// Central registry of the system's queues.
///
/// Every queue a producer can target exists here; monitoring and the DLQ
/// admin endpoints enumerate this enum rather than trusting caller-supplied
/// stream names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, AsRefStr, EnumString, EnumIter)]
pub enum QueueName {
    /// Durable audit-trail rows.
    #[strum(serialize = "activity_log")]
    ActivityLog,
    /// Fan-out for newly created notifications.
    #[strum(serialize = "notification_created")]
    NotificationCreated,
    /// Fan-out for single-notification read receipts.
    #[strum(serialize = "notification_read")]
    NotificationRead,
    /// Fan-out for mark-all-read sweeps.
    #[strum(serialize = "notification_read_all")]
    NotificationReadAll,
    /// Terminal sink for batch-processing summaries.
    #[strum(serialize = "notification_batch_processed")]
    NotificationBatchProcessed,
    /// Transactional email delivery.
    #[strum(serialize = "email")]
    Email,
}

impl QueueName {
    /// Get the stream name string.
    pub fn stream(&self) -> &'static str {
        match self {
            Self::ActivityLog => "activity_log",
            Self::NotificationCreated => "notification_created",
            Self::NotificationRead => "notification_read",
            Self::NotificationReadAll => "notification_read_all",
            Self::NotificationBatchProcessed => "notification_batch_processed",
            Self::Email => "email",
        }
    }

    /// Get the consumer group for this queue.
    pub fn consumer_group(&self) -> &'static str {
        match self {
            Self::ActivityLog => "activity_log_workers",
            Self::NotificationCreated
            | Self::NotificationRead
            | Self::NotificationReadAll
            | Self::NotificationBatchProcessed => "notification_workers",
            Self::Email => "email_workers",
        }
    }

    /// Get the DLQ stream name.
    pub fn dlq(&self) -> String {
        format!("{}:dlq", self.stream())
    }

    /// All queues, for monitoring endpoints.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_name_serialization() {
        assert_eq!(QueueName::ActivityLog.to_string(), "activity_log");
        assert_eq!(QueueName::Email.as_ref(), "email");
    }

    #[test]
    fn test_queue_name_parsing() {
        let queue: QueueName = "notification_created".parse().unwrap();
        assert_eq!(queue, QueueName::NotificationCreated);

        let unknown: Result<QueueName, _> = "orders".parse();
        assert!(unknown.is_err());
    }

    #[test]
    fn test_queue_dlq_names() {
        assert_eq!(QueueName::Email.dlq(), "email:dlq");
        assert_eq!(QueueName::ActivityLog.dlq(), "activity_log:dlq");
    }

    #[test]
    fn test_all_queues_registered() {
        let all: Vec<_> = QueueName::all().collect();
        assert_eq!(all.len(), 6);
        assert!(all.contains(&QueueName::NotificationReadAll));
    }

    struct TestStream;
    impl StreamDef for TestStream {
        const STREAM_NAME: &'static str = "test_stream";
        const CONSUMER_GROUP: &'static str = "test_workers";
        const DLQ_STREAM: &'static str = "test_stream:dlq";
    }

    #[test]
    fn test_stream_def_defaults() {
        assert_eq!(TestStream::stream_name(), "test_stream");
        assert_eq!(TestStream::consumer_group(), "test_workers");
        assert_eq!(TestStream::dlq_stream(), "test_stream:dlq");
        assert_eq!(TestStream::MAX_LENGTH, 100_000);
        assert_eq!(TestStream::MAX_ATTEMPTS, 3);
        assert_eq!(TestStream::BACKOFF_BASE_MS, 1000);
        assert!(TestStream::REMOVE_ON_COMPLETE);
        assert_eq!(TestStream::FAIL_RETAIN, 1000);
    }
}
