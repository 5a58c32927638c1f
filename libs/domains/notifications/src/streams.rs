//! Stream definitions for the notification queues.
//!
//! All four share the notification retry policy: 3 attempts, 1 second
//! exponential base, auto-remove on success, last 1000 failures retained.

use stream_worker::{QueueJob, StreamDef};

use crate::models::{
    NotificationBatchJob, NotificationCreatedJob, NotificationReadAllJob, NotificationReadJob,
};

/// Fan-out for newly created notifications.
pub struct NotificationCreatedStream;

impl StreamDef for NotificationCreatedStream {
    const STREAM_NAME: &'static str = "notification_created";
    const CONSUMER_GROUP: &'static str = "notification_workers";
    const DLQ_STREAM: &'static str = "notification_created:dlq";
}

impl QueueJob for NotificationCreatedJob {
    type Stream = NotificationCreatedStream;
}

/// Fan-out for single-notification read receipts.
pub struct NotificationReadStream;

impl StreamDef for NotificationReadStream {
    const STREAM_NAME: &'static str = "notification_read";
    const CONSUMER_GROUP: &'static str = "notification_workers";
    const DLQ_STREAM: &'static str = "notification_read:dlq";
}

impl QueueJob for NotificationReadJob {
    type Stream = NotificationReadStream;
}

/// Fan-out for mark-all-read sweeps.
pub struct NotificationReadAllStream;

impl StreamDef for NotificationReadAllStream {
    const STREAM_NAME: &'static str = "notification_read_all";
    const CONSUMER_GROUP: &'static str = "notification_workers";
    const DLQ_STREAM: &'static str = "notification_read_all:dlq";
}

impl QueueJob for NotificationReadAllJob {
    type Stream = NotificationReadAllStream;
}

/// Terminal sink for batch-processing summaries.
pub struct NotificationBatchStream;

impl StreamDef for NotificationBatchStream {
    const STREAM_NAME: &'static str = "notification_batch_processed";
    const CONSUMER_GROUP: &'static str = "notification_workers";
    const DLQ_STREAM: &'static str = "notification_batch_processed:dlq";
}

impl QueueJob for NotificationBatchJob {
    type Stream = NotificationBatchStream;
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_worker::QueueName;

    #[test]
    fn test_stream_defs_match_queue_registry() {
        assert_eq!(
            NotificationCreatedStream::STREAM_NAME,
            QueueName::NotificationCreated.stream()
        );
        assert_eq!(
            NotificationReadStream::STREAM_NAME,
            QueueName::NotificationRead.stream()
        );
        assert_eq!(
            NotificationReadAllStream::STREAM_NAME,
            QueueName::NotificationReadAll.stream()
        );
        assert_eq!(
            NotificationBatchStream::STREAM_NAME,
            QueueName::NotificationBatchProcessed.stream()
        );

        assert_eq!(
            NotificationCreatedStream::CONSUMER_GROUP,
            QueueName::NotificationCreated.consumer_group()
        );
        assert_eq!(
            NotificationCreatedStream::DLQ_STREAM,
            QueueName::NotificationCreated.dlq()
        );
    }

    #[test]
    fn test_notification_retry_policy() {
        assert_eq!(NotificationCreatedStream::MAX_ATTEMPTS, 3);
        assert_eq!(NotificationCreatedStream::BACKOFF_BASE_MS, 1000);
        assert!(NotificationCreatedStream::REMOVE_ON_COMPLETE);
        assert_eq!(NotificationCreatedStream::FAIL_RETAIN, 1000);
    }
}
