//! Stream definition for the `activity_log` queue.

use stream_worker::{QueueJob, StreamDef};

use crate::models::ActivityLogJob;

/// Audit-trail jobs: 3 attempts, 1 second exponential base, auto-remove on
/// success, last 1000 failures retained.
pub struct ActivityLogStream;

impl StreamDef for ActivityLogStream {
    const STREAM_NAME: &'static str = "activity_log";
    const CONSUMER_GROUP: &'static str = "activity_log_workers";
    const DLQ_STREAM: &'static str = "activity_log:dlq";
}

impl QueueJob for ActivityLogJob {
    type Stream = ActivityLogStream;
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_worker::QueueName;

    #[test]
    fn test_stream_def_matches_queue_registry() {
        assert_eq!(ActivityLogStream::STREAM_NAME, QueueName::ActivityLog.stream());
        assert_eq!(
            ActivityLogStream::CONSUMER_GROUP,
            QueueName::ActivityLog.consumer_group()
        );
        assert_eq!(ActivityLogStream::DLQ_STREAM, QueueName::ActivityLog.dlq());
    }

    #[test]
    fn test_retry_policy() {
        assert_eq!(ActivityLogStream::MAX_ATTEMPTS, 3);
        assert_eq!(ActivityLogStream::BACKOFF_BASE_MS, 1000);
        assert!(ActivityLogStream::REMOVE_ON_COMPLETE);
        assert_eq!(ActivityLogStream::FAIL_RETAIN, 1000);
    }
}
