//! Stream definition for the `email` queue.

use stream_worker::{QueueJob, StreamDef};

use crate::job::EmailJob;

/// Email jobs get a larger budget than the other queues: 5 attempts with a
/// 5 second exponential base, since mail relays throttle and flake more
/// than the broker or the database.
pub struct EmailStream;

impl StreamDef for EmailStream {
    const STREAM_NAME: &'static str = "email";
    const CONSUMER_GROUP: &'static str = "email_workers";
    const DLQ_STREAM: &'static str = "email:dlq";
    const MAX_ATTEMPTS: u32 = 5;
    const BACKOFF_BASE_MS: u64 = 5000;
}

impl QueueJob for EmailJob {
    type Stream = EmailStream;
}
