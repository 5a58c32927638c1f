//! Typed job dispatcher: the single entry point every service uses to hand
//! off side effects.
//!
//! A job type names its own queue through [`QueueJob::Stream`], so there is
//! no string queue name to mistype and no "unknown queue" silent-no-op
//! failure mode.
//!
//! Two contracts are offered:
//!
//! - [`JobDispatcher::enqueue`] returns the broker's answer. Callers that
//!   can surface or retry an enqueue failure should use this.
//! - [`JobDispatcher::enqueue_detached`] is fire-and-forget for the
//!   synchronous request path: side effects must never block or fail the
//!   primary business transaction, so failures are logged and counted
//!   (`stream_worker_enqueue_failures_total`) instead of propagated.

use redis::aio::ConnectionManager;
use tracing::warn;

use crate::error::StreamError;
use crate::metrics;
use crate::producer::StreamProducer;
use crate::registry::{QueueJob, StreamDef, StreamJob};

/// Shared dispatcher over the broker connection.
#[derive(Clone)]
pub struct JobDispatcher {
    redis: ConnectionManager,
}

impl JobDispatcher {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Enqueue a job onto its queue. Returns the stream entry ID.
    pub async fn enqueue<J: QueueJob>(&self, job: &J) -> Result<String, StreamError> {
        let producer = StreamProducer::from_stream_def::<J::Stream>(self.redis.clone());
        let stream_id = producer.send(job).await?;

        metrics::record_enqueued(<J::Stream as StreamDef>::STREAM_NAME);

        Ok(stream_id)
    }

    /// Enqueue without waiting on or surfacing the outcome.
    ///
    /// The append happens on a spawned task; a broker failure is logged and
    /// counted, and the caller proceeds as if nothing happened. The side
    /// effect is dropped in that case, an accepted trade-off for the
    /// request path.
    pub fn enqueue_detached<J: QueueJob + 'static>(&self, job: J) {
        let dispatcher = self.clone();

        tokio::spawn(async move {
            if let Err(e) = dispatcher.enqueue(&job).await {
                warn!(
                    queue = %<J::Stream as StreamDef>::STREAM_NAME,
                    job_id = %job.job_id(),
                    error = %e,
                    "Enqueue failed, side effect dropped"
                );
                metrics::record_enqueue_failure(<J::Stream as StreamDef>::STREAM_NAME);
            }
        });
    }
}
