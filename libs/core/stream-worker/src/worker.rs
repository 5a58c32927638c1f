//! The generic StreamWorker implementation.
//!
//! One worker binds one queue to one processor. Per job the state machine
//! is: pending → active → completed, re-scheduled (while attempts remain
//! and the error is retryable), or dead-lettered. Every transition is
//! logged and counted. The queue, not the handler, owns all state
//! transitions.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use redis::aio::ConnectionManager;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::consumer::StreamConsumer;
use crate::dlq::DlqManager;
use crate::error::StreamError;
use crate::event::StreamEvent;
use crate::metrics::StreamMetrics;
use crate::registry::{StreamJob, StreamProcessor};

/// Generic stream worker that processes jobs using a processor.
///
/// - Consumer group management and pending-entry recovery
/// - Bounded concurrency (`max_concurrent_jobs`) over one queue
/// - Categorized retry with exponential backoff; permanent errors and
///   exhausted jobs go to the bounded DLQ
/// - Graceful shutdown: stops reading and drains in-flight jobs
///
/// Delivery is at-least-once. A retry waits out its backoff while the
/// original entry is still pending, so a crash mid-wait is recovered by the
/// claim loop rather than lost; the flip side is that a claim timeout
/// shorter than the worst-case backoff can re-deliver a waiting retry.
/// Handlers are idempotent by contract, so the duplicate is safe.
pub struct StreamWorker<J, P>
where
    J: StreamJob,
    P: StreamProcessor<J>,
{
    consumer: StreamConsumer,
    dlq: DlqManager,
    processor: Arc<P>,
    config: WorkerConfig,
    semaphore: Arc<Semaphore>,
    metrics: StreamMetrics,
    in_flight: Arc<AtomicUsize>,
    _phantom: PhantomData<J>,
}

impl<J, P> StreamWorker<J, P>
where
    J: StreamJob + 'static,
    P: StreamProcessor<J> + 'static,
{
    /// Create a new stream worker.
    pub fn new(redis: ConnectionManager, processor: P, config: WorkerConfig) -> Self {
        Self::with_arc_processor(redis, Arc::new(processor), config)
    }

    /// Create a new stream worker sharing an existing processor.
    pub fn with_arc_processor(
        redis: ConnectionManager,
        processor: Arc<P>,
        config: WorkerConfig,
    ) -> Self {
        let consumer = StreamConsumer::new(redis.clone(), config.clone());
        let dlq = DlqManager::new(redis, config.dlq_stream.clone(), config.fail_retain);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let metrics = StreamMetrics::new(config.stream_name.clone(), processor.name());

        Self {
            consumer,
            dlq,
            processor,
            semaphore,
            metrics,
            in_flight: Arc::new(AtomicUsize::new(0)),
            config,
            _phantom: PhantomData,
        }
    }

    /// Run the worker loop.
    ///
    /// Continuously reads jobs from the stream and processes them. Flip the
    /// shutdown receiver to stop: the worker finishes in-flight jobs before
    /// returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), StreamError> {
        info!(
            consumer_id = %self.config.consumer_id,
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            processor = %self.processor.name(),
            max_attempts = %self.config.max_attempts,
            backoff_base_ms = %self.config.backoff_base_ms,
            max_concurrent_jobs = %self.config.max_concurrent_jobs,
            batch_size = %self.config.batch_size,
            "Starting stream worker"
        );

        self.consumer.ensure_consumer_group().await?;

        // Restarted workers get fresh consumer IDs; adopt anything a
        // previous incarnation left pending.
        match self.consumer.claim_all_pending_on_startup().await {
            Ok(n) if n > 0 => info!(count = n, "Claimed pending entries on startup"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to claim pending entries on startup"),
        }

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let claim_interval = Duration::from_millis(self.config.claim_idle_ms * 2);
        let mut last_claim = std::time::Instant::now();
        let is_blocking = self.config.is_blocking();

        // Consecutive broker errors drive the loop-level backoff
        let mut consecutive_errors: u32 = 0;
        const MAX_BACKOFF_SECS: u64 = 30;

        loop {
            if *shutdown.borrow() {
                info!("Received shutdown signal, stopping worker");
                break;
            }

            match self.process_batch(&shutdown).await {
                Ok(_) => {
                    if consecutive_errors > 0 {
                        info!("Connection recovered after {} errors", consecutive_errors);
                        consecutive_errors = 0;
                    }
                }
                Err(e) => {
                    // BLOCK expiry just means no messages arrived
                    if e.is_block_timeout() {
                        debug!("Block timeout, no entries");
                        continue;
                    }

                    consecutive_errors += 1;

                    if e.is_nogroup_error() {
                        warn!("Consumer group missing, recreating...");
                        if let Err(create_err) = self.consumer.ensure_consumer_group().await {
                            error!(error = %create_err, "Failed to recreate consumer group");
                        }
                    } else if e.is_connection_error() {
                        let backoff_secs = std::cmp::min(
                            2u64.pow(consecutive_errors.min(5)),
                            MAX_BACKOFF_SECS,
                        );
                        warn!(
                            error = %e,
                            consecutive_errors = %consecutive_errors,
                            backoff_secs = %backoff_secs,
                            "Broker connection error, backing off"
                        );
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    } else {
                        error!(error = %e, "Error processing batch");
                    }

                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            }

            // Periodically adopt entries abandoned by crashed consumers and
            // refresh the depth gauge
            if last_claim.elapsed() >= claim_interval {
                if let Err(e) = self.consumer.claim_abandoned().await {
                    debug!(error = %e, "Error claiming abandoned entries");
                }
                if let Ok(info) = self.consumer.stream_info().await {
                    self.metrics.stream_depth(info.length);
                }
                last_claim = std::time::Instant::now();
            }

            // Blocking reads already waited on the broker; in polling mode
            // sleep between reads, waking early on shutdown
            if !is_blocking {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("Received shutdown signal, stopping worker");
                            break;
                        }
                    }
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }

        info!(stream = %self.config.stream_name, "Stream worker stopped");
        Ok(())
    }

    /// Read one batch (pending first, then new) and process it with bounded
    /// concurrency. Returns once every job in the batch is settled.
    async fn process_batch(&self, shutdown: &watch::Receiver<bool>) -> Result<(), StreamError> {
        let pending = self.consumer.read_pending::<J>().await?;
        let new_entries = self.consumer.read_new::<J>().await?;

        if pending.is_empty() && new_entries.is_empty() {
            return Ok(());
        }

        let mut join_set: JoinSet<()> = JoinSet::new();

        for event in pending.into_iter().chain(new_entries) {
            let semaphore = Arc::clone(&self.semaphore);
            let processor = Arc::clone(&self.processor);
            let consumer = self.consumer.clone();
            let dlq = self.dlq.clone();
            let config = self.config.clone();
            let metrics = self.metrics.clone();
            let in_flight = Arc::clone(&self.in_flight);
            let shutdown = shutdown.clone();

            join_set.spawn(async move {
                // The semaphore is fair, so start order within a batch
                // follows enqueue order. Completion order is unspecified.
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };

                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                metrics.in_flight(current);

                Self::run_job(&processor, &consumer, &dlq, &config, &metrics, event, shutdown)
                    .await;

                let current = in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
                metrics.in_flight(current);
            });
        }

        while join_set.join_next().await.is_some() {}

        Ok(())
    }

    /// Drive one job through the state machine.
    async fn run_job(
        processor: &Arc<P>,
        consumer: &StreamConsumer,
        dlq: &DlqManager,
        config: &WorkerConfig,
        metrics: &StreamMetrics,
        event: StreamEvent<J>,
        shutdown: watch::Receiver<bool>,
    ) {
        let job = &event.job;
        let stream_id = &event.stream_id;

        metrics.job_wait(event.age().to_std().unwrap_or_default());
        metrics.job_started();
        info!(
            job_id = %job.job_id(),
            stream = %config.stream_name,
            stream_id = %stream_id,
            attempt = %(job.retry_count() + 1),
            "Job started"
        );

        let start = std::time::Instant::now();

        match processor.process(job).await {
            Ok(()) => {
                metrics.job_completed(start.elapsed());
                info!(
                    job_id = %job.job_id(),
                    stream = %config.stream_name,
                    duration_ms = %start.elapsed().as_millis(),
                    "Job completed"
                );

                if let Err(e) = consumer.ack_and_cleanup(stream_id).await {
                    error!(stream_id = %stream_id, error = %e, "Failed to ACK completed job");
                }
            }
            Err(e) => {
                let category = e.category();
                metrics.job_failed(category.as_str());
                warn!(
                    job_id = %job.job_id(),
                    stream = %config.stream_name,
                    stream_id = %stream_id,
                    error = %e,
                    error_category = %category.as_str(),
                    "Job failed"
                );

                if let Err(handler_err) =
                    Self::handle_failure(consumer, dlq, config, metrics, &event, e, shutdown).await
                {
                    error!(
                        stream_id = %stream_id,
                        error = %handler_err,
                        "Failed to handle job failure"
                    );
                    // Still ACK to prevent an infinite redelivery loop
                    let _ = consumer.ack(stream_id).await;
                }
            }
        }
    }

    /// Decide between dead-lettering and a backed-off retry.
    async fn handle_failure(
        consumer: &StreamConsumer,
        dlq: &DlqManager,
        config: &WorkerConfig,
        metrics: &StreamMetrics,
        event: &StreamEvent<J>,
        error: StreamError,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), StreamError> {
        let job = &event.job;
        let category = error.category();

        // Permanent errors skip the retry budget: a payload that can never
        // succeed should not spend attempts failing
        if !category.should_retry() {
            warn!(
                job_id = %job.job_id(),
                stream = %config.stream_name,
                "Permanent error, dead-lettering without retry"
            );

            dlq.move_to_dlq(job, &error.to_string(), &event.stream_id)
                .await?;
            metrics.job_dead_lettered();
            consumer.ack_and_cleanup(&event.stream_id).await?;
            return Ok(());
        }

        if job.exhausted(config.max_attempts) {
            warn!(
                job_id = %job.job_id(),
                stream = %config.stream_name,
                max_attempts = %config.max_attempts,
                "Job exhausted its attempts, dead-lettering"
            );

            dlq.move_to_dlq(job, &error.to_string(), &event.stream_id)
                .await?;
            metrics.job_dead_lettered();
            consumer.ack_and_cleanup(&event.stream_id).await?;
            return Ok(());
        }

        let delay = config.backoff_delay(job.retry_count());
        metrics.job_retried();
        info!(
            job_id = %job.job_id(),
            stream = %config.stream_name,
            next_attempt = %(job.retry_count() + 2),
            delay_ms = %delay.as_millis(),
            "Job retry scheduled"
        );

        // Wait out the backoff with the original entry still pending: if we
        // die here, the claim loop re-delivers it. On shutdown the retry is
        // intentionally left pending for the next incarnation.
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                consumer.requeue(&job.with_retry()).await?;
                consumer.ack_and_cleanup(&event.stream_id).await?;
            }
            _ = wait_for_shutdown(&mut shutdown) => {
                info!(
                    job_id = %job.job_id(),
                    stream = %config.stream_name,
                    "Shutdown during retry backoff, leaving entry pending"
                );
            }
        }

        Ok(())
    }
}

/// Resolve once the shutdown flag flips (or the channel closes).
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
