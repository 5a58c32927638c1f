//! Prometheus metrics for the job pipeline.
//!
//! Job lifecycle transitions (`started`, `completed`, `failed`, `retried`,
//! `dead_lettered`) are counted per stream; this is the primary signal the
//! operator-facing observability surface consumes.

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus recorder.
///
/// Call this once at startup. Subsequent calls are no-ops.
pub fn init_metrics() {
    let _ = PROMETHEUS_HANDLE.get_or_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install Prometheus recorder");
        info!("Prometheus metrics initialized");
        handle
    });
}

/// Render metrics in Prometheus exposition format.
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_default()
}

/// Record a successful enqueue (dispatcher side).
pub fn record_enqueued(stream: &'static str) {
    counter!("stream_worker_jobs_enqueued_total", "stream" => stream).increment(1);
}

/// Record an enqueue that failed against the broker (dispatcher side).
///
/// Fire-and-forget callers swallow the error; this counter is what
/// operators alert on.
pub fn record_enqueue_failure(stream: &'static str) {
    counter!("stream_worker_enqueue_failures_total", "stream" => stream).increment(1);
}

/// Per-worker metrics helper, labeled by stream and processor.
#[derive(Clone)]
pub struct StreamMetrics {
    stream_name: String,
    processor_name: String,
}

impl StreamMetrics {
    pub fn new(stream_name: impl Into<String>, processor_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            processor_name: processor_name.into(),
        }
    }

    /// A job transitioned to active.
    pub fn job_started(&self) {
        counter!(
            "stream_worker_jobs_started_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    /// A job completed successfully.
    pub fn job_completed(&self, duration: Duration) {
        counter!(
            "stream_worker_jobs_processed_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone(),
            "status" => "completed"
        )
        .increment(1);

        histogram!(
            "stream_worker_job_duration_seconds",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .record(duration.as_secs_f64());
    }

    /// A job attempt failed.
    pub fn job_failed(&self, category: &'static str) {
        counter!(
            "stream_worker_jobs_processed_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone(),
            "status" => "failed"
        )
        .increment(1);

        counter!(
            "stream_worker_job_errors_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone(),
            "category" => category
        )
        .increment(1);
    }

    /// A job was re-scheduled for another attempt.
    pub fn job_retried(&self) {
        counter!(
            "stream_worker_jobs_retried_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    /// A job was parked in the DLQ.
    pub fn job_dead_lettered(&self) {
        counter!(
            "stream_worker_jobs_dlq_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    /// Time an entry spent queued before its handler started.
    pub fn job_wait(&self, wait: Duration) {
        histogram!(
            "stream_worker_job_wait_seconds",
            "stream" => self.stream_name.clone()
        )
        .record(wait.as_secs_f64());
    }

    /// Currently executing jobs.
    pub fn in_flight(&self, count: usize) {
        gauge!(
            "stream_worker_in_flight_jobs",
            "stream" => self.stream_name.clone()
        )
        .set(count as f64);
    }

    /// Stream depth gauge (health endpoint refresh).
    pub fn stream_depth(&self, depth: i64) {
        gauge!(
            "stream_worker_stream_depth",
            "stream" => self.stream_name.clone()
        )
        .set(depth as f64);
    }
}
