//! Stream Worker Framework
//!
//! A Redis Streams job-queue framework for the marketplace's asynchronous
//! side effects (audit logging, notification fan-out, transactional email).
//!
//! ## Features
//!
//! - **Per-queue policy**: each `StreamDef` fixes its max attempts, backoff
//!   base, remove-on-complete behavior and failed-job retention at compile
//!   time
//! - **Typed dispatch**: `JobDispatcher::enqueue` takes a job type that
//!   names its own queue, so an unknown queue cannot be expressed
//! - **Consumer groups**: horizontal scaling with pending-message recovery
//! - **Categorized retries**: transient errors back off exponentially,
//!   permanent errors dead-letter immediately
//! - **Bounded dead letter queues**: failed jobs retained up to a cap
//! - **Prometheus metrics** and K8s-ready health endpoints
//! - **Graceful shutdown**: stop reading, drain in-flight jobs
//!
//! ## Example
//!
//! ```ignore
//! use stream_worker::{StreamWorker, StreamJob, StreamProcessor, StreamDef, WorkerConfig};
//!
//! struct MyStream;
//! impl StreamDef for MyStream {
//!     const STREAM_NAME: &'static str = "my_jobs";
//!     const CONSUMER_GROUP: &'static str = "my_workers";
//!     const DLQ_STREAM: &'static str = "my_jobs:dlq";
//! }
//!
//! let config = WorkerConfig::from_stream_def::<MyStream>();
//! let worker = StreamWorker::new(redis, processor, config);
//! worker.run(shutdown_rx).await?;
//! ```

mod config;
mod consumer;
mod dispatcher;
mod dlq;
mod error;
mod event;
mod health;
pub mod metrics;
mod producer;
mod rate_limit;
mod registry;
mod worker;

pub use config::WorkerConfig;
pub use consumer::{StreamConsumer, StreamInfo};
pub use dispatcher::JobDispatcher;
pub use dlq::{DlqEntry, DlqManager, DlqStats};
pub use error::{ErrorCategory, StreamError};
pub use event::StreamEvent;
pub use health::{HealthState, health_router};
pub use metrics::{StreamMetrics, init_metrics, render_metrics};
pub use producer::StreamProducer;
pub use rate_limit::RateLimiter;
pub use registry::{QueueJob, QueueName, StreamDef, StreamJob, StreamProcessor};
pub use worker::StreamWorker;
