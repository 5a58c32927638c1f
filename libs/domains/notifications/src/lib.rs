//! Notification fan-out domain.
//!
//! The notification row itself is written synchronously by the domain
//! service before anything lands here; these consumers only carry the
//! "tell connected clients" side effect. Each handler builds a small typed
//! event and publishes it on one shared pub/sub channel, keyed by
//! recipient; the realtime gateway filters by recipient and pushes to live
//! connections. Loss is tolerated; the row is the source of truth.

pub mod error;
pub mod models;
pub mod processor;
pub mod publisher;
pub mod streams;

pub use error::{NotificationError, NotificationResult};
pub use models::{
    FanoutEvent, FanoutEventType, FanoutPayload, NotificationBatchJob, NotificationCreatedJob,
    NotificationReadAllJob, NotificationReadJob,
};
pub use processor::{
    NotificationBatchProcessor, NotificationCreatedProcessor, NotificationReadAllProcessor,
    NotificationReadProcessor,
};
pub use publisher::{FanoutPublisher, NOTIFICATIONS_CHANNEL};
pub use streams::{
    NotificationBatchStream, NotificationCreatedStream, NotificationReadAllStream,
    NotificationReadStream,
};
