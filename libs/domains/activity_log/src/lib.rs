//! Activity log domain: the audit-trail consumer.
//!
//! Rows are created only by the consumer from queue payloads, never mutated
//! and never deleted by this subsystem. Inserting the row and invalidating
//! the `activity_logs` list/stats cache patterns happen in the same logical
//! operation; a duplicate insert after a retry is tolerated, a stale list
//! page is not.

pub mod entity;
pub mod error;
pub mod models;
pub mod postgres;
pub mod processor;
pub mod repository;
pub mod streams;

pub use error::ActivityLogError;
pub use models::{ActivityLogEntry, ActivityLogJob};
pub use postgres::PgActivityLogRepository;
pub use processor::ActivityLogProcessor;
pub use repository::ActivityLogRepository;
pub use streams::ActivityLogStream;
