//! Repository contract for audit rows.
//!
//! The narrow persistence seam the consumer depends on. Inserts only:
//! this subsystem never mutates or deletes audit rows; reads belong to the
//! request/response surface.

use async_trait::async_trait;

use crate::error::ActivityLogError;
use crate::models::{ActivityLogEntry, ActivityLogJob};

#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    /// Persist one audit row built from a queue payload.
    async fn insert(&self, job: &ActivityLogJob) -> Result<ActivityLogEntry, ActivityLogError>;
}
