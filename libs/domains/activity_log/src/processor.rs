//! Processor for the `activity_log` queue.

use std::sync::Arc;

use async_trait::async_trait;
use cache::Cache;
use stream_worker::{StreamError, StreamProcessor};
use tracing::info;
use validator::Validate;

use crate::error::ActivityLogError;
use crate::models::ActivityLogJob;
use crate::repository::ActivityLogRepository;

/// Cached collection reads live under this resource prefix.
const CACHE_RESOURCE: &str = "activity_logs";

/// Inserts the audit row, then invalidates every cached list and stats page
/// for the resource. The invalidation is deliberately coarse: no attempt is
/// made to target only affected pages.
pub struct ActivityLogProcessor<R: ActivityLogRepository> {
    repository: Arc<R>,
    cache: Cache,
}

impl<R: ActivityLogRepository> ActivityLogProcessor<R> {
    pub fn new(repository: R, cache: Cache) -> Self {
        Self {
            repository: Arc::new(repository),
            cache,
        }
    }
}

#[async_trait]
impl<R: ActivityLogRepository + 'static> StreamProcessor<ActivityLogJob>
    for ActivityLogProcessor<R>
{
    async fn process(&self, job: &ActivityLogJob) -> Result<(), StreamError> {
        job.validate()
            .map_err(|e| StreamError::from(ActivityLogError::Validation(e)))?;

        let entry = self
            .repository
            .insert(job)
            .await
            .map_err(StreamError::from)?;

        // Same logical operation as the insert: a failure here retries the
        // whole job rather than leaving stale list pages behind
        self.cache
            .invalidate_lists_for(CACHE_RESOURCE)
            .await
            .map_err(|e| StreamError::from(ActivityLogError::Cache(e)))?;

        info!(
            entry_id = %entry.id,
            activity_type = %entry.activity_type,
            entity_type = %entry.entity_type,
            user_id = entry.user_id.as_deref().unwrap_or("-"),
            "Recorded activity"
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "activity_log_processor"
    }
}

