//! Processors for the four notification queues.
//!
//! Three of them re-publish a typed event for the realtime gateway; the
//! batch processor is a terminal sink that only logs aggregate counts.

use async_trait::async_trait;
use serde_json::json;
use stream_worker::{StreamError, StreamProcessor};
use tracing::{debug, info};

use crate::error::NotificationError;
use crate::models::{
    FanoutEvent, FanoutEventType, NotificationBatchJob, NotificationCreatedJob,
    NotificationReadAllJob, NotificationReadJob,
};
use crate::publisher::FanoutPublisher;

fn require_recipient(user_id: &str) -> Result<(), NotificationError> {
    if user_id.trim().is_empty() {
        return Err(NotificationError::MissingRecipient("userId".to_string()));
    }
    Ok(())
}

/// Publishes `NEW_NOTIFICATION` events for the `notification_created` queue.
pub struct NotificationCreatedProcessor {
    publisher: FanoutPublisher,
}

impl NotificationCreatedProcessor {
    pub fn new(publisher: FanoutPublisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl StreamProcessor<NotificationCreatedJob> for NotificationCreatedProcessor {
    async fn process(&self, job: &NotificationCreatedJob) -> Result<(), StreamError> {
        require_recipient(&job.user_id)?;

        let event = FanoutEvent::new(
            &job.user_id,
            FanoutEventType::NewNotification,
            json!({
                "id": job.id,
                "titulo": job.titulo,
                "tipo": job.tipo,
            }),
        );

        self.publisher.publish(&event).await?;

        debug!(
            notification_id = %job.id,
            user_id = %job.user_id,
            "Fanned out new notification"
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "notification_created_processor"
    }
}

/// Publishes `NOTIFICATION_READ` events for the `notification_read` queue.
pub struct NotificationReadProcessor {
    publisher: FanoutPublisher,
}

impl NotificationReadProcessor {
    pub fn new(publisher: FanoutPublisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl StreamProcessor<NotificationReadJob> for NotificationReadProcessor {
    async fn process(&self, job: &NotificationReadJob) -> Result<(), StreamError> {
        require_recipient(&job.user_id)?;

        let event = FanoutEvent::new(
            &job.user_id,
            FanoutEventType::NotificationRead,
            json!({ "notificationId": job.notification_id }),
        );

        self.publisher.publish(&event).await?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "notification_read_processor"
    }
}

/// Publishes `ALL_NOTIFICATIONS_READ` events for the `notification_read_all`
/// queue.
pub struct NotificationReadAllProcessor {
    publisher: FanoutPublisher,
}

impl NotificationReadAllProcessor {
    pub fn new(publisher: FanoutPublisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl StreamProcessor<NotificationReadAllJob> for NotificationReadAllProcessor {
    async fn process(&self, job: &NotificationReadAllJob) -> Result<(), StreamError> {
        require_recipient(&job.user_id)?;

        let event = FanoutEvent::new(
            &job.user_id,
            FanoutEventType::AllNotificationsRead,
            json!({ "count": job.count }),
        );

        self.publisher.publish(&event).await?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "notification_read_all_processor"
    }
}

/// Terminal sink for the `notification_batch_processed` queue.
///
/// Batch summaries exist for operators; no event is published and nothing
/// is persisted.
pub struct NotificationBatchProcessor;

impl NotificationBatchProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NotificationBatchProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamProcessor<NotificationBatchJob> for NotificationBatchProcessor {
    async fn process(&self, job: &NotificationBatchJob) -> Result<(), StreamError> {
        info!(
            total = %job.total,
            successes = %job.successes,
            failures = %job.failures,
            "Notification batch processed"
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "notification_batch_processor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_recipient() {
        assert!(require_recipient("u1").is_ok());
        assert!(require_recipient("").is_err());
        assert!(require_recipient("   ").is_err());
    }

    #[tokio::test]
    async fn test_batch_processor_is_terminal() {
        let processor = NotificationBatchProcessor::new();
        let job = NotificationBatchJob {
            total: 10,
            successes: 8,
            failures: 2,
            retry_count: 0,
        };

        assert!(processor.process(&job).await.is_ok());
        assert_eq!(processor.name(), "notification_batch_processor");
    }
}
