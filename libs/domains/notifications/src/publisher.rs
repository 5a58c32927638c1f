//! Fan-out event publisher.
//!
//! Publishes every event onto one shared channel; the realtime gateway owns
//! filtering by recipient and pushing to live connections. A publish with
//! zero subscribers is not an error; delivery loss is tolerated because
//! the notification row is persisted upstream before the job exists.

use redis::aio::ConnectionManager;
use tracing::debug;

use crate::error::NotificationResult;
use crate::models::FanoutEvent;

/// The single pub/sub channel shared by all notification events.
pub const NOTIFICATIONS_CHANNEL: &str = "notifications:events";

#[derive(Clone)]
pub struct FanoutPublisher {
    redis: ConnectionManager,
    channel: String,
}

impl FanoutPublisher {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            channel: NOTIFICATIONS_CHANNEL.to_string(),
        }
    }

    /// Override the channel (tests).
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Publish one event. Returns the number of subscribers that received it.
    pub async fn publish(&self, event: &FanoutEvent) -> NotificationResult<i64> {
        let mut conn = self.redis.clone();
        let message = serde_json::to_string(event)?;

        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(&message)
            .query_async(&mut conn)
            .await?;

        debug!(
            channel = %self.channel,
            user_id = %event.user_id,
            receivers = %receivers,
            "Published fan-out event"
        );

        Ok(receivers)
    }
}
