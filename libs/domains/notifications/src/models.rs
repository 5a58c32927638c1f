//! Job payloads and fan-out event types.
//!
//! Payload field names are the stable wire contract with producers
//! (camelCase, `titulo`/`tipo` verbatim). Retry bookkeeping is
//! serde-defaulted so a bare producer payload deserializes cleanly.

use serde::{Deserialize, Serialize};
use stream_worker::StreamJob;

// ============================================================================
// Queue payloads
// ============================================================================

/// Payload for the `notification_created` queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationCreatedJob {
    /// Notification row ID (written synchronously upstream).
    pub id: String,
    pub user_id: String,
    pub titulo: String,
    pub tipo: String,
    #[serde(default)]
    pub retry_count: u32,
}

impl StreamJob for NotificationCreatedJob {
    fn job_id(&self) -> String {
        self.id.clone()
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn with_retry(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

/// Payload for the `notification_read` queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReadJob {
    pub notification_id: String,
    pub user_id: String,
    #[serde(default)]
    pub retry_count: u32,
}

impl StreamJob for NotificationReadJob {
    fn job_id(&self) -> String {
        self.notification_id.clone()
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn with_retry(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

/// Payload for the `notification_read_all` queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReadAllJob {
    pub user_id: String,
    /// How many notifications the sweep marked read.
    pub count: u64,
    #[serde(default)]
    pub retry_count: u32,
}

impl StreamJob for NotificationReadAllJob {
    fn job_id(&self) -> String {
        format!("read_all:{}", self.user_id)
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn with_retry(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

/// Payload for the `notification_batch_processed` queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationBatchJob {
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    #[serde(default)]
    pub retry_count: u32,
}

impl StreamJob for NotificationBatchJob {
    fn job_id(&self) -> String {
        format!("batch:{}/{}/{}", self.successes, self.failures, self.total)
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn with_retry(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

// ============================================================================
// Fan-out events (pub/sub wire format)
// ============================================================================

/// Event type pushed to live client connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FanoutEventType {
    NewNotification,
    NotificationRead,
    AllNotificationsRead,
}

/// Typed payload inside a fan-out event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutPayload {
    #[serde(rename = "type")]
    pub event_type: FanoutEventType,
    pub data: serde_json::Value,
}

/// One serialized message on the shared pub/sub channel.
///
/// The realtime gateway filters by `userId`; this subsystem has no idea
/// which connections exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanoutEvent {
    pub user_id: String,
    pub payload: FanoutPayload,
}

impl FanoutEvent {
    pub fn new(user_id: impl Into<String>, event_type: FanoutEventType, data: serde_json::Value) -> Self {
        Self {
            user_id: user_id.into(),
            payload: FanoutPayload { event_type, data },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_created_job_parses_bare_producer_payload() {
        let job: NotificationCreatedJob = serde_json::from_str(
            r#"{"id":"n1","userId":"u1","titulo":"Hi","tipo":"sistema"}"#,
        )
        .unwrap();

        assert_eq!(job.id, "n1");
        assert_eq!(job.user_id, "u1");
        assert_eq!(job.titulo, "Hi");
        assert_eq!(job.tipo, "sistema");
        assert_eq!(job.retry_count, 0);
    }

    #[test]
    fn test_read_job_wire_names() {
        let job: NotificationReadJob =
            serde_json::from_str(r#"{"notificationId":"n2","userId":"u1"}"#).unwrap();
        assert_eq!(job.notification_id, "n2");

        let round_trip = serde_json::to_value(&job).unwrap();
        assert!(round_trip.get("notificationId").is_some());
        assert!(round_trip.get("notification_id").is_none());
    }

    #[test]
    fn test_retry_preserves_payload() {
        let job: NotificationReadAllJob =
            serde_json::from_str(r#"{"userId":"u9","count":12}"#).unwrap();

        let retried = job.with_retry();
        assert_eq!(retried.retry_count, 1);
        assert_eq!(retried.user_id, "u9");
        assert_eq!(retried.count, 12);
    }

    #[test]
    fn test_fanout_event_wire_format() {
        let event = FanoutEvent::new(
            "u1",
            FanoutEventType::NewNotification,
            json!({"id": "n1", "titulo": "Hi", "tipo": "sistema"}),
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["payload"]["type"], "NEW_NOTIFICATION");
        assert_eq!(value["payload"]["data"]["id"], "n1");
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(
            serde_json::to_value(FanoutEventType::NotificationRead).unwrap(),
            "NOTIFICATION_READ"
        );
        assert_eq!(
            serde_json::to_value(FanoutEventType::AllNotificationsRead).unwrap(),
            "ALL_NOTIFICATIONS_READ"
        );
    }
}
