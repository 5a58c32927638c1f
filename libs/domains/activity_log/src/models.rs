//! Data models for the activity log domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stream_worker::StreamJob;
use uuid::Uuid;
use validator::Validate;

/// Payload for the `activity_log` queue.
///
/// Field names mirror the domain's log-creation schema (camelCase on the
/// wire). `userId` may reference a user that no longer exists: the row is
/// written with whatever the producer observed; the audit trail records
/// history, it does not enforce referential integrity.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogJob {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[validate(length(min = 1))]
    pub activity_type: String,
    #[validate(length(min = 1))]
    pub entity_type: String,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[validate(length(min = 1))]
    pub description: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub retry_count: u32,
}

impl StreamJob for ActivityLogJob {
    fn job_id(&self) -> String {
        self.id.to_string()
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

/// A durable audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub activity_type: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
