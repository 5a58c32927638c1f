//! EmailJob - the `email` queue payload.

use serde::{Deserialize, Serialize};
use stream_worker::StreamJob;
use uuid::Uuid;

/// Payload for the `email` queue: a template identifier, a recipient
/// address and the template data.
///
/// Both identifiers are optional at the wire level on purpose: a malformed
/// producer payload must still deserialize so the consumer can apply its
/// skip contract instead of churning through retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJob {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Template identifier (e.g. "welcome", "order_confirmation").
    #[serde(default)]
    pub template: Option<String>,

    /// Recipient address.
    #[serde(default)]
    pub to: Option<String>,

    /// Template data, passed through to the renderer.
    #[serde(default)]
    pub data: serde_json::Value,

    #[serde(default)]
    pub retry_count: u32,
}

impl EmailJob {
    pub fn new(
        template: impl Into<String>,
        to: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            template: Some(template.into()),
            to: Some(to.into()),
            data,
            retry_count: 0,
        }
    }
}

impl StreamJob for EmailJob {
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
