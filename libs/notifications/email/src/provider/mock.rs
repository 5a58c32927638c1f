//! Mock email provider for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eyre::Result;
use uuid::Uuid;

use super::{EmailProvider, OutboundEmail, SendResult};

/// Records sends instead of performing them; optionally fails every send
/// with a fixed error message.
#[derive(Clone, Default)]
pub struct MockSmtpProvider {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    fail_with: Option<String>,
}

impl MockSmtpProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail with `message`.
    pub fn failing_with(message: impl Into<String>) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(message.into()),
        }
    }

    /// Emails sent so far.
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailProvider for MockSmtpProvider {
    async fn send(&self, email: &OutboundEmail) -> Result<SendResult> {
        if let Some(message) = &self.fail_with {
            return Err(eyre::eyre!("{}", message));
        }

        self.sent.lock().unwrap().push(email.clone());

        Ok(SendResult {
            message_id: Uuid::new_v4().to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_sends() {
        let provider = MockSmtpProvider::new();

        let email = OutboundEmail {
            to: "user@example.com".to_string(),
            subject: "Test".to_string(),
            body_html: Some("<p>hi</p>".to_string()),
            body_text: None,
        };

        provider.send(&email).await.unwrap();

        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "user@example.com");
    }

    #[tokio::test]
    async fn test_mock_failure_mode() {
        let provider = MockSmtpProvider::failing_with("connection refused");

        let email = OutboundEmail {
            to: "user@example.com".to_string(),
            subject: "Test".to_string(),
            body_html: None,
            body_text: Some("hi".to_string()),
        };

        let err = provider.send(&email).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert!(provider.sent().is_empty());
    }
}
