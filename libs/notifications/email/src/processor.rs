//! Processor for the `email` queue.

use std::sync::Arc;

use async_trait::async_trait;
use stream_worker::{StreamError, StreamProcessor};
use tracing::{info, warn};

use crate::job::EmailJob;
use crate::provider::{EmailProvider, OutboundEmail};
use crate::templates::TemplateEngine;

/// Renders the template and drives the shared transport.
///
/// Malformed input (no recipient, no template identifier, or an unknown
/// template) is logged and the job completes without sending. Retrying
/// input that can never send would only waste the attempt budget, and the
/// DLQ is reserved for jobs that should have succeeded. Transport failures
/// are rethrown so the standard retry/backoff applies.
pub struct EmailProcessor<P: EmailProvider> {
    provider: Arc<P>,
    templates: Arc<TemplateEngine>,
}

impl<P: EmailProvider> EmailProcessor<P> {
    pub fn new(provider: P, templates: TemplateEngine) -> Self {
        Self {
            provider: Arc::new(provider),
            templates: Arc::new(templates),
        }
    }
}

/// Classify a transport error by its message.
fn classify_send_error(err: eyre::Report) -> StreamError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();

    if lower.contains("rate limit") || lower.contains("429") {
        StreamError::rate_limited(msg)
    } else if lower.contains("invalid") || lower.contains("malformed") {
        StreamError::permanent(msg)
    } else {
        StreamError::transient(msg)
    }
}

#[async_trait]
impl<P: EmailProvider + 'static> StreamProcessor<EmailJob> for EmailProcessor<P> {
    async fn process(&self, job: &EmailJob) -> Result<(), StreamError> {
        let Some(to) = job.to.as_deref().filter(|t| !t.trim().is_empty()) else {
            warn!(job_id = %job.id, "Email job missing recipient address, skipping");
            return Ok(());
        };

        let Some(template) = job.template.as_deref().filter(|t| !t.trim().is_empty()) else {
            warn!(job_id = %job.id, to = %to, "Email job missing template identifier, skipping");
            return Ok(());
        };

        if !self.templates.contains(template) {
            warn!(
                job_id = %job.id,
                template = %template,
                to = %to,
                "Unknown email template, skipping"
            );
            return Ok(());
        }

        // A registered template failing to render is a bug in the template,
        // not in the job; no amount of retrying fixes it
        let rendered = self
            .templates
            .render(template, &job.data)
            .map_err(|e| StreamError::permanent(e.to_string()))?;

        let email = OutboundEmail {
            to: to.to_string(),
            subject: rendered.subject,
            body_html: Some(rendered.html),
            body_text: rendered.text,
        };

        let result = self
            .provider
            .send(&email)
            .await
            .map_err(classify_send_error)?;

        info!(
            job_id = %job.id,
            template = %template,
            to = %to,
            message_id = %result.message_id,
            "Email sent"
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "email_processor"
    }

    async fn health_check(&self) -> Result<bool, StreamError> {
        self.provider
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| StreamError::transient(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockSmtpProvider;
    use serde_json::json;
    use stream_worker::ErrorCategory;

    fn processor_with(provider: MockSmtpProvider) -> EmailProcessor<MockSmtpProvider> {
        EmailProcessor::new(provider, TemplateEngine::new().unwrap())
    }

    #[tokio::test]
    async fn test_missing_recipient_skips_without_error() {
        let provider = MockSmtpProvider::new();
        let processor = processor_with(provider.clone());

        let job: EmailJob = serde_json::from_str(
            r#"{"template":"welcome","data":{"name":"Ana"}}"#,
        )
        .unwrap();

        processor.process(&job).await.expect("skip is a success");
        assert!(provider.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_template_skips_without_error() {
        let provider = MockSmtpProvider::new();
        let processor = processor_with(provider.clone());

        let job: EmailJob =
            serde_json::from_str(r#"{"to":"user@example.com","data":{}}"#).unwrap();

        processor.process(&job).await.expect("skip is a success");
        assert!(provider.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_template_skips_without_error() {
        let provider = MockSmtpProvider::new();
        let processor = processor_with(provider.clone());

        let job = EmailJob::new("no_such_template", "user@example.com", json!({}));

        processor.process(&job).await.expect("skip is a success");
        assert!(provider.sent().is_empty());
    }

    #[tokio::test]
    async fn test_valid_job_renders_and_sends() {
        let provider = MockSmtpProvider::new();
        let processor = processor_with(provider.clone());

        let job = EmailJob::new(
            "welcome",
            "ana@example.com",
            json!({"name": "Ana", "storeName": "Mercado"}),
        );

        processor.process(&job).await.expect("send");

        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@example.com");
        assert_eq!(sent[0].subject, "Welcome to Mercado!");
        assert!(sent[0].body_html.as_deref().unwrap().contains("Ana"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_transient() {
        let provider = MockSmtpProvider::failing_with("connection refused by relay");
        let processor = processor_with(provider);

        let job = EmailJob::new("welcome", "ana@example.com", json!({"name": "Ana"}));

        let err = processor.process(&job).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transient);
    }

    #[tokio::test]
    async fn test_rate_limit_failure_is_rate_limited() {
        let provider = MockSmtpProvider::failing_with("rate limit exceeded for SMTP transport");
        let processor = processor_with(provider);

        let job = EmailJob::new("welcome", "ana@example.com", json!({}));

        let err = processor.process(&job).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::RateLimited);
    }

    #[tokio::test]
    async fn test_invalid_address_failure_is_permanent() {
        let provider = MockSmtpProvider::failing_with("Invalid recipient address");
        let processor = processor_with(provider);

        let job = EmailJob::new("welcome", "not-an-address", json!({}));

        let err = processor.process(&job).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Permanent);
    }
}
