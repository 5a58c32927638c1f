//! SMTP email provider using lettre.

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{PoolConfig, authentication::Credentials},
};
use stream_worker::RateLimiter;

use core_config::smtp::SmtpConfig;

use super::{EmailProvider, OutboundEmail, SendResult};

/// Pooled SMTP transport shared by every send.
///
/// The pool size and the rate limit window come from [`SmtpConfig`] and are
/// fixed at startup. When the window is exhausted the send fails with a
/// rate-limit error and the job retries with the email queue's longer
/// backoff.
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
    rate_limiter: RateLimiter,
}

impl SmtpProvider {
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let pool = PoolConfig::new().max_size(config.pool_max_connections);

        let transport = if config.secure {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .wrap_err("Failed to create SMTP relay")?
                .credentials(creds)
                .port(config.port)
                .pool_config(pool)
                .build()
        } else if !config.username.is_empty() {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .credentials(creds)
                .port(config.port)
                .pool_config(pool)
                .build()
        } else {
            // No auth (Mailpit/Mailhog in development)
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .pool_config(pool)
                .build()
        };

        let rate_limiter =
            RateLimiter::with_window(config.rate_limit_max, config.rate_limit_window_ms);

        Ok(Self {
            transport,
            from_email: config.from_email,
            from_name: config.from_name,
            rate_limiter,
        })
    }

    fn build_message(&self, email: &OutboundEmail) -> Result<Message> {
        let from: Mailbox = format!("{} <{}>", self.from_name, self.from_email)
            .parse()
            .wrap_err("Invalid from address")?;

        let to: Mailbox = email.to.parse().wrap_err("Invalid recipient address")?;

        let builder = Message::builder().from(from).to(to).subject(&email.subject);

        let message = match (&email.body_text, &email.body_html) {
            (Some(text), Some(html)) => builder
                .multipart(
                    MultiPart::alternative()
                        .singlepart(
                            SinglePart::builder()
                                .header(ContentType::TEXT_PLAIN)
                                .body(text.clone()),
                        )
                        .singlepart(
                            SinglePart::builder()
                                .header(ContentType::TEXT_HTML)
                                .body(html.clone()),
                        ),
                )
                .wrap_err("Failed to build multipart message")?,
            (Some(text), None) => builder
                .header(ContentType::TEXT_PLAIN)
                .body(text.clone())
                .wrap_err("Failed to build text message")?,
            (None, Some(html)) => builder
                .header(ContentType::TEXT_HTML)
                .body(html.clone())
                .wrap_err("Failed to build HTML message")?,
            (None, None) => {
                return Err(eyre::eyre!("Invalid email: neither text nor HTML body"));
            }
        };

        Ok(message)
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &OutboundEmail) -> Result<SendResult> {
        if !self.rate_limiter.try_acquire() {
            return Err(eyre::eyre!("rate limit exceeded for SMTP transport"));
        }

        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .wrap_err("Failed to send email via SMTP")?;

        let message_id = response
            .message()
            .next()
            .map(|s| s.to_string())
            .unwrap_or_default();

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Email sent via SMTP"
        );

        Ok(SendResult { message_id })
    }

    async fn health_check(&self) -> Result<()> {
        self.transport
            .test_connection()
            .await
            .wrap_err("SMTP health check failed")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
