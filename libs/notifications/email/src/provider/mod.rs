//! Email provider abstraction.
//!
//! One pooled SMTP transport in production; the mock records sends for
//! tests.

mod mock;
mod smtp;

use async_trait::async_trait;
use eyre::Result;

pub use mock::MockSmtpProvider;
pub use smtp::SmtpProvider;

/// A rendered email ready for the transport.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body_html: Option<String>,
    pub body_text: Option<String>,
}

/// Result of a send operation.
#[derive(Debug, Clone)]
pub struct SendResult {
    pub message_id: String,
}

/// Outbound mail transport.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send one email.
    async fn send(&self, email: &OutboundEmail) -> Result<SendResult>;

    /// Check transport connectivity.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
