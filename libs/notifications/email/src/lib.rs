//! Transactional email delivery.
//!
//! Consumes rendered-template jobs from the `email` queue and drives a
//! pooled SMTP transport (connection pool + send rate limit, configured
//! once at startup and shared across all sends).
//!
//! Error handling is deliberately asymmetric with the other consumers:
//! a job missing its template identifier or recipient address is logged
//! and completed without sending: an explicit skip, not a retryable
//! failure. Transport errors are rethrown so the standard retry/backoff
//! applies.

pub mod error;
pub mod job;
pub mod processor;
pub mod provider;
pub mod streams;
pub mod templates;

pub use error::{EmailError, EmailResult};
pub use job::EmailJob;
pub use processor::EmailProcessor;
pub use provider::{EmailProvider, MockSmtpProvider, OutboundEmail, SendResult, SmtpProvider};
pub use streams::EmailStream;
pub use templates::{RenderedEmail, TemplateEngine};
