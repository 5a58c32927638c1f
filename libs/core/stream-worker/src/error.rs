//! Stream error types and error categorization.
//!
//! Errors are categorized to determine retry behavior:
//! - **Transient**: temporary failures, retried with exponential backoff
//! - **Permanent**: unrecoverable input, dead-lettered without retry
//! - **RateLimited**: downstream throttling, retried like transient failures
//!   but reported separately

use thiserror::Error;

/// Category of error for determining retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Temporary failure - retry with exponential backoff.
    Transient,
    /// Unrecoverable error - move to DLQ immediately; retrying a payload
    /// that can never succeed only burns the attempt budget.
    Permanent,
    /// Downstream rate limit hit - retry with backoff, tracked separately.
    RateLimited,
}

impl ErrorCategory {
    /// Whether this category participates in the retry cycle at all.
    pub fn should_retry(&self) -> bool {
        !matches!(self, ErrorCategory::Permanent)
    }

    /// Label used for metrics and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::RateLimited => "rate_limited",
        }
    }
}

/// Stream processing errors.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Job processing failed
    #[error("Processing error: {message}")]
    Processing {
        message: String,
        category: ErrorCategory,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StreamError {
    /// Create a transient processing error.
    pub fn transient(message: impl Into<String>) -> Self {
        StreamError::Processing {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    /// Create a permanent processing error.
    pub fn permanent(message: impl Into<String>) -> Self {
        StreamError::Processing {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    /// Create a rate limited error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        StreamError::RateLimited(message.into())
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            StreamError::Redis(_) => ErrorCategory::Transient,
            StreamError::Serialization(_) => ErrorCategory::Permanent,
            StreamError::Processing { category, .. } => *category,
            StreamError::RateLimited(_) => ErrorCategory::RateLimited,
            StreamError::Config(_) => ErrorCategory::Permanent,
            StreamError::Internal(_) => ErrorCategory::Permanent,
        }
    }

    /// BLOCK reads report expiry as a timeout error; that is normal idle
    /// behavior, not a failure.
    pub fn is_block_timeout(&self) -> bool {
        match self {
            StreamError::Redis(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Broker connectivity loss (drives the worker-loop backoff).
    pub fn is_connection_error(&self) -> bool {
        match self {
            StreamError::Redis(e) => {
                e.is_connection_dropped()
                    || e.is_connection_refusal()
                    || e.is_io_error()
                    || e.is_cluster_error()
            }
            _ => false,
        }
    }

    /// The consumer group vanished (e.g. the stream was deleted).
    pub fn is_nogroup_error(&self) -> bool {
        match self {
            StreamError::Redis(e) => e.to_string().contains("NOGROUP"),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Serialization(err.to_string())
    }
}
