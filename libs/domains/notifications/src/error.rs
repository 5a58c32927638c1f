use stream_worker::StreamError;
use thiserror::Error;

pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors raised by the fan-out handlers.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Missing recipient: {0}")]
    MissingRecipient(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Broker error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl From<NotificationError> for StreamError {
    fn from(err: NotificationError) -> Self {
        match err {
            // A payload without a recipient can never fan out
            NotificationError::MissingRecipient(_) => StreamError::permanent(err.to_string()),
            NotificationError::Serialization(_) => StreamError::permanent(err.to_string()),
            NotificationError::Redis(e) => StreamError::Redis(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_worker::ErrorCategory;

    #[test]
    fn test_missing_recipient_is_permanent() {
        let err: StreamError = NotificationError::MissingRecipient("userId".to_string()).into();
        assert_eq!(err.category(), ErrorCategory::Permanent);
    }

    #[test]
    fn test_broker_errors_are_transient() {
        let redis_err =
            redis::RedisError::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        let err: StreamError = NotificationError::Redis(redis_err).into();
        assert_eq!(err.category(), ErrorCategory::Transient);
    }
}
