use sea_orm::DbErr;
use stream_worker::StreamError;
use thiserror::Error;

/// Errors raised by the activity-log consumer.
#[derive(Error, Debug)]
pub enum ActivityLogError {
    #[error("Invalid activity log payload: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),
}

impl From<ActivityLogError> for StreamError {
    fn from(err: ActivityLogError) -> Self {
        match err {
            // A payload that fails validation will fail identically on
            // every attempt
            ActivityLogError::Validation(_) => StreamError::permanent(err.to_string()),
            ActivityLogError::Database(_) => StreamError::transient(err.to_string()),
            // The row is written; retrying re-runs the invalidation (and a
            // duplicate insert, which the audit trail tolerates)
            ActivityLogError::Cache(_) => StreamError::transient(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_worker::ErrorCategory;

    #[test]
    fn test_validation_is_permanent() {
        let err: StreamError =
            ActivityLogError::Validation(validator::ValidationErrors::new()).into();
        assert_eq!(err.category(), ErrorCategory::Permanent);
    }

    #[test]
    fn test_database_is_transient() {
        let err: StreamError =
            ActivityLogError::Database(DbErr::Custom("connection reset".to_string())).into();
        assert_eq!(err.category(), ErrorCategory::Transient);
    }
}
