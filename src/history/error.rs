use thiserror::Error;

/// Result type for history store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error types for history store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// No live connection to the backing store
    #[error("History store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer within the command timeout
    #[error("History store timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Invalid configuration or input
    #[error("Validation error: {0}")]
    Validation(String),

    /// SQL errors, constraint violations
    #[error("Database error: {0}")]
    Database(String),

    /// Connection pool issues
    #[error("Pool error: {0}")]
    Pool(String),
}

/// Convert tokio-postgres errors to store errors
impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_error) = err.as_db_error() {
            return StoreError::Database(format!(
                "{}: {}",
                db_error.code().code(),
                db_error.message()
            ));
        }

        if err.is_closed() {
            return StoreError::Unavailable(err.to_string());
        }

        StoreError::Database(format!("{:?}", err))
    }
}

/// Convert deadpool errors to store errors
impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Backend(e) => e.into(),
            deadpool_postgres::PoolError::Closed => {
                StoreError::Unavailable("connection pool is closed".to_string())
            }
            other => StoreError::Pool(other.to_string()),
        }
    }
}

/// Convert deadpool build errors to store errors
impl From<deadpool_postgres::BuildError> for StoreError {
    fn from(err: deadpool_postgres::BuildError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unavailable_display() {
        let err = StoreError::Unavailable("not connected".to_string());
        assert!(err.to_string().contains("unavailable"));
        assert!(err.to_string().contains("not connected"));
    }

    #[test]
    fn test_timeout_display() {
        let err = StoreError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_closed_pool_is_unavailable() {
        let err: StoreError = deadpool_postgres::PoolError::Closed.into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
