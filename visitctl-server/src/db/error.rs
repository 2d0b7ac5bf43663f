//! Store error type
//!
//! Every `sqlx::Error` is folded into [`StoreError`] before it leaves the db
//! layer. The driver error is kept as `source` for logging.

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Fail-fast pool had no free connection.
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// No connection became available before the acquire timeout.
    #[error("timed out waiting for a database connection")]
    ConnectTimeout,

    /// Transport or query failure.
    #[error("database unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    /// The counter row does not exist.
    #[error("visit counter row {id} not found")]
    RowMissing { id: i32 },
}

impl StoreError {
    /// Transient errors may succeed if the caller retries later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::PoolExhausted | Self::ConnectTimeout)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => Self::ConnectTimeout,
            other => Self::StoreUnavailable(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn pool_timeout_maps_to_connect_timeout() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::ConnectTimeout));
        assert!(err.is_transient());
    }

    #[test]
    fn driver_errors_keep_their_source() {
        let err = StoreError::from(sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::StoreUnavailable(_)));
        assert!(err.source().is_some());
        assert!(!err.is_transient());
    }

    #[test]
    fn row_missing_names_the_row() {
        let err = StoreError::RowMissing { id: 1 };
        assert_eq!(err.to_string(), "visit counter row 1 not found");
    }
}
