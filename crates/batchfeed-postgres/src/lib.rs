#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants for consistent logging.

/// Tracing target for database connection operations.
///
/// Use this target for logging connection establishment, pool management,
/// and connection errors.
pub const TRACING_TARGET_CONNECTION: &str = "batchfeed_postgres::connection";

/// Tracing target for page query execution.
///
/// Use this target for logging statement execution, result sizes, and
/// query-related errors.
pub const TRACING_TARGET_QUERY: &str = "batchfeed_postgres::query";

mod client;
mod source;

use std::borrow::Cow;

use deadpool::managed::TimeoutType;
use diesel::ConnectionError;
use diesel::result::Error;
pub use diesel_async::AsyncPgConnection;

pub use crate::client::{
    ConnectionPool, PgClient, PgConfig, PgConn, PgPoolStatus, PooledConnection,
};
pub use crate::source::PgPageSource;

pub mod error {
    //! Error types and utilities for database operations.
    //!
    //! See [`PgError`] for the main error type used throughout this crate.
    //!
    //! [`PgError`]: crate::PgError

    /// Type-erased error type for dynamic error handling.
    pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

    pub use deadpool::managed::TimeoutType;
    pub use diesel::result::{ConnectionError as DieselConnectionError, Error as DieselError};
    pub use diesel_async::pooled_connection::PoolError as DieselPoolError;
    pub use diesel_async::pooled_connection::deadpool::PoolError as DeadpoolError;
}

/// Error type for all PostgreSQL page source operations.
///
/// Covers connection issues, pool timeouts, and query failures. Page query
/// failures surface to the reader unmodified; retry, if any, belongs to the
/// batch orchestration layer, not to this crate.
#[derive(Debug, thiserror::Error)]
#[must_use = "database errors should be handled appropriately"]
pub enum PgError {
    /// Configuration error.
    ///
    /// Invalid configuration parameters or missing required settings,
    /// raised when a configuration is validated, never during a read.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database operation timed out.
    ///
    /// Can occur while creating, waiting for, or recycling a pooled
    /// connection.
    #[error("Database operation timed out")]
    Timeout(TimeoutType),

    /// Failed to establish or maintain a database connection.
    #[error("Database connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Database query execution failed.
    ///
    /// SQL syntax errors, type mismatches, and other failures reported by
    /// the database for a page statement.
    #[error("Database query error: {0}")]
    Query(#[from] Error),

    /// Unexpected error occurred.
    #[error("Unexpected error: {0}")]
    Unexpected(Cow<'static, str>),
}

impl PgError {
    /// Returns whether this error indicates a transient failure that might
    /// succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PgError::Timeout(_) | PgError::Connection(ConnectionError::BadConnection(_))
        )
    }

    /// Returns whether this error indicates a permanent failure that won't
    /// succeed on retry.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

impl From<error::DeadpoolError> for PgError {
    fn from(value: error::DeadpoolError) -> Self {
        use error::{DeadpoolError, DieselPoolError};

        match value {
            DeadpoolError::Timeout(timeout) => Self::Timeout(timeout),
            DeadpoolError::Backend(DieselPoolError::QueryError(error)) => Self::Query(error),
            DeadpoolError::Backend(DieselPoolError::ConnectionError(error)) => {
                Self::Connection(error)
            }
            DeadpoolError::PostCreateHook(err) => {
                // No post-create hooks are installed, but handle gracefully:
                Self::Unexpected(err.to_string().into())
            }
            DeadpoolError::NoRuntimeSpecified => {
                tracing::error!(
                    target: TRACING_TARGET_CONNECTION,
                    "No tokio runtime specified for connection pool"
                );
                Self::Unexpected("No runtime specified".into())
            }
            DeadpoolError::Closed => {
                // Pool was closed, treat as connection error:
                Self::Connection(ConnectionError::InvalidConnectionUrl(
                    "Connection pool is closed".into(),
                ))
            }
        }
    }
}

/// Specialized [`Result`] type for database operations.
pub type PgResult<T, E = PgError> = Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_transient() {
        let error = PgError::Timeout(TimeoutType::Wait);
        assert!(error.is_transient());
        assert!(!error.is_permanent());
    }

    #[test]
    fn query_error_is_permanent() {
        let error = PgError::Query(Error::NotFound);
        assert!(error.is_permanent());
    }

    #[test]
    fn deadpool_timeout_maps_to_timeout() {
        let error = PgError::from(error::DeadpoolError::Timeout(TimeoutType::Create));
        assert!(matches!(error, PgError::Timeout(TimeoutType::Create)));
    }

    #[test]
    fn closed_pool_maps_to_connection_error() {
        let error = PgError::from(error::DeadpoolError::Closed);
        assert!(matches!(error, PgError::Connection(_)));
    }
}
