//! Error types for fraud engine

use thiserror::Error;

/// Fraud engine error
///
/// Only surfaced to callers for rejected input or a broken setup. Provider
/// failures never reach this type; they are contained inside each check.
#[derive(Debug, Error)]
pub enum Error {
    /// Order context failed validation
    #[error("Invalid order context: {0}")]
    Validation(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Provider could not be wired up at start-up
    #[error("Provider setup failed: {0}")]
    ProviderSetup(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of an external data provider lookup
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Lookup did not finish within the configured bound
    #[error("{operation} timed out after {millis}ms")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Bound in milliseconds
        millis: u64,
    },

    /// Provider unreachable
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Provider has no record for the key
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider answered with an error
    #[error("Provider backend error: {0}")]
    Backend(String),

    /// Circuit breaker is rejecting calls
    #[error("Circuit breaker open for {0}")]
    CircuitOpen(String),
}

/// Result type for provider lookups
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl From<redis::RedisError> for ProviderError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout {
                operation: "redis".to_string(),
                millis: 0,
            }
        } else if err.is_connection_dropped() || err.is_connection_refusal() {
            ProviderError::Unavailable(err.to_string())
        } else {
            ProviderError::Backend(err.to_string())
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout {
                operation: "ip intelligence request".to_string(),
                millis: 0,
            }
        } else if err.is_connect() {
            ProviderError::Unavailable(err.to_string())
        } else {
            ProviderError::Backend(err.to_string())
        }
    }
}

impl From<sqlx::Error> for ProviderError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ProviderError::NotFound("row".to_string()),
            sqlx::Error::PoolTimedOut => ProviderError::Timeout {
                operation: "postgres pool acquire".to_string(),
                millis: 0,
            },
            sqlx::Error::Io(e) => ProviderError::Unavailable(e.to_string()),
            other => ProviderError::Backend(other.to_string()),
        }
    }
}
