//! Error types with credential sanitization.
//!
//! Driver errors are converted into [`SqlWardenError`] at the driver-call
//! boundary. Messages carry the backend's own wording (so agents can react
//! to it) but never the password of the descriptor that produced them.

use std::time::Duration;
use thiserror::Error;

/// Main error type for sqlwarden operations.
///
/// # Security
/// Connection descriptors are rendered through their credential-free
/// `Display` implementation; passwords never reach an error message.
#[derive(Debug, Error)]
pub enum SqlWardenError {
    /// Backend handshake failed; wraps the native driver error
    #[error("Database connection failed: {source}")]
    Connection {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A data operation was attempted before a successful connect
    #[error("Not connected to {backend} database")]
    NotConnected { backend: String },

    /// The backend type has no registered connector constructor
    #[error("Unsupported database type: {backend}")]
    UnsupportedBackend { backend: String },

    /// Statement execution failed inside the driver
    #[error("Query execution failed: {context}")]
    QueryExecution { context: String },

    /// The risk engine refused to let the statement run.
    ///
    /// Displays as the bare recommendation so callers see the engine's verdict
    /// verbatim in `QueryResult::error_message`.
    #[error("{recommendation}")]
    QueryBlocked { recommendation: String },

    /// An operation exceeded its deadline
    #[error("{operation} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with SqlWardenError
pub type Result<T> = std::result::Result<T, SqlWardenError>;

impl SqlWardenError {
    /// Creates a connection error wrapping the driver's error
    pub fn connection_failed<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            source: Box::new(error),
        }
    }

    /// Creates a not-connected error for the given backend
    pub fn not_connected(backend: impl std::fmt::Display) -> Self {
        Self::NotConnected {
            backend: backend.to_string(),
        }
    }

    /// Creates an unsupported backend error
    pub fn unsupported_backend(backend: impl Into<String>) -> Self {
        Self::UnsupportedBackend {
            backend: backend.into(),
        }
    }

    /// Creates a query execution error
    pub fn query_failed(context: impl Into<String>) -> Self {
        Self::QueryExecution {
            context: context.into(),
        }
    }

    /// Creates a blocked-query error carrying the risk recommendation
    pub fn blocked(recommendation: impl Into<String>) -> Self {
        Self::QueryBlocked {
            recommendation: recommendation.into(),
        }
    }

    /// Creates a timeout error for the named operation
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }
}
