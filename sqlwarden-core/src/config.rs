//! Service-level configuration for the connection multiplexer.
//!
//! Per-connection settings live on [`ConnectionDescriptor`](crate::models::ConnectionDescriptor);
//! this struct only holds knobs that apply to the whole service. Loading it
//! from a file or the environment is left to the embedding process.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`ConnectionMultiplexer`](crate::multiplexer::ConnectionMultiplexer).
///
/// # Example
/// ```rust
/// use sqlwarden_core::config::MultiplexerConfig;
/// use std::time::Duration;
///
/// let config = MultiplexerConfig::new()
///     .with_blocking_workers(4)
///     .with_test_timeout(Duration::from_secs(5));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplexerConfig {
    /// Upper bound on concurrently running blocking driver calls
    pub blocking_workers: usize,
    /// Deadline for `test_connection` probes
    #[serde(with = "duration_millis")]
    pub test_timeout: Duration,
    /// Whether callers that do not choose explicitly get risk validation
    pub default_validate_safety: bool,
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            blocking_workers: 8,
            test_timeout: Duration::from_secs(10),
            default_validate_safety: true,
        }
    }
}

impl MultiplexerConfig {
    /// Creates a config with safe defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the blocking worker bound.
    pub fn with_blocking_workers(mut self, workers: usize) -> Self {
        self.blocking_workers = workers;
        self
    }

    /// Builder method to set the connection test deadline.
    pub fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    /// Builder method to change the default safety validation.
    pub fn with_default_validate_safety(mut self, validate: bool) -> Self {
        self.default_validate_safety = validate;
        self
    }

    /// Validates configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid or unsafe
    pub fn validate(&self) -> crate::Result<()> {
        if self.blocking_workers == 0 {
            return Err(crate::error::SqlWardenError::configuration(
                "blocking_workers must be greater than 0",
            ));
        }

        if self.blocking_workers > 256 {
            return Err(crate::error::SqlWardenError::configuration(
                "blocking_workers should not exceed 256",
            ));
        }

        if self.test_timeout.is_zero() {
            return Err(crate::error::SqlWardenError::configuration(
                "test_timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
