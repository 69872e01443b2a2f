//! Connector trait and backend implementations.
//!
//! A connector is one backend-specific handle to one database as one user.
//! The multiplexer owns connectors; callers never see them directly.
//!
//! # Module Structure
//! - `params`: named-parameter rewriting into each backend's placeholder form
//! - `pool`: bounded worker pool for blocking drivers
//! - `registry`: backend type to constructor table
//! - Backend modules (`postgres`, `mysql`, `oracle`), each behind a cargo
//!   feature of the same name
//!
//! # Lifecycle
//! `Disconnected -> connect -> Connected -> disconnect/close -> Disconnected`.
//! Data operations on a disconnected connector fail with `NotConnected`;
//! `validate_syntax` and `test` answer `false` instead.

use crate::Result;
use crate::models::{BackendType, QueryKind, QueryParameters, QueryResult, SchemaSnapshot};
use async_trait::async_trait;

pub mod params;
mod pool;
mod registry;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "oracle")]
pub mod oracle;
#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(any(feature = "postgresql", feature = "mysql"))]
mod helpers;

pub use pool::BlockingPool;
pub use registry::{ConnectorConstructor, ConnectorRegistry};

/// Capability interface every backend implements.
///
/// # Object Safety
/// The trait is object-safe; the multiplexer stores connectors as
/// `Box<dyn DatabaseConnector>`.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    /// Backend this connector talks to
    fn backend(&self) -> BackendType;

    /// Whether a live driver handle is held
    fn is_connected(&self) -> bool;

    /// Performs the backend handshake.
    ///
    /// The live handle is only stored once the handshake succeeds, so a
    /// failed connect leaves the connector disconnected.
    ///
    /// # Errors
    /// Returns `Connection` wrapping the driver error.
    async fn connect(&mut self) -> Result<()>;

    /// Releases the driver handle. A no-op when already disconnected.
    async fn disconnect(&mut self) -> Result<()>;

    /// Executes one statement.
    ///
    /// Reads return rows and column names; everything else returns the
    /// affected-row count and is committed. With `max_rows` set, a read
    /// stops fetching after `max_rows + 1` rows so callers can detect
    /// truncation without pulling the whole result.
    ///
    /// # Errors
    /// Returns `NotConnected` before `connect`, `QueryExecution` for driver
    /// failures and missing parameter values.
    async fn execute(
        &self,
        text: &str,
        parameters: Option<&QueryParameters>,
        max_rows: Option<usize>,
    ) -> Result<QueryResult>;

    /// Collects tables (with columns), views, procedures and functions.
    async fn schema(&self) -> Result<SchemaSnapshot>;

    /// Lists table names, optionally restricted to one schema or owner.
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<String>>;

    /// Asks the backend to plan the statement without running it.
    async fn validate_syntax(&self, text: &str) -> bool;

    /// Round-trips a trivial statement.
    async fn test(&self) -> bool;

    /// Classifies a statement by its leading keyword.
    fn classify(&self, text: &str) -> QueryKind {
        QueryKind::classify(text)
    }

    /// Disconnects if connected. Idempotent.
    async fn close(&mut self) -> Result<()> {
        if self.is_connected() {
            self.disconnect().await
        } else {
            Ok(())
        }
    }
}
