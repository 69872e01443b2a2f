//! Connection multiplexing and SQL risk assessment for agent-issued queries.
//!
//! This crate sits between an automated caller (typically an AI agent speaking
//! a tool protocol) and the relational databases it is allowed to query. It
//! keeps one connected connector per distinct target, scores every statement
//! with a heuristic risk engine before it runs, and normalises driver output
//! into JSON-friendly result objects.
//!
//! # Security Guarantees
//! - Passwords are held in zeroizing storage and never logged or displayed
//! - Unsafe statements are refused before any connector is resolved
//! - Statement text is only logged at `debug`
//!
//! # Architecture
//! - [`multiplexer`]: service object owning the connector cache
//! - [`connectors`]: `DatabaseConnector` trait, registry and backend drivers
//! - [`safety`]: pure regex/tokenizer risk scoring
//! - [`models`]: descriptors, queries, results and assessments
//!
//! # Backends
//! PostgreSQL and MySQL (feature `postgresql`, `mysql`, on by default) use
//! async `sqlx` pools. Oracle (feature `oracle`) uses the blocking `oracle`
//! driver on a bounded worker pool.

pub mod config;
pub mod connectors;
pub mod error;
pub mod logging;
pub mod models;
pub mod multiplexer;
pub mod safety;

// Re-export commonly used types
pub use config::MultiplexerConfig;
pub use connectors::{BlockingPool, ConnectorRegistry, DatabaseConnector};
pub use error::{Result, SqlWardenError};
pub use models::{
    BackendType, ConnectionDescriptor, IdentityKey, Query, QueryKind, QueryParameters,
    QueryResult, ResultRow, RiskAssessment, RiskLevel, SchemaObject, SchemaSnapshot,
};
pub use multiplexer::{ConnectionMultiplexer, SharedConnector};
pub use safety::RiskAssessor;
