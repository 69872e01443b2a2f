//! PostgreSQL connector backed by a `sqlx::PgPool`.
//!
//! # Module Structure
//! - `connection`: connect options and pool construction
//! - `type_mapping`: PostgreSQL value to JSON conversion and parameter binding
//! - `schema_collection`: information_schema introspection

mod connection;
mod schema_collection;
mod type_mapping;


use super::DatabaseConnector;
use super::helpers::{
    collect_rows, column_names, execution_error, explain_would_execute, rows_to_result,
};
use super::params::{PlaceholderStyle, bind_named};
use crate::models::{
    BackendType, ConnectionDescriptor, QueryParameters, QueryResult, SchemaSnapshot,
};
use crate::{Result, error::SqlWardenError};
use async_trait::async_trait;
use sqlx::{Executor, PgPool, Statement};

pub use connection::connect_options;

/// PostgreSQL connector; one pool per identity key.
pub struct PostgresConnector {
    descriptor: ConnectionDescriptor,
    pool: Option<PgPool>,
}

impl std::fmt::Debug for PostgresConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnector")
            .field("target", &self.descriptor.to_string())
            .field("pool_size", &self.pool.as_ref().map(|p| p.size()))
            .field("pool_idle", &self.pool.as_ref().map(|p| p.num_idle()))
            .finish()
    }
}

impl PostgresConnector {
    /// Creates a disconnected connector.
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        Self {
            descriptor,
            pool: None,
        }
    }

    fn pool(&self) -> Result<&PgPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| SqlWardenError::not_connected(BackendType::Postgres))
    }
}

#[async_trait]
impl DatabaseConnector for PostgresConnector {
    fn backend(&self) -> BackendType {
        BackendType::Postgres
    }

    fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    async fn connect(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let pool = connection::create_pool(&self.descriptor).await?;
        tracing::info!("Connected to {}", self.descriptor);
        self.pool = Some(pool);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            tracing::info!("Disconnected from {}", self.descriptor);
        }
        Ok(())
    }

    async fn execute(
        &self,
        text: &str,
        parameters: Option<&QueryParameters>,
        max_rows: Option<usize>,
    ) -> Result<QueryResult> {
        let pool = self.pool()?;
        let kind = self.classify(text);
        let bound = bind_named(text, parameters, PlaceholderStyle::Numbered)?;

        let mut query = sqlx::query(&bound.sql);
        for (_, value) in &bound.values {
            query = type_mapping::bind_value(query, value);
        }

        if kind.is_read() {
            let rows = collect_rows(query.fetch(pool), max_rows).await?;
            let mut result = rows_to_result(&rows, type_mapping::extract_value);
            if rows.is_empty() {
                result.columns = match pool.prepare(&bound.sql).await {
                    Ok(statement) => column_names(statement.columns()),
                    Err(e) => {
                        tracing::debug!(
                            "Could not describe columns on {}: {}",
                            self.descriptor,
                            e
                        );
                        Vec::new()
                    }
                };
            }
            Ok(result)
        } else {
            let done = query.execute(pool).await.map_err(execution_error)?;
            Ok(QueryResult::affected(kind, done.rows_affected()))
        }
    }

    async fn schema(&self) -> Result<SchemaSnapshot> {
        schema_collection::collect_schema(self.pool()?).await
    }

    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<String>> {
        schema_collection::list_tables(self.pool()?, schema).await
    }

    async fn validate_syntax(&self, text: &str) -> bool {
        let Ok(pool) = self.pool() else {
            return false;
        };
        if explain_would_execute(text) {
            tracing::debug!(
                "Refusing to EXPLAIN an executing statement on {}",
                self.descriptor
            );
            return false;
        }

        let mut tx = match pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                tracing::debug!("Could not open a transaction on {}: {}", self.descriptor, e);
                return false;
            }
        };

        // Prepared, so a trailing second statement is rejected rather than run
        let sql = format!("EXPLAIN {}", text);
        let valid = match sqlx::query(&sql).execute(&mut *tx).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("EXPLAIN rejected statement on {}: {}", self.descriptor, e);
                false
            }
        };

        if let Err(e) = tx.rollback().await {
            tracing::warn!(
                "Failed to roll back validation on {}: {}",
                self.descriptor,
                e
            );
        }
        valid
    }

    async fn test(&self) -> bool {
        let Ok(pool) = self.pool() else {
            return false;
        };

        matches!(
            sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await,
            Ok(1)
        )
    }
}
