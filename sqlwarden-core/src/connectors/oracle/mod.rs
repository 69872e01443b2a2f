//! Oracle connector backed by the blocking `oracle` crate (ODPI-C).
//!
//! Every driver call runs on the shared [`BlockingPool`], never on the async
//! scheduler, and holds the session lock for its whole duration so one
//! caller's rollback cannot undo another's uncommitted DML. Requires Oracle
//! Instant Client at runtime.
//!
//! # Module Structure
//! - `type_mapping`: Oracle value to JSON conversion and parameter binding
//! - `schema_collection`: `user_*` / `all_*` dictionary view introspection

mod schema_collection;
mod type_mapping;


use super::params::{PlaceholderStyle, bind_named};
use super::{BlockingPool, DatabaseConnector};
use crate::models::{
    BackendType, ConnectionDescriptor, QueryParameters, QueryResult, ResultRow, SchemaSnapshot,
};
use crate::{Result, error::SqlWardenError};
use async_trait::async_trait;
use oracle::Connection;
use std::sync::{Arc, Mutex};
use zeroize::Zeroizing;

/// Oracle connector holding one dedicated session.
pub struct OracleConnector {
    descriptor: ConnectionDescriptor,
    blocking: BlockingPool,
    connection: Option<Arc<Mutex<Connection>>>,
}

impl std::fmt::Debug for OracleConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConnector")
            .field("target", &self.descriptor.to_string())
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

impl OracleConnector {
    /// Creates a disconnected connector that offloads work to `blocking`.
    pub fn new(descriptor: ConnectionDescriptor, blocking: BlockingPool) -> Self {
        Self {
            descriptor,
            blocking,
            connection: None,
        }
    }

    /// EZConnect string: `//host:port/service`
    pub fn connect_string(descriptor: &ConnectionDescriptor) -> String {
        format!(
            "//{}:{}/{}",
            descriptor.host, descriptor.port, descriptor.database
        )
    }

    fn connection(&self) -> Result<Arc<Mutex<Connection>>> {
        self.connection
            .clone()
            .ok_or_else(|| SqlWardenError::not_connected(BackendType::Oracle))
    }
}

pub(crate) fn oracle_error(error: oracle::Error) -> SqlWardenError {
    SqlWardenError::query_failed(error.to_string())
}

#[async_trait]
impl DatabaseConnector for OracleConnector {
    fn backend(&self) -> BackendType {
        BackendType::Oracle
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    async fn connect(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        let username = self.descriptor.username.clone();
        let password = Zeroizing::new(self.descriptor.password().to_string());
        let connect_string = Self::connect_string(&self.descriptor);

        let connection = self
            .blocking
            .run(move || {
                Connection::connect(&username, password.as_str(), &connect_string)
                    .map_err(SqlWardenError::connection_failed)
            })
            .await?;

        tracing::info!("Connected to {}", self.descriptor);
        self.connection = Some(Arc::new(Mutex::new(connection)));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };

        self.blocking
            .run_exclusive(connection, |connection| {
                connection.close().map_err(oracle_error)
            })
            .await?;
        tracing::info!("Disconnected from {}", self.descriptor);
        Ok(())
    }

    async fn execute(
        &self,
        text: &str,
        parameters: Option<&QueryParameters>,
        max_rows: Option<usize>,
    ) -> Result<QueryResult> {
        let connection = self.connection()?;
        let kind = self.classify(text);
        let bound = bind_named(text, parameters, PlaceholderStyle::Named)?;
        let cap = max_rows.map_or(usize::MAX, |max| max.saturating_add(1));

        self.blocking
            .run_exclusive(connection, move |connection| {
                let values = type_mapping::to_sql_values(&bound.values);
                let named = type_mapping::as_named(&values);

                if kind.is_read() {
                    let rows = connection
                        .query_named(&bound.sql, &named)
                        .map_err(oracle_error)?;
                    let columns: Vec<String> = rows
                        .column_info()
                        .iter()
                        .map(|info| info.name().to_string())
                        .collect();
                    let types: Vec<_> = rows
                        .column_info()
                        .iter()
                        .map(|info| info.oracle_type().clone())
                        .collect();

                    let mut converted = Vec::new();
                    for row in rows.take(cap) {
                        let row = row.map_err(oracle_error)?;
                        let mut map = ResultRow::new();
                        for (idx, (name, oracle_type)) in columns.iter().zip(&types).enumerate() {
                            map.insert(
                                name.clone(),
                                type_mapping::extract_value(&row, idx, oracle_type),
                            );
                        }
                        converted.push(map);
                    }

                    Ok(QueryResult::from_rows(columns, converted))
                } else {
                    let statement = connection
                        .execute_named(&bound.sql, &named)
                        .map_err(oracle_error)?;
                    let affected = statement.row_count().map_err(oracle_error)?;
                    connection.commit().map_err(oracle_error)?;
                    Ok(QueryResult::affected(kind, affected))
                }
            })
            .await
    }

    async fn schema(&self) -> Result<SchemaSnapshot> {
        let connection = self.connection()?;
        self.blocking
            .run_exclusive(connection, |connection| {
                schema_collection::collect_schema(connection)
            })
            .await
    }

    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<String>> {
        let connection = self.connection()?;
        let owner = schema.map(str::to_string);
        self.blocking
            .run_exclusive(connection, move |connection| {
                schema_collection::list_tables(connection, owner.as_deref())
            })
            .await
    }

    async fn validate_syntax(&self, text: &str) -> bool {
        let Ok(connection) = self.connection() else {
            return false;
        };
        let sql = format!("EXPLAIN PLAN FOR {}", text);

        let outcome = self
            .blocking
            .run_exclusive(connection, move |connection| {
                let explained = connection.execute(&sql, &[]).map(|_| ());
                connection.rollback().map_err(oracle_error)?;
                explained.map_err(oracle_error)
            })
            .await;

        match outcome {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("EXPLAIN PLAN rejected statement on {}: {}", self.descriptor, e);
                false
            }
        }
    }

    async fn test(&self) -> bool {
        let Ok(connection) = self.connection() else {
            return false;
        };

        let outcome = self
            .blocking
            .run_exclusive(connection, |connection| {
                connection
                    .query_row_as::<i64>("SELECT 1 FROM dual", &[])
                    .map_err(oracle_error)
            })
            .await;

        matches!(outcome, Ok(1))
    }
}
