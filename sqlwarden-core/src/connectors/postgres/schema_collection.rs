//! PostgreSQL schema introspection through `information_schema`.
//!
//! System schemas (`information_schema`, `pg_catalog`) are excluded.
//! Identifier columns are cast to `text` so they decode as plain strings.

use crate::Result;
use crate::connectors::helpers::{RowExt, execution_error};
use crate::models::{SchemaObject, SchemaSnapshot};
use serde_json::{Value, json};
use sqlx::PgPool;

const TABLES_QUERY: &str = r#"
    SELECT table_name::text AS table_name,
           table_type::text AS table_type,
           table_schema::text AS table_schema
    FROM information_schema.tables
    WHERE table_schema NOT IN ('information_schema', 'pg_catalog')
    ORDER BY table_name
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT column_name::text AS column_name,
           data_type::text AS data_type,
           is_nullable::text AS is_nullable,
           column_default::text AS column_default
    FROM information_schema.columns
    WHERE table_name = $1 AND table_schema = $2
    ORDER BY ordinal_position
"#;

const VIEWS_QUERY: &str = r#"
    SELECT table_name::text AS view_name,
           view_definition::text AS view_definition
    FROM information_schema.views
    WHERE table_schema NOT IN ('information_schema', 'pg_catalog')
    ORDER BY table_name
"#;

const ROUTINES_QUERY: &str = r#"
    SELECT routine_name::text AS routine_name,
           routine_type::text AS routine_type,
           data_type::text AS data_type
    FROM information_schema.routines
    WHERE routine_schema NOT IN ('information_schema', 'pg_catalog')
    ORDER BY routine_name
"#;

/// Collects tables (with columns), views, functions and procedures.
pub(super) async fn collect_schema(pool: &PgPool) -> Result<SchemaSnapshot> {
    let start_time = std::time::Instant::now();
    let mut snapshot = SchemaSnapshot::default();

    let table_rows = sqlx::query(TABLES_QUERY)
        .fetch_all(pool)
        .await
        .map_err(execution_error)?;

    for row in &table_rows {
        let name = row.required_text("table_name")?;
        let schema = row.required_text("table_schema")?;
        let columns = collect_columns(pool, &name, &schema).await?;

        let mut table = SchemaObject::new();
        table.insert("name".to_string(), Value::String(name));
        table.insert("type".to_string(), json!(row.text("table_type")?));
        table.insert("schema".to_string(), Value::String(schema));
        table.insert("columns".to_string(), Value::Array(columns));
        snapshot.tables.push(table);
    }

    let view_rows = sqlx::query(VIEWS_QUERY)
        .fetch_all(pool)
        .await
        .map_err(execution_error)?;

    for row in &view_rows {
        let mut view = SchemaObject::new();
        view.insert("name".to_string(), json!(row.required_text("view_name")?));
        view.insert("definition".to_string(), json!(row.text("view_definition")?));
        snapshot.views.push(view);
    }

    let routine_rows = sqlx::query(ROUTINES_QUERY)
        .fetch_all(pool)
        .await
        .map_err(execution_error)?;

    for row in &routine_rows {
        let name = row.required_text("routine_name")?;
        match row.text("routine_type")?.as_deref() {
            Some("FUNCTION") => {
                let mut function = SchemaObject::new();
                function.insert("name".to_string(), Value::String(name));
                function.insert("return_type".to_string(), json!(row.text("data_type")?));
                snapshot.functions.push(function);
            }
            Some("PROCEDURE") => {
                let mut procedure = SchemaObject::new();
                procedure.insert("name".to_string(), Value::String(name));
                snapshot.procedures.push(procedure);
            }
            _ => {}
        }
    }

    tracing::debug!(
        "Collected PostgreSQL schema: {} tables, {} views, {} functions, {} procedures in {:.2}s",
        snapshot.tables.len(),
        snapshot.views.len(),
        snapshot.functions.len(),
        snapshot.procedures.len(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(snapshot)
}

async fn collect_columns(pool: &PgPool, table: &str, schema: &str) -> Result<Vec<Value>> {
    let rows = sqlx::query(COLUMNS_QUERY)
        .bind(table)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(execution_error)?;

    rows.iter()
        .map(|row| {
            Ok(json!({
                "name": row.required_text("column_name")?,
                "type": row.text("data_type")?,
                "nullable": row.text("is_nullable")?.as_deref() == Some("YES"),
                "default": row.text("column_default")?,
            }))
        })
        .collect()
}

/// Lists table names in `schema`, or in every non-system schema.
pub(super) async fn list_tables(pool: &PgPool, schema: Option<&str>) -> Result<Vec<String>> {
    let rows = match schema {
        Some(schema) => {
            sqlx::query(
                "SELECT table_name::text AS table_name FROM information_schema.tables \
                 WHERE table_schema = $1 ORDER BY table_name",
            )
            .bind(schema)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                "SELECT table_name::text AS table_name FROM information_schema.tables \
                 WHERE table_schema NOT IN ('information_schema', 'pg_catalog') \
                 ORDER BY table_name",
            )
            .fetch_all(pool)
            .await
        }
    }
    .map_err(execution_error)?;

    rows.iter().map(|row| row.required_text("table_name")).collect()
}
