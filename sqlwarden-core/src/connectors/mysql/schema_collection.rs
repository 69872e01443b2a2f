//! MySQL schema introspection through `INFORMATION_SCHEMA`, scoped to the
//! connection's current database.

use crate::Result;
use crate::connectors::helpers::{RowExt, execution_error};
use crate::models::{SchemaObject, SchemaSnapshot};
use serde_json::{Value, json};
use sqlx::MySqlPool;

const TABLES_QUERY: &str = r#"
    SELECT CAST(TABLE_NAME AS CHAR) AS table_name,
           CAST(TABLE_TYPE AS CHAR) AS table_type,
           CAST(TABLE_SCHEMA AS CHAR) AS table_schema
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_SCHEMA = DATABASE()
    ORDER BY TABLE_NAME
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
           CAST(DATA_TYPE AS CHAR) AS data_type,
           CAST(IS_NULLABLE AS CHAR) AS is_nullable,
           CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
           CAST(COLUMN_KEY AS CHAR) AS column_key
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
    ORDER BY ORDINAL_POSITION
"#;

const VIEWS_QUERY: &str = r#"
    SELECT CAST(TABLE_NAME AS CHAR) AS view_name,
           CAST(VIEW_DEFINITION AS CHAR) AS view_definition
    FROM INFORMATION_SCHEMA.VIEWS
    WHERE TABLE_SCHEMA = DATABASE()
    ORDER BY TABLE_NAME
"#;

const ROUTINES_QUERY: &str = r#"
    SELECT CAST(ROUTINE_NAME AS CHAR) AS routine_name,
           CAST(ROUTINE_TYPE AS CHAR) AS routine_type
    FROM INFORMATION_SCHEMA.ROUTINES
    WHERE ROUTINE_SCHEMA = DATABASE()
    ORDER BY ROUTINE_NAME
"#;

/// Collects tables (with columns), views, procedures and functions.
pub(super) async fn collect_schema(pool: &MySqlPool) -> Result<SchemaSnapshot> {
    let mut snapshot = SchemaSnapshot::default();

    let table_rows = sqlx::query(TABLES_QUERY)
        .fetch_all(pool)
        .await
        .map_err(execution_error)?;

    for row in &table_rows {
        let name = row.required_text("table_name")?;
        let columns = collect_columns(pool, &name).await?;

        let mut table = SchemaObject::new();
        table.insert("name".to_string(), Value::String(name));
        table.insert("type".to_string(), json!(row.text("table_type")?));
        table.insert("schema".to_string(), json!(row.text("table_schema")?));
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
        let mut routine = SchemaObject::new();
        routine.insert("name".to_string(), json!(row.required_text("routine_name")?));

        match row.text("routine_type")?.as_deref() {
            Some("PROCEDURE") => snapshot.procedures.push(routine),
            Some("FUNCTION") => snapshot.functions.push(routine),
            _ => {}
        }
    }

    tracing::debug!(
        "Collected MySQL schema: {} tables, {} views, {} procedures, {} functions",
        snapshot.tables.len(),
        snapshot.views.len(),
        snapshot.procedures.len(),
        snapshot.functions.len()
    );

    Ok(snapshot)
}

async fn collect_columns(pool: &MySqlPool, table: &str) -> Result<Vec<Value>> {
    let rows = sqlx::query(COLUMNS_QUERY)
        .bind(table)
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
                "key": row.text("column_key")?,
            }))
        })
        .collect()
}

/// Lists table names in `schema`, or in the current database.
pub(super) async fn list_tables(pool: &MySqlPool, schema: Option<&str>) -> Result<Vec<String>> {
    let rows = match schema {
        Some(schema) => {
            sqlx::query(
                "SELECT CAST(TABLE_NAME AS CHAR) AS table_name FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_SCHEMA = ? ORDER BY TABLE_NAME",
            )
            .bind(schema)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                "SELECT CAST(TABLE_NAME AS CHAR) AS table_name FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_SCHEMA = DATABASE() ORDER BY TABLE_NAME",
            )
            .fetch_all(pool)
            .await
        }
    }
    .map_err(execution_error)?;

    rows.iter().map(|row| row.required_text("table_name")).collect()
}
