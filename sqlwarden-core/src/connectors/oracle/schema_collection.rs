//! Oracle dictionary view introspection for the connected user.
//!
//! Runs on a blocking worker; callers go through `BlockingPool::run`.

use super::oracle_error;
use crate::Result;
use crate::models::{SchemaObject, SchemaSnapshot};
use oracle::Connection;
use serde_json::{Value, json};

const TABLES_QUERY: &str =
    "SELECT table_name, tablespace_name, status FROM user_tables ORDER BY table_name";

const COLUMNS_QUERY: &str = "SELECT column_name, data_type, data_length, nullable, data_default \
     FROM user_tab_columns WHERE table_name = :t ORDER BY column_id";

const VIEWS_QUERY: &str = "SELECT view_name, text FROM user_views ORDER BY view_name";

const ROUTINES_QUERY: &str = "SELECT object_name, object_type, status FROM user_objects \
     WHERE object_type IN ('PROCEDURE', 'FUNCTION') ORDER BY object_name";

pub(super) fn collect_schema(connection: &Connection) -> Result<SchemaSnapshot> {
    let mut snapshot = SchemaSnapshot::default();

    let tables = connection
        .query_as::<(String, Option<String>, Option<String>)>(TABLES_QUERY, &[])
        .map_err(oracle_error)?;

    for row in tables {
        let (name, tablespace, status) = row.map_err(oracle_error)?;
        let columns = collect_columns(connection, &name)?;

        let mut table = SchemaObject::new();
        table.insert("name".to_string(), Value::String(name));
        table.insert("tablespace".to_string(), json!(tablespace));
        table.insert("status".to_string(), json!(status));
        table.insert("columns".to_string(), Value::Array(columns));
        snapshot.tables.push(table);
    }

    let views = connection
        .query_as::<(String, Option<String>)>(VIEWS_QUERY, &[])
        .map_err(oracle_error)?;

    for row in views {
        let (name, definition) = row.map_err(oracle_error)?;
        let mut view = SchemaObject::new();
        view.insert("name".to_string(), Value::String(name));
        view.insert("definition".to_string(), json!(definition));
        snapshot.views.push(view);
    }

    let routines = connection
        .query_as::<(String, String, Option<String>)>(ROUTINES_QUERY, &[])
        .map_err(oracle_error)?;

    for row in routines {
        let (name, object_type, status) = row.map_err(oracle_error)?;
        let mut routine = SchemaObject::new();
        routine.insert("name".to_string(), Value::String(name));
        routine.insert("status".to_string(), json!(status));

        match object_type.as_str() {
            "PROCEDURE" => snapshot.procedures.push(routine),
            "FUNCTION" => snapshot.functions.push(routine),
            _ => {}
        }
    }

    tracing::debug!(
        "Collected Oracle schema: {} tables, {} views, {} procedures, {} functions",
        snapshot.tables.len(),
        snapshot.views.len(),
        snapshot.procedures.len(),
        snapshot.functions.len()
    );

    Ok(snapshot)
}

fn collect_columns(connection: &Connection, table: &str) -> Result<Vec<Value>> {
    let rows = connection
        .query_named_as::<(String, Option<String>, Option<i64>, Option<String>, Option<String>)>(
            COLUMNS_QUERY,
            &[("t", &table)],
        )
        .map_err(oracle_error)?;

    rows.map(|row| {
        let (name, data_type, length, nullable, default) = row.map_err(oracle_error)?;
        Ok(json!({
            "name": name,
            "type": data_type,
            "length": length,
            "nullable": nullable.as_deref() == Some("Y"),
            "default": default,
        }))
    })
    .collect()
}

/// Lists tables owned by `owner`, or by the connected user.
pub(super) fn list_tables(connection: &Connection, owner: Option<&str>) -> Result<Vec<String>> {
    let rows = match owner {
        Some(owner) => connection.query_named_as::<String>(
            "SELECT table_name FROM all_tables WHERE owner = :o ORDER BY table_name",
            &[("o", &owner)],
        ),
        None => connection
            .query_as::<String>("SELECT table_name FROM user_tables ORDER BY table_name", &[]),
    }
    .map_err(oracle_error)?;

    rows.map(|row| row.map_err(oracle_error)).collect()
}
