//! Oracle value conversion.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use oracle::Row;
use oracle::sql_type::{OracleType, Timestamp, ToSql};
use serde_json::Value;

/// Owned bind values, built on the blocking thread that uses them.
pub(super) fn to_sql_values(values: &[(String, Value)]) -> Vec<(String, Box<dyn ToSql>)> {
    values
        .iter()
        .map(|(name, value)| (name.clone(), to_sql(value)))
        .collect()
}

/// Borrows owned bind values in the shape `query_named` expects.
pub(super) fn as_named(values: &[(String, Box<dyn ToSql>)]) -> Vec<(&str, &dyn ToSql)> {
    values
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_ref()))
        .collect()
}

// Booleans bind as 1/0: BOOLEAN columns only exist from 23ai on.
fn to_sql(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Box::new(i),
            None => Box::new(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Box::new(s.clone()),
        Value::Array(_) | Value::Object(_) => Box::new(value.to_string()),
    }
}

/// Extracts column `idx` as JSON, dispatching on the declared column type.
pub(super) fn extract_value(row: &Row, idx: usize, oracle_type: &OracleType) -> Value {
    match oracle_type {
        OracleType::Number(_, _) | OracleType::Int64 | OracleType::UInt64 => {
            if let Ok(v) = row.get::<_, Option<i64>>(idx) {
                return v.map(Value::from).unwrap_or(Value::Null);
            }
            if let Ok(v) = row.get::<_, Option<f64>>(idx) {
                return v.map(Value::from).unwrap_or(Value::Null);
            }
            text(row, idx)
        }
        OracleType::BinaryFloat | OracleType::BinaryDouble | OracleType::Float(_) => row
            .get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map_or(Value::Null, Value::from),
        OracleType::Date
        | OracleType::Timestamp(_)
        | OracleType::TimestampTZ(_)
        | OracleType::TimestampLTZ(_) => row
            .get::<_, Option<Timestamp>>(idx)
            .ok()
            .flatten()
            .map_or(Value::Null, |ts| Value::String(format_timestamp(&ts))),
        OracleType::Raw(_) | OracleType::LongRaw | OracleType::BLOB => row
            .get::<_, Option<Vec<u8>>>(idx)
            .ok()
            .flatten()
            .map_or(Value::Null, |bytes| Value::String(BASE64.encode(bytes))),
        OracleType::Boolean => row
            .get::<_, Option<bool>>(idx)
            .ok()
            .flatten()
            .map_or(Value::Null, Value::Bool),
        _ => text(row, idx),
    }
}

fn text(row: &Row, idx: usize) -> Value {
    row.get::<_, Option<String>>(idx)
        .ok()
        .flatten()
        .map_or(Value::Null, Value::String)
}

fn format_timestamp(ts: &Timestamp) -> String {
    let mut formatted = format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        ts.year(),
        ts.month(),
        ts.day(),
        ts.hour(),
        ts.minute(),
        ts.second()
    );
    if ts.nanosecond() > 0 {
        formatted.push_str(&format!(".{:09}", ts.nanosecond()));
    }
    formatted
}
