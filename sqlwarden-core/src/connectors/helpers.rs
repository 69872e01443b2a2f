//! Helpers shared by the sqlx-backed connectors.

use crate::error::SqlWardenError;
use crate::models::{QueryResult, ResultRow};
use crate::safety::RiskPatterns;
use crate::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bigdecimal::{BigDecimal, ToPrimitive};
use futures::{Stream, TryStreamExt};
use serde_json::{Number, Value};
use sqlx::{Column, Row};

/// Extension trait for reading text columns out of metadata rows with
/// consistent error context.
pub(crate) trait RowExt {
    /// Reads a nullable text column.
    fn text(&self, column: &str) -> Result<Option<String>>;

    /// Reads a text column that must not be NULL.
    fn required_text(&self, column: &str) -> Result<String> {
        self.text(column)?.ok_or_else(|| {
            SqlWardenError::query_failed(format!("Column '{}' was unexpectedly NULL", column))
        })
    }
}

#[cfg(feature = "postgresql")]
impl RowExt for sqlx::postgres::PgRow {
    fn text(&self, column: &str) -> Result<Option<String>> {
        self.try_get(column).map_err(|e| column_error(column, e))
    }
}

#[cfg(feature = "mysql")]
impl RowExt for sqlx::mysql::MySqlRow {
    fn text(&self, column: &str) -> Result<Option<String>> {
        self.try_get(column).map_err(|e| column_error(column, e))
    }
}

fn column_error(column: &str, error: sqlx::Error) -> SqlWardenError {
    SqlWardenError::query_failed(format!("Failed to read column '{}': {}", column, error))
}

/// Converts a driver error raised while running a statement.
pub(crate) fn execution_error(error: sqlx::Error) -> SqlWardenError {
    SqlWardenError::query_failed(error.to_string())
}

/// Binary column values travel as base64 text.
pub(crate) fn binary_value(bytes: &[u8]) -> Value {
    Value::String(BASE64.encode(bytes))
}

/// Largest digit count that survives a round trip through `f64`.
const F64_EXACT_DIGITS: u64 = 15;

/// NUMERIC/DECIMAL values become JSON numbers when `f64` holds them
/// exactly, and decimal strings otherwise.
pub(crate) fn decimal_value(value: &BigDecimal) -> Value {
    let normalized = value.normalized();
    if normalized.digits() <= F64_EXACT_DIGITS {
        if normalized.is_integer()
            && let Some(n) = normalized.to_i64()
        {
            return Value::Number(n.into());
        }
        if let Some(n) = value
            .to_string()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
        {
            return Value::Number(n);
        }
    }
    Value::String(value.to_string())
}

/// Names of the given result columns, in order.
pub(crate) fn column_names<C: Column>(columns: &[C]) -> Vec<String> {
    columns
        .iter()
        .map(|column| column.name().to_string())
        .collect()
}

/// Drains a row stream, stopping once one row past `max_rows` has arrived
/// so the caller can still tell that the result was cut short.
pub(crate) async fn collect_rows<R, S>(mut stream: S, max_rows: Option<usize>) -> Result<Vec<R>>
where
    S: Stream<Item = std::result::Result<R, sqlx::Error>> + Unpin,
{
    let cap = max_rows.map(|max| max.saturating_add(1));
    let mut rows = Vec::new();

    while let Some(row) = stream.try_next().await.map_err(execution_error)? {
        rows.push(row);
        if cap.is_some_and(|cap| rows.len() >= cap) {
            break;
        }
    }

    Ok(rows)
}

/// Whether `EXPLAIN <text>` would run the statement instead of planning it.
///
/// Covers `ANALYZE`/`ANALYSE` among the leading options, bare or inside a
/// parenthesised option list.
pub(crate) fn explain_would_execute(text: &str) -> bool {
    let stripped = RiskPatterns::instance()
        .strip_comments(text)
        .to_uppercase();
    let is_analyze = |word: &str| matches!(word, "ANALYZE" | "ANALYSE");
    let words = |s: &str| {
        s.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>()
    };

    if let Some(options) = stripped.strip_prefix('(') {
        let list = options.split(')').next().unwrap_or_default();
        return words(list).iter().any(|word| is_analyze(word.as_str()));
    }

    words(&stripped)
        .iter()
        .take_while(|word| {
            is_analyze(word.as_str())
                || matches!(
                    word.as_str(),
                    "VERBOSE" | "FORMAT" | "TREE" | "JSON" | "TRADITIONAL"
                )
        })
        .any(|word| is_analyze(word.as_str()))
}

/// Turns fetched rows into a read result, converting each cell with
/// `extract` (row, column index). Column names come from the first row;
/// callers fill them in from the statement when no row came back.
pub(crate) fn rows_to_result<R, F>(rows: &[R], extract: F) -> QueryResult
where
    R: Row,
    F: Fn(&R, usize) -> Value,
{
    let columns = rows
        .first()
        .map(|row| column_names(row.columns()))
        .unwrap_or_default();

    let converted = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(index, name)| (name.clone(), extract(row, index)))
                .collect::<ResultRow>()
        })
        .collect();

    QueryResult::from_rows(columns, converted)
}
