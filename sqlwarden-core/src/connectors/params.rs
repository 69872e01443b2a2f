//! Named parameter rewriting.
//!
//! Callers write `:name` or `%(name)s` regardless of backend. Each connector
//! rewrites the statement into its driver's placeholder form before binding.
//! String literals, quoted identifiers, comments and `::` casts are copied
//! through untouched.

use crate::models::QueryParameters;
use crate::{Result, error::SqlWardenError};
use serde_json::Value;

/// Native placeholder syntax of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... (PostgreSQL); a repeated name reuses its number
    Numbered,
    /// `?` (MySQL); a repeated name binds its value again
    Positional,
    /// `:name` (Oracle)
    Named,
}

/// Statement text in native placeholder form plus its values in bind order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    /// `(parameter name, value)` in the order the driver expects them
    pub values: Vec<(String, Value)>,
}

/// Rewrites named placeholders in `text` for `style`.
///
/// Without parameters the text is returned unchanged. Parameters the
/// statement never references are ignored.
///
/// # Example
/// ```rust
/// use sqlwarden_core::connectors::params::{PlaceholderStyle, bind_named};
/// use serde_json::json;
///
/// let mut params = serde_json::Map::new();
/// params.insert("id".to_string(), json!(7));
///
/// let bound = bind_named("SELECT * FROM t WHERE id = :id", Some(&params), PlaceholderStyle::Numbered)
///     .unwrap();
/// assert_eq!(bound.sql, "SELECT * FROM t WHERE id = $1");
/// ```
///
/// # Errors
/// Returns `QueryExecution` when the statement references a parameter that
/// has no value.
pub fn bind_named(
    text: &str,
    parameters: Option<&QueryParameters>,
    style: PlaceholderStyle,
) -> Result<BoundStatement> {
    let Some(parameters) = parameters.filter(|p| !p.is_empty()) else {
        return Ok(BoundStatement {
            sql: text.to_string(),
            values: Vec::new(),
        });
    };

    let chars: Vec<char> = text.chars().collect();
    let mut binder = Binder {
        parameters,
        style,
        sql: String::with_capacity(text.len()),
        values: Vec::new(),
    };

    let mut i = 0;
    while i < chars.len() {
        let current = chars[i];
        let next = chars.get(i + 1).copied();

        match (current, next) {
            ('\'' | '"' | '`', _) => {
                let end = skip_quoted(&chars, i, style == PlaceholderStyle::Positional);
                binder.sql.extend(&chars[i..end]);
                i = end;
            }
            ('-', Some('-')) => {
                let end = chars[i..]
                    .iter()
                    .position(|c| *c == '\n')
                    .map_or(chars.len(), |offset| i + offset);
                binder.sql.extend(&chars[i..end]);
                i = end;
            }
            ('/', Some('*')) => {
                let end = find_block_comment_end(&chars, i + 2);
                binder.sql.extend(&chars[i..end]);
                i = end;
            }
            (':', Some(':')) => {
                binder.sql.push_str("::");
                i += 2;
            }
            (':', Some(c)) if is_name_start(c) => {
                let end = scan_name(&chars, i + 1);
                let name: String = chars[i + 1..end].iter().collect();
                binder.placeholder(&name)?;
                i = end;
            }
            ('%', Some('%')) => {
                binder.sql.push('%');
                i += 2;
            }
            ('%', Some('(')) => match pyformat_name(&chars, i) {
                Some((name, end)) => {
                    binder.placeholder(&name)?;
                    i = end;
                }
                None => {
                    binder.sql.push('%');
                    i += 1;
                }
            },
            _ => {
                binder.sql.push(current);
                i += 1;
            }
        }
    }

    Ok(BoundStatement {
        sql: binder.sql,
        values: binder.values,
    })
}

struct Binder<'a> {
    parameters: &'a QueryParameters,
    style: PlaceholderStyle,
    sql: String,
    values: Vec<(String, Value)>,
}

impl Binder<'_> {
    fn placeholder(&mut self, name: &str) -> Result<()> {
        let value = self.parameters.get(name).ok_or_else(|| {
            SqlWardenError::query_failed(format!("Missing value for parameter '{}'", name))
        })?;
        let seen = self.values.iter().position(|(bound, _)| bound == name);

        match self.style {
            PlaceholderStyle::Numbered => {
                let number = match seen {
                    Some(index) => index + 1,
                    None => {
                        self.values.push((name.to_string(), value.clone()));
                        self.values.len()
                    }
                };
                self.sql.push('$');
                self.sql.push_str(&number.to_string());
            }
            PlaceholderStyle::Positional => {
                self.values.push((name.to_string(), value.clone()));
                self.sql.push('?');
            }
            PlaceholderStyle::Named => {
                if seen.is_none() {
                    self.values.push((name.to_string(), value.clone()));
                }
                self.sql.push(':');
                self.sql.push_str(name);
            }
        }

        Ok(())
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn scan_name(chars: &[char], start: usize) -> usize {
    chars[start..]
        .iter()
        .position(|c| !is_name_char(*c))
        .map_or(chars.len(), |offset| start + offset)
}

/// Returns the index just past the closing quote (or the end of input).
///
/// A doubled quote character is an escaped quote; with `backslash_escapes`
/// a backslash also escapes the following character.
fn skip_quoted(chars: &[char], start: usize, backslash_escapes: bool) -> usize {
    let quote = chars[start];
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        if backslash_escapes && c == '\\' && quote != '`' {
            i += 2;
        } else if c == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
            } else {
                return i + 1;
            }
        } else {
            i += 1;
        }
    }

    chars.len()
}

fn find_block_comment_end(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

/// Parses `%(name)s` starting at `start`; returns the name and the index past `s`.
fn pyformat_name(chars: &[char], start: usize) -> Option<(String, usize)> {
    let name_start = start + 2;
    if !chars.get(name_start).copied().is_some_and(is_name_start) {
        return None;
    }

    let name_end = scan_name(chars, name_start);
    if chars.get(name_end) != Some(&')') || chars.get(name_end + 1) != Some(&'s') {
        return None;
    }

    Some((chars[name_start..name_end].iter().collect(), name_end + 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> QueryParameters {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn names(bound: &BoundStatement) -> Vec<&str> {
        bound.values.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[test]
    fn test_without_parameters_text_is_untouched() {
        let text = "SELECT * FROM t WHERE a = :a AND b LIKE '50%'";
        let bound = bind_named(text, None, PlaceholderStyle::Numbered).unwrap();
        assert_eq!(bound.sql, text);
        assert!(bound.values.is_empty());

        let empty = QueryParameters::new();
        let bound = bind_named(text, Some(&empty), PlaceholderStyle::Positional).unwrap();
        assert_eq!(bound.sql, text);
    }

    #[test]
    fn test_numbered_reuses_position_for_repeated_name() {
        let p = params(&[("id", json!(1)), ("name", json!("bob"))]);
        let bound = bind_named(
            "SELECT * FROM t WHERE id = :id OR parent = :id AND name = %(name)s",
            Some(&p),
            PlaceholderStyle::Numbered,
        )
        .unwrap();

        assert_eq!(
            bound.sql,
            "SELECT * FROM t WHERE id = $1 OR parent = $1 AND name = $2"
        );
        assert_eq!(names(&bound), ["id", "name"]);
    }

    #[test]
    fn test_positional_binds_repeated_name_twice() {
        let p = params(&[("id", json!(1))]);
        let bound = bind_named(
            "SELECT * FROM t WHERE id = :id OR parent = :id",
            Some(&p),
            PlaceholderStyle::Positional,
        )
        .unwrap();

        assert_eq!(bound.sql, "SELECT * FROM t WHERE id = ? OR parent = ?");
        assert_eq!(names(&bound), ["id", "id"]);
    }

    #[test]
    fn test_named_style_normalizes_pyformat() {
        let p = params(&[("owner", json!("HR"))]);
        let bound = bind_named(
            "SELECT table_name FROM all_tables WHERE owner = %(owner)s OR owner = :owner",
            Some(&p),
            PlaceholderStyle::Named,
        )
        .unwrap();

        assert_eq!(
            bound.sql,
            "SELECT table_name FROM all_tables WHERE owner = :owner OR owner = :owner"
        );
        assert_eq!(names(&bound), ["owner"]);
    }

    #[test]
    fn test_literals_comments_and_casts_are_skipped() {
        let p = params(&[("id", json!(3))]);
        let bound = bind_named(
            "SELECT ':id', \"col:id\", created::date -- :id\nFROM t /* :id */ WHERE id = :id",
            Some(&p),
            PlaceholderStyle::Numbered,
        )
        .unwrap();

        assert_eq!(
            bound.sql,
            "SELECT ':id', \"col:id\", created::date -- :id\nFROM t /* :id */ WHERE id = $1"
        );
        assert_eq!(bound.values.len(), 1);
    }

    #[test]
    fn test_escaped_quotes_stay_inside_literal() {
        let p = params(&[("x", json!(1))]);

        let bound = bind_named("SELECT 'it''s :x' , :x", Some(&p), PlaceholderStyle::Numbered)
            .unwrap();
        assert_eq!(bound.sql, "SELECT 'it''s :x' , $1");

        let bound = bind_named(r"SELECT 'it\'s :x', :x", Some(&p), PlaceholderStyle::Positional)
            .unwrap();
        assert_eq!(bound.sql, r"SELECT 'it\'s :x', ?");
    }

    #[test]
    fn test_percent_handling() {
        let p = params(&[("pattern", json!("a%"))]);
        let bound = bind_named(
            "SELECT 100 %% 7, name FROM t WHERE name LIKE %(pattern)s AND note = %(bad",
            Some(&p),
            PlaceholderStyle::Positional,
        )
        .unwrap();

        assert_eq!(
            bound.sql,
            "SELECT 100 % 7, name FROM t WHERE name LIKE ? AND note = %(bad"
        );
    }

    #[test]
    fn test_missing_parameter_is_an_error() {
        let p = params(&[("id", json!(1))]);
        let err = bind_named(
            "SELECT * FROM t WHERE id = :id AND owner = :owner",
            Some(&p),
            PlaceholderStyle::Numbered,
        )
        .unwrap_err();

        assert!(matches!(err, SqlWardenError::QueryExecution { .. }));
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn test_unused_parameters_are_ignored() {
        let p = params(&[("id", json!(1)), ("unused", json!(2))]);
        let bound = bind_named("DELETE FROM t WHERE id = :id", Some(&p), PlaceholderStyle::Named)
            .unwrap();
        assert_eq!(names(&bound), ["id"]);
    }
}
