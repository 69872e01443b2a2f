//! Pre-compiled regex catalog used by the risk assessor.
//!
//! Patterns are compiled once into a process-wide immutable catalog, so
//! `RiskAssessor::assess` stays a pure function with no shared mutable state.
//! They are heuristics: trailing comments or unusual whitespace around
//! `WHERE` can defeat them, and none of this is a security boundary on its
//! own.

use regex::Regex;
use std::sync::OnceLock;

/// Named dangerous-operation pattern
pub struct DangerousPattern {
    /// Stable identifier reported in `dangerous_operations`
    pub name: &'static str,
    /// Case-insensitive matcher
    pub regex: Regex,
}

/// All patterns used by the assessor, compiled once.
pub struct RiskPatterns {
    /// Ten destructive or privileged operations, tested independently
    pub dangerous: Vec<DangerousPattern>,
    /// INSERT / UPDATE / DELETE / MERGE statements
    pub data_modification: Vec<Regex>,
    /// CREATE / ALTER / DROP of tables, indexes and views
    pub schema_change: Vec<Regex>,
    /// `UPDATE <table> SET`
    pub update_set: Regex,
    /// `DELETE [FROM] <table>` at end of statement
    pub delete_unqualified: Regex,
    /// Any `WHERE` keyword
    pub where_clause: Regex,
    /// `--` comments up to end of line
    pub line_comment: Regex,
    /// `/* ... */` comments, possibly spanning lines
    pub block_comment: Regex,
    /// `SELECT *`
    pub wildcard_select: Regex,
    /// Server-level and shell-reaching commands
    pub system_command: Vec<Regex>,
    /// Structural features counted towards the complexity score
    pub complexity: Vec<Regex>,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid risk pattern")
}

impl RiskPatterns {
    /// Gets the singleton instance of pre-compiled risk patterns.
    pub fn instance() -> &'static Self {
        static PATTERNS: OnceLock<RiskPatterns> = OnceLock::new();
        PATTERNS.get_or_init(Self::compile)
    }

    fn compile() -> Self {
        let dangerous = [
            ("drop_table", r"(?i)\bDROP\s+TABLE\b"),
            ("drop_database", r"(?i)\bDROP\s+DATABASE\b"),
            ("truncate_table", r"(?i)\bTRUNCATE\s+TABLE\b"),
            ("delete_all", r"(?i)\bDELETE\s+(FROM\s+)?\w+\s*$"),
            ("update_all", r"(?i)\bUPDATE\s+\w+\s+SET\b.*\bWHERE\s*$"),
            ("alter_table_drop", r"(?i)\bALTER\s+TABLE\s+\w+\s+DROP\b"),
            ("grant_all", r"(?i)\bGRANT\s+ALL\b"),
            ("revoke_all", r"(?i)\bREVOKE\s+ALL\b"),
            ("exec", r"(?i)\bEXEC\b|\bEXECUTE\b"),
            ("xp_cmdshell", r"(?i)\bxp_cmdshell\b"),
        ]
        .into_iter()
        .map(|(name, pattern)| DangerousPattern {
            name,
            regex: compile(pattern),
        })
        .collect();

        let data_modification = [
            r"(?i)\bINSERT\s+INTO\b",
            r"(?i)\bUPDATE\s+\w+\s+SET\b",
            r"(?i)\bDELETE\s+FROM\b",
            r"(?i)\bMERGE\s+INTO\b",
        ]
        .into_iter()
        .map(compile)
        .collect();

        let schema_change = [
            r"(?i)\bCREATE\s+TABLE\b",
            r"(?i)\bALTER\s+TABLE\b",
            r"(?i)\bDROP\s+TABLE\b",
            r"(?i)\bCREATE\s+INDEX\b",
            r"(?i)\bDROP\s+INDEX\b",
            r"(?i)\bCREATE\s+VIEW\b",
            r"(?i)\bDROP\s+VIEW\b",
        ]
        .into_iter()
        .map(compile)
        .collect();

        let system_command = [
            r"(?i)\bSHUTDOWN\b",
            r"(?i)\bBACKUP\s+DATABASE\b",
            r"(?i)\bRESTORE\s+DATABASE\b",
            r"(?i)\bEXEC\s+sp_",
            r"(?i)\bxp_cmdshell\b",
        ]
        .into_iter()
        .map(compile)
        .collect();

        let complexity = [
            // subqueries
            r"(?is)\bSELECT\b.*\bFROM\b.*\(\s*SELECT\b",
            r"(?i)\b(JOIN|INNER JOIN|LEFT JOIN|RIGHT JOIN|FULL JOIN)\b",
            r"(?i)\bUNION\b",
            r"(?i)\bGROUP\s+BY\b",
            r"(?i)\bHAVING\b",
            r"(?i)\bORDER\s+BY\b",
            r"(?i)\bCASE\b",
            r"(?i)\b(COUNT|SUM|AVG|MIN|MAX|CONCAT|SUBSTRING)\b",
        ]
        .into_iter()
        .map(compile)
        .collect();

        Self {
            dangerous,
            data_modification,
            schema_change,
            update_set: compile(r"(?i)\bUPDATE\s+\w+\s+SET\b"),
            delete_unqualified: compile(r"(?i)\bDELETE\s+(FROM\s+)?\w+\s*$"),
            where_clause: compile(r"(?i)\bWHERE\b"),
            line_comment: compile(r"(?m)--.*$"),
            block_comment: compile(r"(?s)/\*.*?\*/"),
            wildcard_select: compile(r"(?i)\bSELECT\s+\*"),
            system_command,
            complexity,
        }
    }

    /// Removes `--` and `/* */` comments and trims the result.
    pub fn strip_comments(&self, text: &str) -> String {
        let without_lines = self.line_comment.replace_all(text, "");
        self.block_comment
            .replace_all(&without_lines, "")
            .trim()
            .to_string()
    }
}
