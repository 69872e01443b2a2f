//! Heuristic risk assessment for SQL issued by automated callers.
//!
//! [`RiskAssessor::assess`] maps statement text to a [`RiskAssessment`]. It
//! performs no I/O and touches no mutable state, so the multiplexer can call
//! it before any connector is resolved: a blocked statement never reaches a
//! driver.
//!
//! # Scoring
//! - each of ten dangerous patterns: +30 and forces unsafe
//! - data modification: +15
//! - schema change: +25
//! - UPDATE/DELETE without WHERE: +20 and forces unsafe
//! - wildcard `SELECT *`: +10
//! - system commands: +40 and forces unsafe
//! - structural complexity: up to +5
//!
//! The total is clamped to `[0, 100]`; anything at or above 70 is unsafe
//! regardless of the forcing rules.

mod patterns;


pub use patterns::{DangerousPattern, RiskPatterns};

use crate::models::{RiskAssessment, RiskLevel};
use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

/// Weight added for each matched dangerous pattern
pub const DANGEROUS_OPERATION_WEIGHT: f64 = 30.0;
/// Weight for INSERT/UPDATE/DELETE/MERGE statements
pub const DATA_MODIFICATION_WEIGHT: f64 = 15.0;
/// Weight for CREATE/ALTER/DROP of tables, indexes and views
pub const SCHEMA_CHANGE_WEIGHT: f64 = 25.0;
/// Weight for UPDATE/DELETE lacking a WHERE clause
pub const NO_WHERE_CLAUSE_WEIGHT: f64 = 20.0;
/// Weight for `SELECT *`
pub const WILDCARD_SELECT_WEIGHT: f64 = 10.0;
/// Weight for server-level or shell-reaching commands
pub const SYSTEM_COMMAND_WEIGHT: f64 = 40.0;
/// Weight applied to the normalized complexity factor
pub const COMPLEX_QUERY_WEIGHT: f64 = 5.0;
/// Upper bound of the risk score
pub const MAX_RISK_SCORE: f64 = 100.0;

/// Stateless SQL risk scorer.
///
/// # Example
/// ```rust
/// use sqlwarden_core::models::RiskLevel;
/// use sqlwarden_core::safety::RiskAssessor;
///
/// let assessment = RiskAssessor::new().assess("DELETE FROM users");
/// assert_eq!(assessment.level, RiskLevel::Medium);
/// assert!(!assessment.is_safe);
/// assert!(assessment.dangerous_operations.contains(&"delete_all".to_string()));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAssessor;

impl RiskAssessor {
    /// Creates an assessor; the pattern catalog is shared process-wide.
    pub fn new() -> Self {
        Self
    }

    /// Scores a statement.
    pub fn assess(&self, text: &str) -> RiskAssessment {
        if !has_parseable_content(text) {
            return RiskAssessment {
                level: RiskLevel::High,
                score: 80.0,
                warnings: vec!["Invalid SQL syntax".to_string()],
                dangerous_operations: Vec::new(),
                is_safe: false,
                recommendation: "Unable to parse SQL query".to_string(),
            };
        }

        let patterns = RiskPatterns::instance();
        let mut score = 0.0;
        let mut warnings = Vec::new();
        let mut dangerous_operations = Vec::new();
        let mut forced_unsafe = false;

        for pattern in &patterns.dangerous {
            if pattern.regex.is_match(text) {
                score += DANGEROUS_OPERATION_WEIGHT;
                dangerous_operations.push(pattern.name.to_string());
                warnings.push(format!("Dangerous operation detected: {}", pattern.name));
                forced_unsafe = true;
            }
        }

        if patterns.data_modification.iter().any(|p| p.is_match(text)) {
            score += DATA_MODIFICATION_WEIGHT;
            warnings.push("Data modification operation detected".to_string());
        }

        if patterns.schema_change.iter().any(|p| p.is_match(text)) {
            score += SCHEMA_CHANGE_WEIGHT;
            warnings.push("Schema modification operation detected".to_string());
        }

        if has_missing_where_clause(patterns, text) {
            score += NO_WHERE_CLAUSE_WEIGHT;
            warnings.push("UPDATE/DELETE query without WHERE clause".to_string());
            forced_unsafe = true;
        }

        if patterns.wildcard_select.is_match(text) {
            score += WILDCARD_SELECT_WEIGHT;
            warnings.push("Wildcard SELECT statement detected".to_string());
        }

        if patterns.system_command.iter().any(|p| p.is_match(text)) {
            score += SYSTEM_COMMAND_WEIGHT;
            warnings.push("System command detected".to_string());
            forced_unsafe = true;
        }

        score += complexity_factor(patterns, text) * COMPLEX_QUERY_WEIGHT;
        let score = score.clamp(0.0, MAX_RISK_SCORE);
        let level = RiskLevel::from_score(score);
        let is_safe = !forced_unsafe && score < RiskLevel::HIGH_THRESHOLD;
        let recommendation = recommend(level, &dangerous_operations, &warnings);

        tracing::debug!(
            score,
            %level,
            is_safe,
            dangerous = dangerous_operations.len(),
            "Assessed query risk"
        );

        RiskAssessment {
            level,
            score,
            warnings,
            dangerous_operations,
            is_safe,
            recommendation,
        }
    }
}

/// Returns false when the text holds nothing but whitespace and comments.
///
/// Tokenizer errors (an unterminated literal, say) are not treated as
/// unparseable: the heuristics still get to see the statement.
fn has_parseable_content(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }

    match Tokenizer::new(&GenericDialect {}, text).tokenize() {
        Ok(tokens) => tokens
            .iter()
            .any(|token| !matches!(token, Token::Whitespace(_) | Token::EOF)),
        Err(e) => {
            tracing::debug!("Tokenizer rejected statement, scoring heuristically: {}", e);
            true
        }
    }
}

fn has_missing_where_clause(patterns: &RiskPatterns, text: &str) -> bool {
    let stripped = patterns.strip_comments(text);
    let targets_rows =
        patterns.update_set.is_match(&stripped) || patterns.delete_unqualified.is_match(&stripped);

    targets_rows && !patterns.where_clause.is_match(&stripped)
}

/// Structural feature count, normalized to `[0, 1]`.
fn complexity_factor(patterns: &RiskPatterns, text: &str) -> f64 {
    let total: usize = patterns
        .complexity
        .iter()
        .map(|p| p.find_iter(text).count())
        .sum();

    (total as f64 / 10.0).min(1.0)
}

fn recommend(level: RiskLevel, dangerous_operations: &[String], warnings: &[String]) -> String {
    match level {
        RiskLevel::Critical => "Query blocked: Critical risk level".to_string(),
        RiskLevel::High => "High risk query".to_string(),
        RiskLevel::Medium => "Medium risk query".to_string(),
        RiskLevel::Low => dangerous_operations
            .first()
            .or_else(|| warnings.first())
            .cloned()
            .unwrap_or_else(|| "Query appears safe".to_string()),
    }
}
