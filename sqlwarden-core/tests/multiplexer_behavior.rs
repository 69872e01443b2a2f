//! Multiplexer behaviour against instrumented in-memory connectors.
//!
//! The fake connector is keyed off the descriptor's database name:
//! `unreachable` refuses to connect, `hang` never finishes connecting and
//! `flaky-close` fails on close. Statements containing `SLOW` never return.

use async_trait::async_trait;
use serde_json::{Value, json};
use sqlwarden_core::{
    BackendType, ConnectionDescriptor, ConnectionMultiplexer, ConnectorRegistry,
    DatabaseConnector, MultiplexerConfig, Query, QueryParameters, QueryResult, Result,
    ResultRow, RiskLevel, SchemaSnapshot, SqlWardenError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct Counters {
    created: AtomicUsize,
    connects: AtomicUsize,
    executes: AtomicUsize,
    rows_fetched: AtomicUsize,
    closes: AtomicUsize,
}

impl Counters {
    fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

struct FakeConnector {
    descriptor: ConnectionDescriptor,
    connected: bool,
    counters: Arc<Counters>,
}

#[async_trait]
impl DatabaseConnector for FakeConnector {
    fn backend(&self) -> BackendType {
        self.descriptor.backend_type
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<()> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        // Widen the window for concurrent first use
        tokio::time::sleep(Duration::from_millis(25)).await;

        match self.descriptor.database.as_str() {
            "unreachable" => Err(SqlWardenError::connection_failed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            "hang" => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }
            _ => {
                self.connected = true;
                Ok(())
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        self.connected = false;
        if self.descriptor.database == "flaky-close" {
            return Err(SqlWardenError::query_failed("close refused"));
        }
        Ok(())
    }

    async fn execute(
        &self,
        text: &str,
        parameters: Option<&QueryParameters>,
        max_rows: Option<usize>,
    ) -> Result<QueryResult> {
        if !self.connected {
            return Err(SqlWardenError::not_connected(self.backend()));
        }
        self.counters.executes.fetch_add(1, Ordering::SeqCst);

        if text.contains("SLOW") {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }

        let kind = self.classify(text);
        if !kind.is_read() {
            return Ok(QueryResult::affected(kind, 3));
        }

        let echo = parameters
            .and_then(|p| p.get("id"))
            .cloned()
            .unwrap_or(Value::Null);
        let fetched = max_rows.map_or(5, |max| (max + 1).min(5));
        self.counters
            .rows_fetched
            .fetch_add(fetched, Ordering::SeqCst);
        let rows: Vec<ResultRow> = (0..fetched)
            .map(|n| {
                let mut row = ResultRow::new();
                row.insert("n".to_string(), json!(n));
                row.insert("id".to_string(), echo.clone());
                row
            })
            .collect();
        Ok(QueryResult::from_rows(
            vec!["n".to_string(), "id".to_string()],
            rows,
        ))
    }

    async fn schema(&self) -> Result<SchemaSnapshot> {
        let mut table = serde_json::Map::new();
        table.insert("name".to_string(), json!("users"));
        Ok(SchemaSnapshot {
            tables: vec![table],
            ..SchemaSnapshot::default()
        })
    }

    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<String>> {
        Ok(match schema {
            Some("audit") => vec!["events".to_string()],
            _ => vec!["orders".to_string(), "users".to_string()],
        })
    }

    async fn validate_syntax(&self, text: &str) -> bool {
        !text.trim_start().to_uppercase().starts_with("SELEKT")
    }

    async fn test(&self) -> bool {
        self.connected
    }
}

fn registry(counters: &Arc<Counters>) -> ConnectorRegistry {
    let mut registry = ConnectorRegistry::empty();
    for backend in [BackendType::Postgres, BackendType::MySql] {
        let counters = Arc::clone(counters);
        registry = registry.register(backend, move |descriptor, _| {
            counters.created.fetch_add(1, Ordering::SeqCst);
            Box::new(FakeConnector {
                descriptor: descriptor.clone(),
                connected: false,
                counters: Arc::clone(&counters),
            })
        });
    }
    registry
}

fn multiplexer(counters: &Arc<Counters>) -> ConnectionMultiplexer {
    ConnectionMultiplexer::with_registry(registry(counters), MultiplexerConfig::default()).unwrap()
}

fn descriptor(database: &str) -> ConnectionDescriptor {
    ConnectionDescriptor::new(
        BackendType::Postgres,
        "db.internal",
        5432,
        database,
        "agent",
        "s3cret",
    )
}

#[tokio::test]
async fn test_identical_descriptors_reuse_one_connector() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    for _ in 0..3 {
        let result = multiplexer
            .execute_query(&Query::new("SELECT id FROM users", descriptor("app")), true)
            .await;
        assert!(result.success, "{:?}", result.error_message);
    }

    // A different password maps to the same identity key
    let rotated = ConnectionDescriptor::new(
        BackendType::Postgres,
        "db.internal",
        5432,
        "app",
        "agent",
        "rotated",
    );
    assert!(multiplexer.test_connection(&rotated).await);

    assert_eq!(Counters::get(&counters.created), 1);
    assert_eq!(Counters::get(&counters.connects), 1);
    assert_eq!(Counters::get(&counters.executes), 3);
    assert_eq!(multiplexer.cached_connections(), 1);
}

#[tokio::test]
async fn test_descriptor_differing_in_port_or_backend_gets_own_connector() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    let mut other_port = descriptor("app");
    other_port.port = 5433;
    let mut other_backend = descriptor("app");
    other_backend.backend_type = BackendType::MySql;

    assert!(multiplexer.test_connection(&descriptor("app")).await);
    assert!(multiplexer.test_connection(&other_port).await);
    assert!(multiplexer.test_connection(&other_backend).await);

    assert_eq!(Counters::get(&counters.connects), 3);
    assert_eq!(multiplexer.cached_connections(), 3);
}

#[tokio::test]
async fn test_concurrent_first_use_performs_one_connect() {
    let counters = Arc::new(Counters::default());
    let multiplexer = Arc::new(multiplexer(&counters));

    let tasks = (0..16).map(|_| {
        let multiplexer = Arc::clone(&multiplexer);
        tokio::spawn(async move {
            multiplexer
                .execute_query(&Query::new("SELECT 1", descriptor("app")), true)
                .await
        })
    });

    for outcome in futures::future::join_all(tasks).await {
        assert!(outcome.unwrap().success);
    }

    assert_eq!(Counters::get(&counters.created), 1);
    assert_eq!(Counters::get(&counters.connects), 1);
    assert_eq!(Counters::get(&counters.executes), 16);
}

#[tokio::test]
async fn test_unsafe_query_never_reaches_connector() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    let result = multiplexer
        .execute_query(&Query::new("DELETE FROM users", descriptor("app")), true)
        .await;

    assert!(!result.success);
    assert_eq!(result.error_message.as_deref(), Some("Medium risk query"));
    assert!(result.rows.is_none());
    assert!(result.execution_time >= 0.0);
    assert_eq!(Counters::get(&counters.created), 0);
    assert_eq!(Counters::get(&counters.executes), 0);

    let critical = multiplexer
        .execute_query(
            &Query::new("DROP TABLE users; SHUTDOWN", descriptor("app")),
            true,
        )
        .await;
    assert_eq!(
        critical.error_message.as_deref(),
        Some("Query blocked: Critical risk level")
    );
    assert_eq!(Counters::get(&counters.created), 0);
}

#[tokio::test]
async fn test_unsafe_query_runs_when_validation_disabled() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    let result = multiplexer
        .execute_query(&Query::new("DELETE FROM users", descriptor("app")), false)
        .await;

    assert!(result.success);
    assert_eq!(result.row_count, 3);
    assert!(result.rows.is_none());
    assert_eq!(Counters::get(&counters.executes), 1);
}

#[tokio::test]
async fn test_execute_uses_configured_default_safety() {
    let counters = Arc::new(Counters::default());
    let permissive = ConnectionMultiplexer::with_registry(
        registry(&counters),
        MultiplexerConfig::new().with_default_validate_safety(false),
    )
    .unwrap();
    let strict = multiplexer(&counters);

    let query = Query::new("DELETE FROM users", descriptor("app"));
    assert!(permissive.execute(&query).await.success);
    assert!(!strict.execute(&query).await.success);
    assert_eq!(Counters::get(&counters.executes), 1);
}

#[tokio::test]
async fn test_query_exceeding_timeout_fails() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    let query = Query::new("SELECT 'SLOW' AS marker", descriptor("app"))
        .with_timeout(Duration::from_millis(50));
    let result = multiplexer.execute_query(&query, true).await;

    assert!(!result.success);
    assert_eq!(
        result.error_message.as_deref(),
        Some("Query timed out after 50ms")
    );
    assert!(result.execution_time < 5.0);

    // The abandoned statement released its read lock
    assert!(multiplexer.close_connection(&descriptor("app")).await.is_ok());
}

#[tokio::test]
async fn test_max_rows_truncates_result() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    let mut parameters = QueryParameters::new();
    parameters.insert("id".to_string(), json!(42));
    let query = Query::new("SELECT n, :id AS id FROM numbers", descriptor("app"))
        .with_parameters(parameters)
        .with_max_rows(2);
    let result = multiplexer.execute_query(&query, true).await;

    assert!(result.success);
    assert!(result.truncated);
    assert_eq!(result.row_count, 2);
    let rows = result.rows.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["n"], json!(1));
    assert_eq!(rows[0]["id"], json!(42));
    // The limit reaches the connector, which stops one row past it
    assert_eq!(Counters::get(&counters.rows_fetched), 3);
}

#[tokio::test]
async fn test_unsupported_backend_fails_cleanly() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    let mut oracle = descriptor("XEPDB1");
    oracle.backend_type = BackendType::Oracle;

    let result = multiplexer
        .execute_query(&Query::new("SELECT 1 FROM dual", oracle.clone()), true)
        .await;
    assert!(!result.success);
    assert_eq!(
        result.error_message.as_deref(),
        Some("Unsupported database type: oracle")
    );
    assert!(!multiplexer.test_connection(&oracle).await);
    assert_eq!(multiplexer.cached_connections(), 0);
}

#[tokio::test]
async fn test_failed_connect_is_not_cached_and_retries() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    assert!(!multiplexer.test_connection(&descriptor("unreachable")).await);
    assert!(!multiplexer.test_connection(&descriptor("unreachable")).await);

    assert_eq!(Counters::get(&counters.connects), 2);
    assert_eq!(multiplexer.cached_connections(), 0);

    let err = multiplexer
        .list_tables(&descriptor("unreachable"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlWardenError::Connection { .. }));
    assert!(!err.to_string().contains("s3cret"));
}

#[tokio::test]
async fn test_connect_timeout_surfaces_as_failure() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    let descriptor = descriptor("hang").with_connect_timeout(Duration::from_millis(50));
    let result = multiplexer
        .execute_query(&Query::new("SELECT 1", descriptor), true)
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error_message.as_deref(),
        Some("Connection timed out after 50ms")
    );
    assert_eq!(multiplexer.cached_connections(), 0);
}

#[tokio::test]
async fn test_validate_query_scores_and_checks_syntax() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    let assessment = multiplexer
        .validate_query("SELECT * FROM users", &descriptor("app"))
        .await;
    assert!(assessment.is_safe);
    assert_eq!(assessment.score, 10.0);
    assert_eq!(assessment.level, RiskLevel::Low);

    let assessment = multiplexer
        .validate_query("SELEKT name FROM users", &descriptor("app"))
        .await;
    assert!(!assessment.is_safe);
    assert_eq!(assessment.recommendation, "Query has syntax errors");
}

#[tokio::test]
async fn test_validate_query_reports_connection_failure() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    let assessment = multiplexer
        .validate_query("SELECT 1", &descriptor("unreachable"))
        .await;

    assert!(!assessment.is_safe);
    assert_eq!(assessment.level, RiskLevel::High);
    assert_eq!(assessment.score, 80.0);
    assert!(
        assessment
            .recommendation
            .starts_with("Validation failed: Database connection failed")
    );
}

#[tokio::test]
async fn test_schema_and_list_tables_delegate() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    let snapshot = multiplexer.schema(&descriptor("app")).await.unwrap();
    assert_eq!(snapshot.tables[0]["name"], json!("users"));
    assert!(snapshot.views.is_empty());

    let tables = multiplexer.list_tables(&descriptor("app"), None).await.unwrap();
    assert_eq!(tables, vec!["orders", "users"]);
    let audit = multiplexer
        .list_tables(&descriptor("app"), Some("audit"))
        .await
        .unwrap();
    assert_eq!(audit, vec!["events"]);

    assert_eq!(Counters::get(&counters.connects), 1);
}

#[tokio::test]
async fn test_close_connection_evicts_and_closes_once() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    assert!(multiplexer.test_connection(&descriptor("app")).await);
    multiplexer.close_connection(&descriptor("app")).await.unwrap();
    multiplexer.close_connection(&descriptor("app")).await.unwrap();

    assert_eq!(Counters::get(&counters.closes), 1);
    assert_eq!(multiplexer.cached_connections(), 0);

    // Next use reconnects
    assert!(multiplexer.test_connection(&descriptor("app")).await);
    assert_eq!(Counters::get(&counters.connects), 2);
}

#[tokio::test]
async fn test_close_all_attempts_every_connector() {
    let counters = Arc::new(Counters::default());
    let multiplexer = multiplexer(&counters);

    for database in ["app", "flaky-close", "reporting"] {
        assert!(multiplexer.test_connection(&descriptor(database)).await);
    }
    assert_eq!(multiplexer.cached_connections(), 3);

    multiplexer.close_all_connections().await;

    assert_eq!(Counters::get(&counters.closes), 3);
    assert_eq!(multiplexer.cached_connections(), 0);

    // Closing an empty cache is a no-op
    multiplexer.close_all_connections().await;
    assert_eq!(Counters::get(&counters.closes), 3);
}
