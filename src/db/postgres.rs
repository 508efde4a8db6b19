//! PostgreSQL backend.
//!
//! `PostgresConnector` owns a sqlx pool; each acquired session holds one
//! pooled connection, which goes back to the pool when the session drops.

use crate::config::PostgresConfig;
use crate::db::{
    Backend, BackendConnector, ColumnInfo, DatabaseClient, QueryResult, Row, TableSchema, Value,
};
use crate::error::{BenchError, Result};
use crate::normalize::TargetKind;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column as SqlxColumn, Connection, Postgres, Row as SqlxRow, TypeInfo};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// PostgreSQL connector.
#[derive(Debug)]
pub struct PostgresConnector {
    pool: PgPool,
}

impl PostgresConnector {
    /// Opens a connection pool, retrying transient failures with backoff.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let conn_str = config.to_connection_string();

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&conn_str)
                .await;

            match result {
                Ok(pool) => {
                    info!("Connected to PostgreSQL: {}", config.display_string());
                    return Ok(Self { pool });
                }
                Err(e) => {
                    let is_transient = is_transient_error(&e);
                    last_error = Some(e);

                    if attempt < MAX_RETRY_ATTEMPTS && is_transient {
                        warn!(
                            "Connection attempt {} failed (transient error), retrying in {:?}",
                            attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    } else {
                        break;
                    }
                }
            }
        }

        Err(match last_error {
            Some(e) => map_connection_error(e, config),
            None => BenchError::internal("no connection attempt was made"),
        })
    }
}

#[async_trait]
impl BackendConnector for PostgresConnector {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn acquire(&self) -> Result<Box<dyn DatabaseClient>> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| BenchError::connection(format!("Failed to acquire connection: {e}")))?;
        Ok(Box::new(PostgresSession { conn }))
    }

    async fn provision(&self, schema: &TableSchema) -> Result<()> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", schema.name))
            .execute(&self.pool)
            .await
            .map_err(|e| BenchError::query(format_query_error(e)))?;

        sqlx::query(&schema.postgres_create_table())
            .execute(&self.pool)
            .await
            .map_err(|e| BenchError::query(format_query_error(e)))?;

        debug!("Recreated table {}", schema.name);
        Ok(())
    }

    async fn import(&self, schema: &TableSchema, rows: &[Row]) -> Result<usize> {
        let insert = schema.postgres_insert();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BenchError::connection(format!("Failed to begin transaction: {e}")))?;

        for row in rows {
            let query = schema
                .columns
                .iter()
                .zip(row)
                .fold(sqlx::query(&insert), |query, (column, value)| {
                    bind_value(query, column.kind, value)
                });
            query
                .execute(&mut *tx)
                .await
                .map_err(|e| BenchError::query(format_query_error(e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| BenchError::query(format!("Failed to commit import: {e}")))?;

        Ok(rows.len())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// A session holding one pooled connection.
struct PostgresSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl DatabaseClient for PostgresSession {
    async fn execute_query(&mut self, sql: &str) -> Result<QueryResult> {
        let result = sqlx::query(sql)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| BenchError::query(format_query_error(e)))?;

        let columns: Vec<ColumnInfo> = result
            .first()
            .map(|first_row| {
                first_row
                    .columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name()))
                    .collect()
            })
            .unwrap_or_default();

        let rows: Vec<Row> = result.iter().map(convert_row).collect();

        Ok(QueryResult::with_data(columns, rows))
    }

    async fn execute_mutation(&mut self, sql: &str) -> Result<()> {
        let mut tx = self
            .conn
            .begin()
            .await
            .map_err(|e| BenchError::connection(format!("Failed to begin transaction: {e}")))?;

        let done = sqlx::query(sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| BenchError::query(format_query_error(e)))?;

        tx.commit()
            .await
            .map_err(|e| BenchError::query(format!("Failed to commit: {e}")))?;

        debug!("Mutation committed, {} rows affected", done.rows_affected());
        Ok(())
    }
}

/// Binds a normalized value as the SQL type the column was created with.
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    kind: TargetKind,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match kind {
        TargetKind::Integer => query.bind(match value {
            Value::Int(i) => i32::try_from(*i).ok(),
            _ => None,
        }),
        TargetKind::Float => query.bind(match value {
            Value::Float(f) => Some(*f as f32),
            Value::Int(i) => Some(*i as f32),
            _ => None,
        }),
        TargetKind::Boolean => query.bind(match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }),
        TargetKind::Text => query.bind(match value {
            Value::Null => None,
            other => Some(other.to_display_string()),
        }),
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        // For all other types, try to get as string
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
        || error_str.contains("does not exist")
    {
        return false;
    }

    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &PostgresConfig) -> BenchError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port();
    let user = config.user.as_deref().unwrap_or("postgres");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        BenchError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        BenchError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        BenchError::connection(format!(
            "Database '{}' does not exist.",
            config.database.as_deref().unwrap_or(crate::config::DEFAULT_DATABASE)
        ))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        BenchError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        BenchError::connection(error.to_string())
    }
}

/// Formats a query error with detail and hint when the server sent them.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = format!("ERROR: {}", db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
