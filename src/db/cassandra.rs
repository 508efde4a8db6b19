//! Cassandra backend.
//!
//! Uses the scylla driver. A scylla `Session` is its own connection pool, so
//! each acquisition builds a new session bound to the keyspace and the
//! connections close when the session drops.

use crate::config::CassandraConfig;
use crate::db::{
    Backend, BackendConnector, ColumnInfo, DatabaseClient, QueryResult, Row, TableSchema, Value,
};
use crate::error::{BenchError, Result};
use crate::normalize::TargetKind;
use async_trait::async_trait;
use scylla::frame::response::result::CqlValue;
use scylla::transport::errors::{NewSessionError, QueryError};
use scylla::{Session, SessionBuilder};
use tracing::{debug, info};

/// Cassandra connector.
#[derive(Debug, Clone)]
pub struct CassandraConnector {
    nodes: Vec<String>,
    keyspace: String,
    replication_factor: u32,
}

impl CassandraConnector {
    /// Checks that the cluster is reachable and returns a connector for it.
    pub async fn connect(config: &CassandraConfig) -> Result<Self> {
        let connector = Self {
            nodes: config.known_nodes(),
            keyspace: config.keyspace.clone(),
            replication_factor: config.replication_factor,
        };

        // Probe without a keyspace; it may not exist before provisioning.
        connector.open_session(false).await?;
        info!("Connected to Cassandra: {}", config.display_string());

        Ok(connector)
    }

    async fn open_session(&self, with_keyspace: bool) -> Result<Session> {
        let mut builder = SessionBuilder::new().known_nodes(&self.nodes);
        if with_keyspace {
            builder = builder.use_keyspace(&self.keyspace, false);
        }
        builder
            .build()
            .await
            .map_err(|e| map_session_error(e, &self.nodes))
    }
}

#[async_trait]
impl BackendConnector for CassandraConnector {
    fn backend(&self) -> Backend {
        Backend::Cassandra
    }

    async fn acquire(&self) -> Result<Box<dyn DatabaseClient>> {
        let session = self.open_session(true).await?;
        Ok(Box::new(CassandraSession { session }))
    }

    async fn provision(&self, schema: &TableSchema) -> Result<()> {
        let session = self.open_session(false).await?;

        let statements = [
            format!("DROP KEYSPACE IF EXISTS {}", self.keyspace),
            format!(
                "CREATE KEYSPACE {} WITH REPLICATION = \
                 {{ 'class' : 'SimpleStrategy', 'replication_factor' : {} }}",
                self.keyspace, self.replication_factor
            ),
        ];
        for cql in statements {
            session
                .query(cql, ())
                .await
                .map_err(|e| BenchError::query(format_query_error(e)))?;
        }

        session
            .use_keyspace(&self.keyspace, false)
            .await
            .map_err(|e| BenchError::query(format_query_error(e)))?;

        session
            .query(schema.cql_create_table(), ())
            .await
            .map_err(|e| BenchError::query(format_query_error(e)))?;

        debug!("Recreated keyspace {} and table {}", self.keyspace, schema.name);
        Ok(())
    }

    async fn import(&self, schema: &TableSchema, rows: &[Row]) -> Result<usize> {
        let session = self.open_session(true).await?;
        let insert = session
            .prepare(schema.cql_insert())
            .await
            .map_err(|e| BenchError::query(format_query_error(e)))?;

        for row in rows {
            let values: Vec<Option<CqlValue>> = schema
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| to_cql_value(column.kind, value))
                .collect();
            session
                .execute(&insert, values)
                .await
                .map_err(|e| BenchError::query(format_query_error(e)))?;
        }

        Ok(rows.len())
    }
}

/// A session bound to the benchmark keyspace.
struct CassandraSession {
    session: Session,
}

#[async_trait]
impl DatabaseClient for CassandraSession {
    async fn execute_query(&mut self, cql: &str) -> Result<QueryResult> {
        let result = self
            .session
            .query(cql, ())
            .await
            .map_err(|e| BenchError::query(format_query_error(e)))?;

        let columns: Vec<ColumnInfo> = result
            .col_specs
            .iter()
            .map(|spec| ColumnInfo::new(&spec.name))
            .collect();

        let rows: Vec<Row> = result
            .rows
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.columns.into_iter().map(convert_value).collect())
            .collect();

        Ok(QueryResult::with_data(columns, rows))
    }

    async fn execute_mutation(&mut self, cql: &str) -> Result<()> {
        // Writes are applied on acknowledgement; there is nothing to commit.
        self.session
            .query(cql, ())
            .await
            .map_err(|e| BenchError::query(format_query_error(e)))?;
        Ok(())
    }
}

/// Converts a normalized value into the CQL type the column was created with.
fn to_cql_value(kind: TargetKind, value: &Value) -> Option<CqlValue> {
    match (kind, value) {
        (_, Value::Null) => None,
        (TargetKind::Integer, Value::Int(i)) => i32::try_from(*i).ok().map(CqlValue::Int),
        (TargetKind::Float, Value::Float(f)) => Some(CqlValue::Float(*f as f32)),
        (TargetKind::Float, Value::Int(i)) => Some(CqlValue::Float(*i as f32)),
        (TargetKind::Boolean, Value::Bool(b)) => Some(CqlValue::Boolean(*b)),
        (TargetKind::Text, other) => Some(CqlValue::Text(other.to_display_string())),
        _ => None,
    }
}

/// Converts a single CQL value to our Value type.
fn convert_value(value: Option<CqlValue>) -> Value {
    match value {
        None | Some(CqlValue::Empty) => Value::Null,
        Some(CqlValue::Boolean(b)) => Value::Bool(b),
        Some(CqlValue::TinyInt(v)) => Value::Int(v as i64),
        Some(CqlValue::SmallInt(v)) => Value::Int(v as i64),
        Some(CqlValue::Int(v)) => Value::Int(v as i64),
        Some(CqlValue::BigInt(v)) => Value::Int(v),
        Some(CqlValue::Float(v)) => Value::Float(v as f64),
        Some(CqlValue::Double(v)) => Value::Float(v),
        Some(CqlValue::Ascii(s)) | Some(CqlValue::Text(s)) => Value::String(s),
        Some(other) => Value::String(format!("{other:?}")),
    }
}

/// Maps session setup errors to user-friendly messages.
fn map_session_error(error: NewSessionError, nodes: &[String]) -> BenchError {
    let nodes = nodes.join(", ");
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        BenchError::connection(format!(
            "Cannot connect to {nodes}. Check that the cluster is running."
        ))
    } else if error_str.contains("keyspace") {
        BenchError::connection(format!("Keyspace is not available on {nodes}: {error}"))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        BenchError::connection(format!(
            "Connection to {nodes} timed out. The cluster may be overloaded or unreachable."
        ))
    } else {
        BenchError::connection(error.to_string())
    }
}

fn format_query_error(error: QueryError) -> String {
    format!("CQL error: {error}")
}
