//! Database abstraction layer for job-bench.
//!
//! Each backend is reached through a [`BackendConnector`], which hands out a
//! fresh [`DatabaseClient`] session per call. A session is released when it
//! is dropped, so the caller owns it for exactly one execution.

mod cassandra;
mod mock;
mod postgres;
mod schema;
mod types;

pub use cassandra::CassandraConnector;
pub use mock::{FailingConnector, MockConnector, MutationLog, SessionCounters};
pub use postgres::PostgresConnector;
pub use schema::{Column, TableSchema, DEFAULT_TABLE};
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::Config;
use crate::error::{BenchError, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Supported database backends, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Backend {
    /// Relational store.
    Postgres,
    /// Wide-column store.
    Cassandra,
}

impl Backend {
    /// Every backend, in report order.
    pub const ALL: [Backend; 2] = [Backend::Postgres, Backend::Cassandra];

    /// Returns the backend as a lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Cassandra => "cassandra",
        }
    }

    /// Returns the human-readable backend name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::Cassandra => "Cassandra",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "psql" | "sql" => Some(Self::Postgres),
            "cassandra" | "scylla" | "scylladb" | "cql" => Some(Self::Cassandra),
            _ => None,
        }
    }

    /// Returns the default port for this backend.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Cassandra => 9042,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Backend {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            BenchError::config(format!(
                "Unknown backend '{s}'. Expected 'postgres' or 'cassandra'"
            ))
        })
    }
}

/// A live session against one store.
///
/// Sessions are single-use handles: the runner acquires one, executes one
/// query and drops it.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Executes a query and returns its rows.
    async fn execute_query(&mut self, query: &str) -> Result<QueryResult>;

    /// Executes a statement that produces no rows, committing it if the
    /// backend is transactional.
    async fn execute_mutation(&mut self, query: &str) -> Result<()>;
}

/// Factory for scoped sessions against one backend.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    /// Which backend this connector reaches.
    fn backend(&self) -> Backend;

    /// Acquires a fresh session.
    async fn acquire(&self) -> Result<Box<dyn DatabaseClient>>;

    /// Drops and recreates the table (and namespace, where the backend has
    /// one) described by `schema`.
    async fn provision(&self, schema: &TableSchema) -> Result<()>;

    /// Inserts normalized rows aligned with `schema.columns`. Returns the
    /// number of rows written.
    async fn import(&self, schema: &TableSchema, rows: &[Row]) -> Result<usize>;

    /// Releases any long-lived resources held by the connector.
    async fn close(&self) {}
}

/// Creates a connector for the given backend.
///
/// This is the central factory function for backend connections.
pub async fn connect(backend: Backend, config: &Config) -> Result<Box<dyn BackendConnector>> {
    match backend {
        Backend::Postgres => {
            let connector = PostgresConnector::connect(&config.postgres).await?;
            Ok(Box::new(connector))
        }
        Backend::Cassandra => {
            let connector = CassandraConnector::connect(&config.cassandra).await?;
            Ok(Box::new(connector))
        }
    }
}

/// Provisions the schema on `connector` and imports `rows` into it.
pub async fn load(
    connector: &dyn BackendConnector,
    schema: &TableSchema,
    rows: &[Row],
) -> Result<usize> {
    connector.provision(schema).await?;
    let written = connector.import(schema, rows).await?;
    info!("Imported {} rows into {}.{}", written, connector.backend(), schema.name);
    Ok(written)
}

/// Returns true if `query` is a mutation that produces no result set.
pub fn is_mutation(query: &str) -> bool {
    query
        .trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("UPDATE"))
}
