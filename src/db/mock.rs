//! Mock connectors for testing.
//!
//! Provide in-memory backends that count session acquisition and release so
//! tests can check that every execution path gives its session back.

use super::{Backend, BackendConnector, DatabaseClient, QueryResult, Row, TableSchema};
use crate::error::{BenchError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Message Cassandra returns for an unqualified secondary-attribute filter.
const FILTERING_REJECTED: &str = "Cannot execute this query as it might involve data \
     filtering and thus may have unpredictable performance. If you want to execute \
     this query despite the performance unpredictability, use ALLOW FILTERING";

/// Shared acquisition/release counters.
#[derive(Debug, Clone, Default)]
pub struct SessionCounters {
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl SessionCounters {
    /// Number of sessions handed out.
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Number of sessions dropped.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Sessions currently held.
    pub fn outstanding(&self) -> usize {
        self.acquired() - self.released()
    }
}

/// Shared log of committed mutations.
#[derive(Debug, Clone, Default)]
pub struct MutationLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl MutationLog {
    /// Mutations committed so far, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().map(|m| m.clone()).unwrap_or_default()
    }

    fn push(&self, query: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| BenchError::internal("mock mutation lock poisoned"))?
            .push(query.to_string());
        Ok(())
    }
}

/// A connector whose sessions answer every `SELECT` with a canned result.
///
/// With `strict_filtering` enabled it mimics Cassandra and rejects `WHERE`
/// clauses on anything but the primary key unless the query carries
/// `ALLOW FILTERING`.
pub struct MockConnector {
    backend: Backend,
    result: QueryResult,
    latency: Duration,
    strict_filtering: bool,
    counters: SessionCounters,
    mutations: MutationLog,
    imported: Mutex<Vec<Row>>,
}

impl MockConnector {
    /// Creates a mock connector for `backend` returning an empty result.
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            result: QueryResult::new(),
            latency: Duration::ZERO,
            strict_filtering: false,
            counters: SessionCounters::default(),
            mutations: MutationLog::default(),
            imported: Mutex::new(Vec::new()),
        }
    }

    /// Sets the result returned by every `SELECT`.
    pub fn with_result(mut self, result: QueryResult) -> Self {
        self.result = result;
        self
    }

    /// Adds an artificial delay to every query.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Rejects unqualified secondary-attribute filters.
    pub fn with_strict_filtering(mut self) -> Self {
        self.strict_filtering = true;
        self
    }

    /// Returns the shared session counters.
    pub fn counters(&self) -> SessionCounters {
        self.counters.clone()
    }

    /// Returns the shared log of committed mutations.
    pub fn mutation_log(&self) -> MutationLog {
        self.mutations.clone()
    }

    /// Returns the number of rows imported since the last provision.
    pub fn imported_rows(&self) -> usize {
        self.imported.lock().map(|rows| rows.len()).unwrap_or(0)
    }
}

#[async_trait]
impl BackendConnector for MockConnector {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn acquire(&self) -> Result<Box<dyn DatabaseClient>> {
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            result: self.result.clone(),
            latency: self.latency,
            strict_filtering: self.strict_filtering,
            counters: self.counters.clone(),
            mutations: self.mutations.clone(),
        }))
    }

    async fn provision(&self, _schema: &TableSchema) -> Result<()> {
        if let Ok(mut rows) = self.imported.lock() {
            rows.clear();
        }
        Ok(())
    }

    async fn import(&self, _schema: &TableSchema, rows: &[Row]) -> Result<usize> {
        let mut imported = self
            .imported
            .lock()
            .map_err(|_| BenchError::internal("mock import lock poisoned"))?;
        imported.extend_from_slice(rows);
        Ok(rows.len())
    }
}

struct MockSession {
    result: QueryResult,
    latency: Duration,
    strict_filtering: bool,
    counters: SessionCounters,
    mutations: MutationLog,
}

impl MockSession {
    fn check_filtering(&self, query: &str) -> Result<()> {
        if !self.strict_filtering {
            return Ok(());
        }
        let upper = query.to_uppercase();
        let Some((_, predicate)) = upper.split_once(" WHERE ") else {
            return Ok(());
        };
        if predicate.trim_start().starts_with("JOB_ID") || upper.contains("ALLOW FILTERING") {
            Ok(())
        } else {
            Err(BenchError::query(FILTERING_REJECTED))
        }
    }
}

#[async_trait]
impl DatabaseClient for MockSession {
    async fn execute_query(&mut self, query: &str) -> Result<QueryResult> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if !query.trim_start().to_uppercase().starts_with("SELECT") {
            return Err(BenchError::query(format!(
                "syntax error at or near \"{}\"",
                query.split_whitespace().next().unwrap_or_default()
            )));
        }
        self.check_filtering(query)?;
        Ok(self.result.clone())
    }

    async fn execute_mutation(&mut self, query: &str) -> Result<()> {
        self.check_filtering(query)?;
        self.mutations.push(query)
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// A connector for a backend that cannot be reached.
pub struct FailingConnector {
    backend: Backend,
}

impl FailingConnector {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl BackendConnector for FailingConnector {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn acquire(&self) -> Result<Box<dyn DatabaseClient>> {
        Err(BenchError::connection(format!(
            "Cannot connect to {}. Check that the server is running.",
            self.backend
        )))
    }

    async fn provision(&self, _schema: &TableSchema) -> Result<()> {
        Err(BenchError::connection(format!(
            "Cannot provision {}: server unreachable",
            self.backend
        )))
    }

    async fn import(&self, _schema: &TableSchema, _rows: &[Row]) -> Result<usize> {
        Err(BenchError::connection(format!(
            "Cannot import into {}: server unreachable",
            self.backend
        )))
    }
}
