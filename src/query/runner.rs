//! Timed query execution.
//!
//! `TimedQueryRunner` executes one query against one backend on a freshly
//! acquired session and always returns the elapsed time, whether the backend
//! answered or failed. Failures are logged and degrade to an empty result so
//! one bad cell never stops a comparison run.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::db::{is_mutation, Backend, BackendConnector, QueryResult, Row};
use crate::error::BenchError;

/// Outcome of one timed execution.
#[derive(Debug)]
pub struct TimedOutcome {
    /// Backend the query ran against.
    pub backend: Backend,
    /// Rows returned; empty for mutations and failures.
    pub result: QueryResult,
    /// Wall-clock time from dispatch until the backend returned or failed.
    pub execution_time: Duration,
    /// Failure, if the backend could not be reached or rejected the query.
    pub error: Option<BenchError>,
}

impl TimedOutcome {
    fn success(backend: Backend, result: QueryResult, execution_time: Duration) -> Self {
        Self {
            backend,
            result,
            execution_time,
            error: None,
        }
    }

    fn failure(backend: Backend, execution_time: Duration, error: BenchError) -> Self {
        Self {
            backend,
            result: QueryResult::new(),
            execution_time,
            error: Some(error),
        }
    }

    /// Returns true if the backend answered without error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The rows returned.
    pub fn rows(&self) -> &[Row] {
        &self.result.rows
    }

    /// Elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.execution_time.as_secs_f64()
    }
}

/// Runs queries against registered backends, one scoped session per call.
#[derive(Default)]
pub struct TimedQueryRunner {
    connectors: BTreeMap<Backend, Box<dyn BackendConnector>>,
}

impl TimedQueryRunner {
    /// Creates a runner with no backends registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connector, replacing any previous one for its backend.
    pub fn register(&mut self, connector: Box<dyn BackendConnector>) {
        self.connectors.insert(connector.backend(), connector);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_connector(mut self, connector: Box<dyn BackendConnector>) -> Self {
        self.register(connector);
        self
    }

    /// Returns true if `backend` has a connector.
    pub fn is_registered(&self, backend: Backend) -> bool {
        self.connectors.contains_key(&backend)
    }

    /// Registered backends in report order.
    pub fn backends(&self) -> Vec<Backend> {
        self.connectors.keys().copied().collect()
    }

    /// Executes `query` against `backend` and measures it.
    ///
    /// Never fails: an unregistered backend, an unreachable backend or a
    /// rejected query all yield an empty result carrying the error and the
    /// time spent so far. Queries starting with `UPDATE` run as committed
    /// mutations and return no rows. The session is released before this
    /// returns, on every path.
    pub async fn run_timed(&self, backend: Backend, query: &str) -> TimedOutcome {
        let Some(connector) = self.connectors.get(&backend) else {
            let error = BenchError::config(format!("{backend} is not registered"));
            warn!("Skipping query on {}: {}", backend, error);
            return TimedOutcome::failure(backend, Duration::ZERO, error);
        };

        let acquire_start = Instant::now();
        let mut session = match connector.acquire().await {
            Ok(session) => session,
            Err(error) => {
                let elapsed = acquire_start.elapsed();
                warn!("Could not open a {} session: {}", backend, error);
                return TimedOutcome::failure(backend, elapsed, error);
            }
        };

        let mutation = is_mutation(query);

        let start = Instant::now();
        let result = if mutation {
            session
                .execute_mutation(query)
                .await
                .map(|()| QueryResult::new())
        } else {
            session.execute_query(query).await
        };
        let execution_time = start.elapsed();

        drop(session);

        match result {
            Ok(result) => {
                debug!(
                    "{} returned {} rows in {:?}",
                    backend, result.row_count, execution_time
                );
                TimedOutcome::success(backend, result, execution_time)
            }
            Err(error) => {
                warn!("Query failed on {}: {}", backend, error);
                TimedOutcome::failure(backend, execution_time, error)
            }
        }
    }

    /// Closes every registered connector.
    pub async fn close(&self) {
        for connector in self.connectors.values() {
            connector.close().await;
        }
    }
}
