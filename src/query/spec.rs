//! Logical query specs.
//!
//! Query dialects are not portable between backends, so a spec carries one
//! query string per backend for the same logical operation.

use crate::db::Backend;
use std::collections::BTreeMap;

/// Primary key used by the built-in lookup query.
pub const SAMPLE_JOB_ID: &str = "2147609816";

/// One logical query with a dialect-specific text per backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Human-readable description shown in the report.
    pub description: String,

    /// Query text per backend.
    pub queries: BTreeMap<Backend, String>,
}

impl QuerySpec {
    /// Creates a spec with no backend queries.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            queries: BTreeMap::new(),
        }
    }

    /// Adds or replaces the query for `backend`.
    pub fn with_query(mut self, backend: Backend, query: impl Into<String>) -> Self {
        self.queries.insert(backend, query.into());
        self
    }

    /// Uses the same query text for every backend.
    pub fn portable(description: impl Into<String>, query: impl Into<String>) -> Self {
        let query = query.into();
        Backend::ALL
            .iter()
            .fold(Self::new(description), |spec, backend| {
                spec.with_query(*backend, query.clone())
            })
    }

    /// Returns the query for `backend`, if the spec has one.
    pub fn query_for(&self, backend: Backend) -> Option<&str> {
        self.queries.get(&backend).map(String::as_str)
    }

    /// Backends this spec has a query for, in report order.
    pub fn backends(&self) -> impl Iterator<Item = Backend> + '_ {
        self.queries.keys().copied()
    }

    /// The built-in comparison queries against `table`.
    ///
    /// Cassandra needs `ALLOW FILTERING` to filter on attributes outside the
    /// primary key; the relational dialect does not.
    pub fn defaults(table: &str) -> Vec<Self> {
        vec![
            Self::portable(
                "Max, min and average salary by work type",
                format!(
                    "SELECT formatted_work_type, MAX(max_salary) AS max_salary, \
                     MIN(min_salary) AS min_salary, AVG(med_salary) AS avg_salary \
                     FROM {table} GROUP BY formatted_work_type"
                ),
            ),
            Self::new("Titles containing 'Engineer'")
                .with_query(
                    Backend::Postgres,
                    format!("SELECT * FROM {table} WHERE title ILIKE '%Engineer%'"),
                )
                .with_query(
                    Backend::Cassandra,
                    format!("SELECT * FROM {table} WHERE title LIKE '%Engineer%' ALLOW FILTERING"),
                ),
            Self::portable(
                "Lookup by primary key",
                format!("SELECT * FROM {table} WHERE job_id = '{SAMPLE_JOB_ID}'"),
            ),
            Self::new("Full-time postings")
                .with_query(
                    Backend::Postgres,
                    format!("SELECT * FROM {table} WHERE formatted_work_type = 'Full-time'"),
                )
                .with_query(
                    Backend::Cassandra,
                    format!(
                        "SELECT * FROM {table} WHERE formatted_work_type = 'Full-time' \
                         ALLOW FILTERING"
                    ),
                ),
            Self::new("Set minimum salary of 'Developer' postings to 4000")
                .with_query(
                    Backend::Postgres,
                    format!("UPDATE {table} SET min_salary = 4000 WHERE title ILIKE '%Developer%'"),
                )
                .with_query(
                    Backend::Cassandra,
                    format!("UPDATE {table} SET min_salary = 4000 WHERE title LIKE '%Developer%'"),
                ),
        ]
    }
}
