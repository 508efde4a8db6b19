//! Comparison driver.
//!
//! Runs each query spec against every backend it names, one after another,
//! and collects the outcomes into a [`ComparisonReport`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::db::{Backend, QueryResult, Value};
use crate::query::{QuerySpec, TimedOutcome, TimedQueryRunner};

/// Result of one backend for one spec.
#[derive(Debug)]
pub enum Cell {
    /// The query ran (successfully or not).
    Ran(TimedOutcome),
    /// The backend was not registered for this run.
    Skipped(Backend),
}

impl Cell {
    /// Backend this cell belongs to.
    pub fn backend(&self) -> Backend {
        match self {
            Self::Ran(outcome) => outcome.backend,
            Self::Skipped(backend) => *backend,
        }
    }

    /// The outcome, if the query ran.
    pub fn outcome(&self) -> Option<&TimedOutcome> {
        match self {
            Self::Ran(outcome) => Some(outcome),
            Self::Skipped(_) => None,
        }
    }
}

/// Outcomes of one spec across backends.
#[derive(Debug)]
pub struct ComparisonEntry {
    pub description: String,
    pub cells: Vec<Cell>,
}

impl ComparisonEntry {
    /// Returns the cell for `backend`.
    pub fn cell(&self, backend: Backend) -> Option<&Cell> {
        self.cells.iter().find(|c| c.backend() == backend)
    }

    /// Whether successful backends returned the same rows.
    ///
    /// Rows are compared on the columns every result shares, ignoring row
    /// order. Returns `None` when fewer than two backends succeeded.
    pub fn rows_agree(&self) -> Option<bool> {
        let results: Vec<&QueryResult> = self
            .cells
            .iter()
            .filter_map(Cell::outcome)
            .filter(|o| o.is_success())
            .map(|o| &o.result)
            .collect();
        if results.len() < 2 {
            return None;
        }

        let shared = shared_columns(&results);
        let mut canonical = results.iter().map(|r| canonical_rows(r, &shared));
        let first = canonical.next()?;
        Some(canonical.all(|rows| rows == first))
    }
}

fn shared_columns(results: &[&QueryResult]) -> Vec<String> {
    let mut sets = results.iter().map(|r| {
        r.column_names()
            .into_iter()
            .map(str::to_lowercase)
            .collect::<BTreeSet<_>>()
    });
    let first = sets.next().unwrap_or_default();
    sets.fold(first, |acc, set| acc.intersection(&set).cloned().collect())
        .into_iter()
        .collect()
}

/// Projects rows onto `columns` and sorts them, so two results compare
/// independently of row order and column position.
fn canonical_rows(result: &QueryResult, columns: &[String]) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = result
        .records()
        .into_iter()
        .map(|record| {
            let record: BTreeMap<String, &Value> = record
                .into_iter()
                .map(|(name, value)| (name.to_lowercase(), value))
                .collect();
            columns
                .iter()
                .map(|name| canonical_value(record.get(name).copied()))
                .collect()
        })
        .collect();
    rows.sort();
    rows
}

fn canonical_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "NULL".to_string(),
        Some(Value::Bool(b)) => format!("b:{b}"),
        Some(Value::Int(i)) => format!("n:{i}"),
        Some(Value::Float(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
            format!("n:{}", *f as i64)
        }
        // Backends disagree on float width, so compare at single precision
        Some(Value::Float(f)) => format!("n:{:?}", *f as f32),
        Some(Value::String(s)) => format!("s:{s}"),
    }
}

/// Outcomes of a whole run, in spec order.
#[derive(Debug, Default)]
pub struct ComparisonReport {
    pub entries: Vec<ComparisonEntry>,
}

impl ComparisonReport {
    /// Number of cells that ran and failed.
    pub fn failure_count(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|e| &e.cells)
            .filter_map(Cell::outcome)
            .filter(|o| !o.is_success())
            .count()
    }
}

/// Drives query specs through a [`TimedQueryRunner`].
pub struct ComparisonDriver<'a> {
    runner: &'a TimedQueryRunner,
}

impl<'a> ComparisonDriver<'a> {
    pub fn new(runner: &'a TimedQueryRunner) -> Self {
        Self { runner }
    }

    /// Runs every spec in order. Specs run sequentially and share no state.
    pub async fn run(&self, specs: &[QuerySpec]) -> ComparisonReport {
        let mut report = ComparisonReport::default();
        for spec in specs {
            report.entries.push(self.run_spec(spec).await);
        }
        report
    }

    /// Runs one spec against each backend it names, in backend order.
    pub async fn run_spec(&self, spec: &QuerySpec) -> ComparisonEntry {
        info!("Running: {}", spec.description);

        let mut cells = Vec::with_capacity(spec.queries.len());
        for (backend, query) in &spec.queries {
            if self.runner.is_registered(*backend) {
                cells.push(Cell::Ran(self.runner.run_timed(*backend, query).await));
            } else {
                cells.push(Cell::Skipped(*backend));
            }
        }

        ComparisonEntry {
            description: spec.description.clone(),
            cells,
        }
    }
}
