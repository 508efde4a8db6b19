//! Postings dataset import.
//!
//! Reads the CSV with a row limit and normalizes every cell according to the
//! kind its column declares in the [`TableSchema`].

use crate::db::{Row, TableSchema, Value};
use crate::error::{BenchError, Result};
use crate::normalize::{normalize, RawValue};
use std::path::Path;
use tracing::{debug, info, warn};

/// Normalized rows aligned with the columns of a schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Rows in file order; each has one value per schema column.
    pub rows: Vec<Row>,

    /// Schema columns the file had no header for.
    pub missing_columns: Vec<String>,

    /// Rows dropped because their primary key was empty.
    pub skipped_rows: usize,
}

impl Dataset {
    /// Number of rows read.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows were read.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Loads at most `limit` rows of the postings CSV at `path`.
///
/// Fails only when the file cannot be opened or parsed as CSV. Cells that do
/// not convert to their column kind become [`Value::Null`]; rows whose
/// primary key is empty are skipped and counted.
pub fn load_postings(path: &Path, limit: Option<usize>, schema: &TableSchema) -> Result<Dataset> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| BenchError::import(format!("Cannot read {}: {e}", path.display())))?;

    let dataset = read_postings(reader, limit, schema)
        .map_err(|e| BenchError::import(format!("{}: {e}", path.display())))?;

    info!("Read {} rows from {}", dataset.len(), path.display());
    Ok(dataset)
}

/// Reads postings from any CSV source. Split out so tests can feed in-memory
/// data.
pub fn read_postings<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    limit: Option<usize>,
    schema: &TableSchema,
) -> std::result::Result<Dataset, csv::Error> {
    let headers = reader.headers()?.clone();

    // Position of each schema column in the file, if present.
    let positions: Vec<Option<usize>> = schema
        .columns
        .iter()
        .map(|column| headers.iter().position(|h| h.trim() == column.name))
        .collect();

    let missing_columns: Vec<String> = schema
        .columns
        .iter()
        .zip(&positions)
        .filter(|(_, pos)| pos.is_none())
        .map(|(column, _)| column.name.clone())
        .collect();

    if !missing_columns.is_empty() {
        debug!("CSV lacks columns: {}", missing_columns.join(", "));
    }

    let key_index = schema.column_index(&schema.primary_key);

    let mut rows = Vec::new();
    let mut skipped_rows = 0;
    for record in reader.records() {
        if limit.is_some_and(|max| rows.len() >= max) {
            break;
        }
        let record = record?;
        let row: Row = schema
            .columns
            .iter()
            .zip(&positions)
            .map(|(column, pos)| match pos.and_then(|i| record.get(i)) {
                Some(cell) => normalize(RawValue::from_csv_field(cell, column.kind), column.kind),
                None => Value::Null,
            })
            .collect();
        if key_index.is_some_and(|i| row[i].is_null()) {
            skipped_rows += 1;
            continue;
        }
        rows.push(row);
    }

    if skipped_rows > 0 {
        warn!("Skipped {skipped_rows} rows without a {}", schema.primary_key);
    }

    Ok(Dataset {
        rows,
        missing_columns,
        skipped_rows,
    })
}
