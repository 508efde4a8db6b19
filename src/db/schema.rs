//! Table schema description for job-bench.
//!
//! A single description of the postings table drives CSV normalization and
//! the DDL for both backends.

use crate::normalize::TargetKind;

/// Default table name.
pub const DEFAULT_TABLE: &str = "job_postings";

/// Columns of the postings dataset, in CSV order.
const JOB_POSTING_COLUMNS: &[(&str, TargetKind)] = &[
    ("job_id", TargetKind::Text),
    ("company_id", TargetKind::Text),
    ("title", TargetKind::Text),
    ("description", TargetKind::Text),
    ("max_salary", TargetKind::Float),
    ("med_salary", TargetKind::Float),
    ("min_salary", TargetKind::Float),
    ("pay_period", TargetKind::Text),
    ("formatted_work_type", TargetKind::Text),
    ("location", TargetKind::Text),
    ("applies", TargetKind::Integer),
    ("original_listed_time", TargetKind::Text),
    ("remote_allowed", TargetKind::Boolean),
    ("views", TargetKind::Integer),
    ("job_posting_url", TargetKind::Text),
    ("application_url", TargetKind::Text),
    ("application_type", TargetKind::Text),
    ("expiry", TargetKind::Text),
    ("closed_time", TargetKind::Text),
    ("formatted_experience_level", TargetKind::Text),
    ("skills_desc", TargetKind::Text),
    ("listed_time", TargetKind::Text),
    ("posting_domain", TargetKind::Text),
    ("sponsored", TargetKind::Boolean),
    ("work_type", TargetKind::Text),
    ("currency", TargetKind::Text),
    ("compensation_type", TargetKind::Text),
];

/// A column in a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Kind values in this column are normalized to.
    pub kind: TargetKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A flat table with a single-column primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub name: String,

    /// Columns in insertion order.
    pub columns: Vec<Column>,

    /// Primary key column name.
    pub primary_key: String,
}

impl TableSchema {
    /// Returns the job postings schema under the given table name.
    pub fn job_postings(table: impl Into<String>) -> Self {
        Self {
            name: table.into(),
            columns: JOB_POSTING_COLUMNS
                .iter()
                .map(|(name, kind)| Column::new(*name, *kind))
                .collect(),
            primary_key: "job_id".to_string(),
        }
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// `CREATE TABLE` statement in the PostgreSQL dialect.
    pub fn postgres_create_table(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("    {} {}", c.name, postgres_type(c.kind)))
            .collect::<Vec<_>>()
            .join(",\n");
        format!(
            "CREATE TABLE {} (\n{},\n    PRIMARY KEY ({})\n)",
            self.name, columns, self.primary_key
        )
    }

    /// Upsert with `$n` placeholders for every column. A repeated key
    /// overwrites the earlier row, as a CQL `INSERT` does.
    pub fn postgres_insert(&self) -> String {
        let placeholders = (1..=self.columns.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let updates = self
            .columns
            .iter()
            .filter(|c| c.name != self.primary_key)
            .map(|c| format!("{0} = EXCLUDED.{0}", c.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
            self.name,
            self.column_names().join(", "),
            placeholders,
            self.primary_key,
            updates
        )
    }

    /// `CREATE TABLE` statement in CQL.
    pub fn cql_create_table(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let key = if c.name == self.primary_key {
                    " PRIMARY KEY"
                } else {
                    ""
                };
                format!("    {} {}{}", c.name, cql_type(c.kind), key)
            })
            .collect::<Vec<_>>()
            .join(",\n");
        format!("CREATE TABLE IF NOT EXISTS {} (\n{}\n)", self.name, columns)
    }

    /// `INSERT` statement with `?` bind markers for every column.
    pub fn cql_insert(&self) -> String {
        let markers = vec!["?"; self.columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            self.column_names().join(", "),
            markers
        )
    }
}

fn postgres_type(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Integer => "INTEGER",
        TargetKind::Float => "REAL",
        TargetKind::Boolean => "BOOLEAN",
        TargetKind::Text => "TEXT",
    }
}

fn cql_type(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Integer => "int",
        TargetKind::Float => "float",
        TargetKind::Boolean => "boolean",
        TargetKind::Text => "text",
    }
}
