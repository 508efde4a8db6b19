//! Dataset import tests against the bundled postings sample.

use super::fixture_path;
use job_bench::dataset::load_postings;
use job_bench::db::{TableSchema, Value, DEFAULT_TABLE};
use pretty_assertions::assert_eq;

fn value<'a>(schema: &TableSchema, row: &'a [Value], column: &str) -> &'a Value {
    &row[schema.column_index(column).unwrap()]
}

#[test]
fn test_fixture_loads_every_column() {
    let schema = TableSchema::job_postings(DEFAULT_TABLE);
    let dataset = load_postings(&fixture_path(), None, &schema).unwrap();

    assert_eq!(dataset.len(), 106);
    assert_eq!(dataset.skipped_rows, 0);
    assert!(dataset.missing_columns.is_empty());
    assert!(dataset.rows.iter().all(|r| r.len() == schema.columns.len()));
}

#[test]
fn test_fixture_values_are_normalized() {
    let schema = TableSchema::job_postings(DEFAULT_TABLE);
    let dataset = load_postings(&fixture_path(), None, &schema).unwrap();

    let first = &dataset.rows[0];
    assert_eq!(value(&schema, first, "job_id"), &Value::from("85008768"));
    assert_eq!(value(&schema, first, "max_salary"), &Value::Float(52000.0));
    assert_eq!(value(&schema, first, "med_salary"), &Value::Null);
    assert_eq!(value(&schema, first, "views"), &Value::Int(5));
    assert_eq!(value(&schema, first, "remote_allowed"), &Value::Null);
    assert_eq!(value(&schema, first, "sponsored"), &Value::Bool(false));

    let engineer = &dataset.rows[2];
    assert_eq!(value(&schema, engineer, "job_id"), &Value::from("2147609816"));
    assert_eq!(value(&schema, engineer, "company_id"), &Value::from("1089558.0"));
    assert_eq!(value(&schema, engineer, "remote_allowed"), &Value::Bool(true));
    assert_eq!(value(&schema, engineer, "applies"), &Value::Int(12));

    let messy = &dataset.rows[5];
    assert_eq!(value(&schema, messy, "med_salary"), &Value::Null);
    assert_eq!(value(&schema, messy, "applies"), &Value::Null);
    assert_eq!(value(&schema, messy, "description"), &Value::Null);
}

#[test]
fn test_fixture_row_limit_cuts_file() {
    let schema = TableSchema::job_postings(DEFAULT_TABLE);
    let dataset = load_postings(&fixture_path(), Some(100), &schema).unwrap();

    assert_eq!(dataset.len(), 100);
    let last = dataset.rows.last().unwrap();
    assert_eq!(value(&schema, last, "job_id"), &Value::from("3900000094"));
    assert!(!dataset
        .rows
        .iter()
        .any(|r| value(&schema, r, "job_id") == &Value::from("3900000100")));
}

#[test]
fn test_fixture_multiline_description() {
    let schema = TableSchema::job_postings(DEFAULT_TABLE);
    let dataset = load_postings(&fixture_path(), Some(1), &schema).unwrap();

    assert_eq!(dataset.len(), 1);
    let Value::String(description) = value(&schema, &dataset.rows[0], "description") else {
        panic!("description should be text");
    };
    assert!(description.contains('\n'));
}
