//! Full import-and-compare runs against mock backends.

use super::fixture_path;
use job_bench::compare::{Cell, ComparisonDriver};
use job_bench::dataset::load_postings;
use job_bench::db::{
    self, Backend, ColumnInfo, FailingConnector, MockConnector, QueryResult, TableSchema, Value,
    DEFAULT_TABLE,
};
use job_bench::query::{QuerySpec, TimedQueryRunner};
use job_bench::report;

fn pk_row() -> QueryResult {
    QueryResult::with_data(
        vec![
            ColumnInfo::new("job_id"),
            ColumnInfo::new("max_salary"),
        ],
        vec![vec![Value::from("2147609816"), Value::Float(180000.0)]],
    )
}

#[tokio::test]
async fn test_import_then_compare() {
    let schema = TableSchema::job_postings(DEFAULT_TABLE);
    let dataset = load_postings(&fixture_path(), Some(100), &schema).unwrap();

    let postgres = MockConnector::new(Backend::Postgres).with_result(pk_row());
    let cassandra = MockConnector::new(Backend::Cassandra)
        .with_result(pk_row())
        .with_strict_filtering();
    let pg_counters = postgres.counters();
    let cass_counters = cassandra.counters();

    assert_eq!(dataset.len(), 100);
    assert_eq!(db::load(&postgres, &schema, &dataset.rows).await.unwrap(), 100);
    assert_eq!(db::load(&cassandra, &schema, &dataset.rows).await.unwrap(), 100);

    let runner = TimedQueryRunner::new()
        .with_connector(Box::new(postgres))
        .with_connector(Box::new(cassandra));
    let specs = QuerySpec::defaults(DEFAULT_TABLE);
    let report = ComparisonDriver::new(&runner).run(&specs).await;

    assert_eq!(report.entries.len(), 5);
    // Cassandra cannot update by a non-key predicate; that cell alone fails
    assert_eq!(report.failure_count(), 1);

    let lookup = &report.entries[2];
    assert_eq!(lookup.rows_agree(), Some(true));

    let update = &report.entries[4];
    for cell in &update.cells {
        assert!(cell.outcome().unwrap().rows().is_empty());
    }
    let pg_update = update.cell(Backend::Postgres).and_then(Cell::outcome).unwrap();
    assert!(pg_update.is_success());
    let cass_update = update.cell(Backend::Cassandra).and_then(Cell::outcome).unwrap();
    assert!(!cass_update.is_success());

    assert_eq!(pg_counters.acquired(), 5);
    assert_eq!(pg_counters.outstanding(), 0);
    assert_eq!(cass_counters.acquired(), 5);
    assert_eq!(cass_counters.outstanding(), 0);

    let text = report::render(&report, false);
    assert!(text.contains("Lookup by primary key"));
    assert!(text.contains("results match"));
}

#[tokio::test]
async fn test_secondary_filter_requires_allow_filtering() {
    let cassandra = MockConnector::new(Backend::Cassandra)
        .with_result(pk_row())
        .with_strict_filtering();
    let runner = TimedQueryRunner::new().with_connector(Box::new(cassandra));

    let specs = vec![
        QuerySpec::new("Full-time, unqualified").with_query(
            Backend::Cassandra,
            "SELECT * FROM job_postings WHERE formatted_work_type = 'Full-time'",
        ),
        QuerySpec::new("Full-time, qualified").with_query(
            Backend::Cassandra,
            "SELECT * FROM job_postings WHERE formatted_work_type = 'Full-time' ALLOW FILTERING",
        ),
    ];
    let report = ComparisonDriver::new(&runner).run(&specs).await;

    let rejected = report.entries[0].cell(Backend::Cassandra).unwrap();
    let rejected = rejected.outcome().unwrap();
    assert!(rejected.rows().is_empty());
    assert!(rejected
        .error
        .as_ref()
        .unwrap()
        .to_string()
        .contains("ALLOW FILTERING"));

    let accepted = report.entries[1].cell(Backend::Cassandra).unwrap();
    assert!(accepted.outcome().unwrap().is_success());
}

#[tokio::test]
async fn test_down_backend_degrades_its_cells_only() {
    let runner = TimedQueryRunner::new()
        .with_connector(Box::new(
            MockConnector::new(Backend::Postgres).with_result(pk_row()),
        ))
        .with_connector(Box::new(FailingConnector::new(Backend::Cassandra)));

    let specs = QuerySpec::defaults(DEFAULT_TABLE);
    let report = ComparisonDriver::new(&runner).run(&specs).await;

    for entry in &report.entries {
        let pg = entry.cell(Backend::Postgres).and_then(Cell::outcome).unwrap();
        assert!(pg.is_success());
        let cass = entry.cell(Backend::Cassandra).and_then(Cell::outcome).unwrap();
        assert!(!cass.is_success());
        assert_eq!(entry.rows_agree(), None);
    }

    let text = report::render(&report, false);
    assert!(text.contains("5 backend queries failed"));
}
