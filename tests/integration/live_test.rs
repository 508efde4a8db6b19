//! End-to-end runs against live backends.
//!
//! Each test imports the postings sample into its own table and skips when
//! the backend it needs is not configured.

use super::fixture_path;
use job_bench::compare::{Cell, ComparisonDriver};
use job_bench::config::{parse_node_list, CassandraConfig, PostgresConfig};
use job_bench::dataset::load_postings;
use job_bench::db::{self, Backend, CassandraConnector, PostgresConnector, TableSchema, Value};
use job_bench::query::{QuerySpec, TimedQueryRunner};

async fn postgres_connector() -> Option<PostgresConnector> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = PostgresConfig::from_connection_string(&url).ok()?;
    PostgresConnector::connect(&config).await.ok()
}

/// Provisioning drops the keyspace, so every test uses its own.
async fn cassandra_connector(keyspace: &str) -> Option<CassandraConnector> {
    let nodes = std::env::var("CASSANDRA_NODES").ok()?;
    let config = CassandraConfig {
        nodes: parse_node_list(&nodes),
        keyspace: keyspace.to_string(),
        replication_factor: 1,
    };
    CassandraConnector::connect(&config).await.ok()
}

async fn load_sample(connector: &dyn db::BackendConnector, schema: &TableSchema) {
    let dataset = load_postings(&fixture_path(), Some(100), schema).unwrap();
    assert_eq!(dataset.len(), 100);
    let written = db::load(connector, schema, &dataset.rows).await.unwrap();
    assert_eq!(written, dataset.len());
}

#[tokio::test]
async fn test_postgres_import_and_lookup() {
    let Some(connector) = postgres_connector().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let schema = TableSchema::job_postings("bench_live_lookup");
    load_sample(&connector, &schema).await;

    let runner = TimedQueryRunner::new().with_connector(Box::new(connector));
    let outcome = runner
        .run_timed(
            Backend::Postgres,
            "SELECT job_id, max_salary, remote_allowed FROM bench_live_lookup \
             WHERE job_id = '2147609816'",
        )
        .await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(
        outcome.rows(),
        &[vec![
            Value::from("2147609816"),
            Value::Float(180000.0),
            Value::Bool(true),
        ]]
    );
    runner.close().await;
}

#[tokio::test]
async fn test_postgres_update_is_committed() {
    let Some(connector) = postgres_connector().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let schema = TableSchema::job_postings("bench_live_update");
    load_sample(&connector, &schema).await;

    let runner = TimedQueryRunner::new().with_connector(Box::new(connector));
    let update = runner
        .run_timed(
            Backend::Postgres,
            "UPDATE bench_live_update SET min_salary = 4000 WHERE title ILIKE '%Developer%'",
        )
        .await;
    assert!(update.is_success(), "{:?}", update.error);
    assert!(update.rows().is_empty());

    let check = runner
        .run_timed(
            Backend::Postgres,
            "SELECT min_salary FROM bench_live_update WHERE title ILIKE '%Developer%'",
        )
        .await;
    assert_eq!(check.rows().len(), 2);
    assert!(check.rows().iter().all(|r| r[0] == Value::Float(4000.0)));
    runner.close().await;
}

#[tokio::test]
async fn test_postgres_repeated_key_overwrites() {
    let Some(connector) = postgres_connector().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let schema = TableSchema::job_postings("bench_live_upsert");
    let dataset = load_postings(&fixture_path(), Some(3), &schema).unwrap();
    let mut rows = dataset.rows;
    let mut repeat = rows[2].clone();
    repeat[schema.column_index("title").unwrap()] = Value::from("Staff Software Engineer");
    rows.push(repeat);

    assert_eq!(db::load(&connector, &schema, &rows).await.unwrap(), 4);

    let runner = TimedQueryRunner::new().with_connector(Box::new(connector));
    let check = runner
        .run_timed(
            Backend::Postgres,
            "SELECT title FROM bench_live_upsert WHERE job_id = '2147609816'",
        )
        .await;
    assert_eq!(check.rows(), &[vec![Value::from("Staff Software Engineer")]]);
    runner.close().await;
}

#[tokio::test]
async fn test_postgres_bad_query_degrades() {
    let Some(connector) = postgres_connector().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let runner = TimedQueryRunner::new().with_connector(Box::new(connector));

    let failed = runner
        .run_timed(Backend::Postgres, "SELECT * FROM no_such_table_for_bench")
        .await;
    assert!(!failed.is_success());
    assert!(failed.rows().is_empty());
    assert!(failed.elapsed_seconds() >= 0.0);

    // The pool is still usable afterwards
    let ok = runner.run_timed(Backend::Postgres, "SELECT 1 AS n").await;
    assert_eq!(ok.rows(), &[vec![Value::Int(1)]]);
    runner.close().await;
}

#[tokio::test]
async fn test_cassandra_filtering_qualifier() {
    let Some(connector) = cassandra_connector("bench_live_filter").await else {
        eprintln!("Skipping test: CASSANDRA_NODES not set");
        return;
    };
    let schema = TableSchema::job_postings("bench_live_filter");
    load_sample(&connector, &schema).await;

    let runner = TimedQueryRunner::new().with_connector(Box::new(connector));

    let rejected = runner
        .run_timed(
            Backend::Cassandra,
            "SELECT * FROM bench_live_filter WHERE formatted_work_type = 'Full-time'",
        )
        .await;
    assert!(rejected.rows().is_empty());
    assert!(rejected
        .error
        .as_ref()
        .is_some_and(|e| e.to_string().contains("ALLOW FILTERING")));

    let accepted = runner
        .run_timed(
            Backend::Cassandra,
            "SELECT * FROM bench_live_filter WHERE formatted_work_type = 'Full-time' \
             ALLOW FILTERING",
        )
        .await;
    assert!(accepted.is_success(), "{:?}", accepted.error);
    assert_eq!(accepted.rows().len(), 4);
    runner.close().await;
}

#[tokio::test]
async fn test_both_backends_agree_on_lookup() {
    let (Some(postgres), Some(cassandra)) = (
        postgres_connector().await,
        cassandra_connector("bench_live_compare").await,
    )
    else {
        eprintln!("Skipping test: DATABASE_URL and CASSANDRA_NODES not both set");
        return;
    };
    let schema = TableSchema::job_postings("bench_live_compare");
    load_sample(&postgres, &schema).await;
    load_sample(&cassandra, &schema).await;

    let runner = TimedQueryRunner::new()
        .with_connector(Box::new(postgres))
        .with_connector(Box::new(cassandra));
    let spec = QuerySpec::portable(
        "Lookup by primary key",
        "SELECT * FROM bench_live_compare WHERE job_id = '2147609816'",
    );
    let entry = ComparisonDriver::new(&runner).run_spec(&spec).await;

    for backend in Backend::ALL {
        let outcome = entry.cell(backend).and_then(Cell::outcome).unwrap();
        assert!(outcome.is_success(), "{backend}: {:?}", outcome.error);
        assert_eq!(outcome.rows().len(), 1);
    }
    assert_eq!(entry.rows_agree(), Some(true));
    runner.close().await;
}
