//! Config file and CLI layering tests.

use clap::Parser;
use job_bench::cli::Cli;
use job_bench::config::{Config, PostgresConfig};
use job_bench::db::Backend;
use std::io::Write;

const CONFIG: &str = r#"
table = "postings"

[dataset]
path = "data/postings.csv"
row_limit = 20

[postgres]
host = "pg.internal"
database = "jobs"

[cassandra]
nodes = ["cass1", "cass2:9043"]
keyspace = "jobs"

[[queries]]
description = "Count postings"
postgres = "SELECT COUNT(*) FROM postings"
cassandra = "SELECT COUNT(*) FROM postings"

[[queries]]
description = "Remote postings"
cassandra = "SELECT * FROM postings WHERE remote_allowed = true ALLOW FILTERING"
"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_file_with_cli_overrides() {
    let file = write_config(CONFIG);
    let path = file.path().to_str().unwrap();
    let cli = Cli::try_parse_from([
        "job-bench",
        "--config",
        path,
        "--rows",
        "5",
        "--postgres",
        "postgres://bench@db.local/jobs",
    ])
    .unwrap();

    let mut config = Config::load_from_file(&cli.config_path()).unwrap();
    cli.apply_to(&mut config).unwrap();

    assert_eq!(config.table, "postings");
    assert_eq!(config.dataset.limit(), Some(5));
    assert_eq!(config.postgres.host.as_deref(), Some("db.local"));
    assert_eq!(config.postgres.user.as_deref(), Some("bench"));
    assert_eq!(
        config.cassandra.known_nodes(),
        vec!["cass1:9042".to_string(), "cass2:9043".to_string()]
    );
}

#[test]
fn test_environment_url_fills_only_unset_fields() {
    let file = write_config(CONFIG);
    let path = file.path().to_str().unwrap();
    let cli = Cli::try_parse_from(["job-bench", "--config", path]).unwrap();
    assert_eq!(cli.postgres, None);

    let mut config = Config::load_from_file(&cli.config_path()).unwrap();
    cli.apply_to(&mut config).unwrap();
    let env = PostgresConfig::from_connection_string("postgres://envuser@envhost:5432/envdb")
        .unwrap();
    config.postgres.fill_unset(&env);

    assert_eq!(config.postgres.host.as_deref(), Some("pg.internal"));
    assert_eq!(config.postgres.database.as_deref(), Some("jobs"));
    assert_eq!(config.postgres.user.as_deref(), Some("envuser"));
    assert_eq!(config.postgres.port(), 5432);
}

#[test]
fn test_configured_queries_replace_defaults() {
    let file = write_config(CONFIG);
    let config = Config::load_from_file(file.path()).unwrap();
    let specs = config.query_specs().unwrap();

    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].backends().collect::<Vec<_>>(), Backend::ALL.to_vec());
    assert_eq!(specs[1].query_for(Backend::Postgres), None);
    assert!(specs[1]
        .query_for(Backend::Cassandra)
        .unwrap()
        .ends_with("ALLOW FILTERING"));
}

#[test]
fn test_unknown_backend_in_query_is_rejected() {
    let file = write_config(
        r#"
[[queries]]
description = "Bad"
mongo = "db.postings.find()"
"#,
    );
    let config = Config::load_from_file(file.path()).unwrap();
    let err = config.query_specs().unwrap_err();
    assert!(err.to_string().contains("mongo"));
}

#[test]
fn test_malformed_config_is_config_error() {
    let file = write_config("[dataset\npath = ");
    let err = Config::load_from_file(file.path()).unwrap_err();
    assert_eq!(err.category(), "Configuration Error");
}
