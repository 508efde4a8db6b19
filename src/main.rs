//! job-bench - PostgreSQL vs Cassandra query timing on job postings.

use crossterm::tty::IsTty;
use job_bench::cli::Cli;
use job_bench::compare::ComparisonDriver;
use job_bench::config::Config;
use job_bench::dataset::load_postings;
use job_bench::db::{self, TableSchema};
use job_bench::error::Result;
use job_bench::logging;
use job_bench::query::TimedQueryRunner;
use job_bench::report;
use tracing::{error, info, warn};

fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli)) {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_to(&mut config)?;
    config.apply_env_defaults();

    let specs = config.query_specs()?;
    let backends = cli.selected_backends()?;
    let schema = TableSchema::job_postings(&config.table);

    // An unreadable dataset aborts before any backend work
    let dataset = load_postings(&config.dataset.path, config.dataset.limit(), &schema)?;

    let mut runner = TimedQueryRunner::new();
    for backend in backends {
        let connector = match db::connect(backend, &config).await {
            Ok(connector) => connector,
            Err(e) => {
                warn!("Skipping {}: {}", backend, e);
                continue;
            }
        };

        if !cli.skip_import {
            if let Err(e) = db::load(connector.as_ref(), &schema, &dataset.rows).await {
                warn!("Skipping {}: {}", backend, e);
                connector.close().await;
                continue;
            }
        }
        runner.register(connector);
    }

    if runner.backends().is_empty() {
        warn!("No backend is reachable; every query will be reported as skipped");
    }

    let report = ComparisonDriver::new(&runner).run(&specs).await;
    let color = !cli.no_color && std::io::stdout().is_tty();
    print!("{}", report::render(&report, color));

    runner.close().await;
    Ok(())
}
