//! Process entry point: parses configuration, runs migrations, wires the
//! repository/fetcher/orchestrator stack, and serves the trigger API until
//! signalled to shut down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use newsgrid_server::config::AppConfig;
use newsgrid_server::db::{
    PgClusterRepository, PgFeedEntryRepository, PgJobRepository, PgRunRepository,
    PgVectorRepository,
};
use newsgrid_server::fetch::{AsyncFetcher, FetcherConfig};
use newsgrid_server::ingest::{Enrichers, IngestService};
use newsgrid_server::network::{AppState, NetworkConfig, NetworkModule};
use newsgrid_server::orchestrator::{sweep_stale_runs, Orchestrator};
use newsgrid_server::summary::ClusterSummarizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::parse();
    init_tracing(config.log_json);

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let runs: Arc<dyn newsgrid_server::traits::RunRepository> = Arc::new(PgRunRepository::new(pool.clone()));
    let feed_entries: Arc<dyn newsgrid_server::traits::FeedEntryRepository> =
        Arc::new(PgFeedEntryRepository::new(pool.clone()));
    let jobs: Arc<dyn newsgrid_server::traits::JobRepository> = Arc::new(PgJobRepository::new(pool.clone()));
    let vectors: Arc<dyn newsgrid_server::traits::VectorRepository> =
        Arc::new(PgVectorRepository::new(pool.clone()));
    let clusters: Arc<dyn newsgrid_server::traits::ClusterRepository> =
        Arc::new(PgClusterRepository::new(pool.clone()));

    let fetcher = Arc::new(AsyncFetcher::new(
        FetcherConfig {
            global_concurrency: config.fetch_global_concurrency,
            per_domain_concurrency: config.fetch_per_domain_concurrency,
            polite_delay: Duration::from_millis(config.fetch_polite_delay_ms),
            max_retry_after: Duration::from_secs(config.fetch_max_retry_after_secs),
        },
        config.circuit_breaker_threshold,
        Duration::from_secs(config.circuit_breaker_cooldown_secs),
    )?);

    // Model-backed enrichment adapters (language detection, translation,
    // NER, geo-resolution, embedding, LLM summarization) are deliberately
    // out of scope: a real deployment would construct concrete
    // implementations here and pass them in.
    let ingest = IngestService::new(
        feed_entries.clone(),
        jobs.clone(),
        vectors.clone(),
        fetcher,
        Enrichers::default(),
    );
    let summarizer = ClusterSummarizer::new(None, config.llm_rate_limit_rpm);

    let orchestrator = Arc::new(Orchestrator::new(
        runs.clone(),
        feed_entries.clone(),
        jobs.clone(),
        vectors.clone(),
        clusters.clone(),
        ingest,
        summarizer,
        config.ingest_chunk_size,
    ));

    let app_config = Arc::new(config.clone());
    let network_config = NetworkConfig {
        host: config.host.clone(),
        port: config.port,
        ..NetworkConfig::default()
    };
    let mut network = NetworkModule::new(network_config.clone());
    let shutdown = network.shutdown_controller();
    network.start().await?;

    let app_state = AppState {
        shutdown: shutdown.clone(),
        config: Arc::new(network_config),
        app_config,
        db: pool,
        runs: runs.clone(),
        feed_entries,
        jobs,
        vectors,
        clusters,
        orchestrator,
        start_time: Instant::now(),
    };

    let stale_max_age = config.stale_run_max_age_hours;
    tokio::spawn(sweep_stale_runs(runs, stale_max_age, Duration::from_secs(600)));

    info!("newsgrid-server starting");
    network
        .serve(app_state, async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    shutdown.wait_for_drain(Duration::from_secs(30)).await;
    Ok(())
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
