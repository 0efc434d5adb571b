//! In-memory test doubles for the repository traits, used to build an
//! [`AppState`](crate::network::AppState) in handler unit tests without a
//! real Postgres connection.
#![cfg(test)]

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use newsgrid_core::{
    ClusterMember, ClusterSummary, Embedding, FailureReason, FeedEntry, Job, JobStatus, Run,
    RunStatus,
};

use crate::config::{AppConfig, TierArg};
use crate::fetch::{AsyncFetcher, FetcherConfig};
use crate::ingest::{Enrichers, IngestService};
use crate::network::handlers::AppState;
use crate::network::{NetworkConfig, ShutdownController};
use crate::orchestrator::Orchestrator;
use crate::summary::ClusterSummarizer;
use crate::traits::{
    ClusterRepository, FeedEntryRepository, JobRepository, RunRepository, VectorRepository,
};

struct UnimplementedRepo;

#[async_trait]
impl RunRepository for UnimplementedRepo {
    async fn create_run(&self, _: &str, _: DateTime<Utc>, _: &str) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
    async fn update_status(&self, _: &str, _: RunStatus) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
    async fn mark_completed(&self, _: &str, _: i64, _: i64) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
    async fn get_run_by_id(&self, _: &str) -> anyhow::Result<Option<Run>> {
        unimplemented!("not exercised by this test")
    }
    async fn get_runs_by_date(&self, _: DateTime<Utc>) -> anyhow::Result<Vec<Run>> {
        unimplemented!("not exercised by this test")
    }
    async fn has_active_run(&self, _: DateTime<Utc>, _: i64) -> anyhow::Result<bool> {
        unimplemented!("not exercised by this test")
    }
    async fn mark_stale_runs_failed(&self, _: i64) -> anyhow::Result<u64> {
        unimplemented!("not exercised by this test")
    }
}

#[async_trait]
impl FeedEntryRepository for UnimplementedRepo {
    async fn get_unprocessed(&self, _: DateTime<Utc>, _: i64) -> anyhow::Result<Vec<FeedEntry>> {
        unimplemented!("not exercised by this test")
    }
    async fn get_entry_content_batch(&self, _: &[Uuid]) -> anyhow::Result<Vec<FeedEntry>> {
        unimplemented!("not exercised by this test")
    }
    async fn get_entries_for_flashpoint(&self, _: Uuid) -> anyhow::Result<Vec<FeedEntry>> {
        unimplemented!("not exercised by this test")
    }
    async fn update_enrichment(&self, _: Uuid, _: &str, _: Option<&str>) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
    async fn get_flashpoint_ids_for_run(&self, _: &str) -> anyhow::Result<Vec<Uuid>> {
        unimplemented!("not exercised by this test")
    }
}

#[async_trait]
impl JobRepository for UnimplementedRepo {
    async fn create_job(&self, _: Uuid, _: &str) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
    async fn claim_job(&self, _: Uuid, _: &str) -> anyhow::Result<bool> {
        unimplemented!("not exercised by this test")
    }
    async fn claim_jobs_bulk(&self, _: &[Uuid], _: &str) -> anyhow::Result<u64> {
        unimplemented!("not exercised by this test")
    }
    async fn bulk_update_status(&self, _: &[Uuid], _: &str, _: JobStatus) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
    async fn update_status(&self, _: Uuid, _: &str, _: JobStatus) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
    async fn mark_failed(&self, _: Uuid, _: &str, _: FailureReason, _: &str) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
    async fn get_run_stats(&self, _: &str) -> anyhow::Result<Vec<(JobStatus, i64)>> {
        unimplemented!("not exercised by this test")
    }
    async fn get_jobs_for_run(&self, _: &str) -> anyhow::Result<Vec<Job>> {
        unimplemented!("not exercised by this test")
    }
}

#[async_trait]
impl VectorRepository for UnimplementedRepo {
    async fn upsert_embedding(&self, _: &Embedding) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
    async fn bulk_upsert_embeddings(&self, _: &[Embedding]) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
    async fn get_embeddings_for_flashpoint(&self, _: Uuid, _: &str) -> anyhow::Result<Vec<Embedding>> {
        unimplemented!("not exercised by this test")
    }
}

#[async_trait]
impl ClusterRepository for UnimplementedRepo {
    async fn insert_cluster_members(&self, _: &[ClusterMember]) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
    async fn write_news_cluster(&self, _: &ClusterSummary) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
    async fn delete_clusters_for_flashpoint(&self, _: Uuid, _: &str) -> anyhow::Result<()> {
        unimplemented!("not exercised by this test")
    }
}

/// Builds an [`AppState`] backed by a lazily-connecting pool (never
/// actually dialed in these tests) and repository doubles that panic if
/// called, for handlers whose logic doesn't touch persistence.
pub fn test_app_state() -> AppState {
    let repo = Arc::new(UnimplementedRepo);
    AppState {
        shutdown: Arc::new(ShutdownController::new()),
        config: Arc::new(NetworkConfig::default()),
        app_config: Arc::new(AppConfig {
            database_url: "postgres://localhost/test".to_string(),
            api_key: "test-key".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            default_tier: TierArg(newsgrid_core::Tier::Standard),
            fetch_global_concurrency: 50,
            fetch_per_domain_concurrency: 4,
            fetch_polite_delay_ms: 250,
            fetch_max_retry_after_secs: 60,
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown_secs: 300,
            llm_rate_limit_rpm: 60,
            ingest_chunk_size: 100,
            stale_run_max_age_hours: 2,
            log_json: false,
        }),
        db: PgPool::connect_lazy("postgres://localhost/test").expect("lazy pool never dials"),
        runs: repo.clone(),
        feed_entries: repo.clone(),
        jobs: repo.clone(),
        vectors: repo.clone(),
        clusters: repo.clone(),
        orchestrator: Arc::new(Orchestrator::new(
            repo.clone(),
            repo.clone(),
            repo.clone(),
            repo.clone(),
            repo,
            IngestService::new(
                Arc::new(UnimplementedRepo),
                Arc::new(UnimplementedRepo),
                Arc::new(UnimplementedRepo),
                Arc::new(
                    AsyncFetcher::new(FetcherConfig::default(), 5, std::time::Duration::from_secs(300))
                        .expect("fetcher builds without network access"),
                ),
                Enrichers::default(),
            ),
            ClusterSummarizer::new(None, 60),
            100,
        )),
        start_time: Instant::now(),
    }
}
