use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use newsgrid_core::{
    ClusterMember, ClusterSummary, Embedding, FailureReason, FeedEntry, Job, JobStatus, Run,
    RunStatus,
};

/// Persistence for processing runs.
#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn create_run(&self, run_id: &str, target_date: DateTime<Utc>, tier: &str) -> anyhow::Result<()>;

    async fn update_status(&self, run_id: &str, status: RunStatus) -> anyhow::Result<()>;

    async fn mark_completed(&self, run_id: &str, entries_total: i64, entries_failed: i64) -> anyhow::Result<()>;

    async fn get_run_by_id(&self, run_id: &str) -> anyhow::Result<Option<Run>>;

    async fn get_runs_by_date(&self, target_date: DateTime<Utc>) -> anyhow::Result<Vec<Run>>;

    /// Whether a non-terminal run already exists for this date within
    /// `max_age_hours`, used to prevent overlapping runs.
    async fn has_active_run(&self, target_date: DateTime<Utc>, max_age_hours: i64) -> anyhow::Result<bool>;

    /// Marks any run that has been `running` for longer than
    /// `max_age_hours` as `failed`, returning how many were swept.
    async fn mark_stale_runs_failed(&self, max_age_hours: i64) -> anyhow::Result<u64>;
}

/// Persistence for raw feed entries.
#[async_trait]
pub trait FeedEntryRepository: Send + Sync {
    async fn get_unprocessed(&self, target_date: DateTime<Utc>, limit: i64) -> anyhow::Result<Vec<FeedEntry>>;

    async fn get_entry_content_batch(&self, ids: &[Uuid]) -> anyhow::Result<Vec<FeedEntry>>;

    async fn get_entries_for_flashpoint(&self, flashpoint_id: Uuid) -> anyhow::Result<Vec<FeedEntry>>;

    async fn update_enrichment(&self, id: Uuid, content: &str, language: Option<&str>) -> anyhow::Result<()>;

    async fn get_flashpoint_ids_for_run(&self, run_id: &str) -> anyhow::Result<Vec<Uuid>>;
}

/// Persistence for per-entry, per-run jobs.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create_job(&self, feed_entry_id: Uuid, run_id: &str) -> anyhow::Result<()>;

    /// Atomically claims a single job for processing, returning `true` if
    /// this call won the claim (i.e. no one else holds it).
    async fn claim_job(&self, feed_entry_id: Uuid, run_id: &str) -> anyhow::Result<bool>;

    /// Bulk variant of [`claim_job`](Self::claim_job): inserts job rows for
    /// every id not already claimed for this run, relying on a unique
    /// constraint on `(feed_entry_id, run_id)` to silently skip collisions.
    /// Returns the number of ids actually claimed.
    async fn claim_jobs_bulk(&self, feed_entry_ids: &[Uuid], run_id: &str) -> anyhow::Result<u64>;

    async fn bulk_update_status(&self, feed_entry_ids: &[Uuid], run_id: &str, status: JobStatus) -> anyhow::Result<()>;

    async fn update_status(&self, feed_entry_id: Uuid, run_id: &str, status: JobStatus) -> anyhow::Result<()>;

    async fn mark_failed(&self, feed_entry_id: Uuid, run_id: &str, reason: FailureReason, message: &str) -> anyhow::Result<()>;

    async fn get_run_stats(&self, run_id: &str) -> anyhow::Result<Vec<(JobStatus, i64)>>;

    async fn get_jobs_for_run(&self, run_id: &str) -> anyhow::Result<Vec<Job>>;
}

/// Persistence for entry embeddings.
#[async_trait]
pub trait VectorRepository: Send + Sync {
    async fn upsert_embedding(&self, embedding: &Embedding) -> anyhow::Result<()>;

    async fn bulk_upsert_embeddings(&self, embeddings: &[Embedding]) -> anyhow::Result<()>;

    async fn get_embeddings_for_flashpoint(&self, flashpoint_id: Uuid, run_id: &str) -> anyhow::Result<Vec<Embedding>>;
}

/// Persistence for computed clusters and their summaries.
#[async_trait]
pub trait ClusterRepository: Send + Sync {
    async fn insert_cluster_members(&self, members: &[ClusterMember]) -> anyhow::Result<()>;

    async fn write_news_cluster(&self, summary: &ClusterSummary) -> anyhow::Result<()>;

    async fn delete_clusters_for_flashpoint(&self, flashpoint_id: Uuid, run_id: &str) -> anyhow::Result<()>;
}
