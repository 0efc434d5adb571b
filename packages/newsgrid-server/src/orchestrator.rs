//! Drives one processing run end to end: claim unprocessed entries, ingest
//! them in chunks, then (tier permitting) cluster and summarize each
//! flashpoint touched by the run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use newsgrid_core::{cluster_entries, ClusterMember, DeduplicationEngine, FeedEntry, JobStatus, RunStatus, Tier};

use crate::ingest::IngestService;
use crate::summary::ClusterSummarizer;
use crate::traits::{
    ClusterRepository, FeedEntryRepository, JobRepository, RunRepository, VectorRepository,
};

/// Number of nearest neighbors considered per entry when clustering a
/// flashpoint's embeddings.
const CLUSTER_K: usize = 10;
/// Minimum cosine similarity for two entries to be unioned into one cluster.
const CLUSTER_COSINE_THRESHOLD: f32 = 0.65;

pub struct Orchestrator {
    runs: Arc<dyn RunRepository>,
    feed_entries: Arc<dyn FeedEntryRepository>,
    jobs: Arc<dyn JobRepository>,
    vectors: Arc<dyn VectorRepository>,
    clusters: Arc<dyn ClusterRepository>,
    ingest: IngestService,
    summarizer: ClusterSummarizer,
    chunk_size: usize,
    unprocessed_limit: i64,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        runs: Arc<dyn RunRepository>,
        feed_entries: Arc<dyn FeedEntryRepository>,
        jobs: Arc<dyn JobRepository>,
        vectors: Arc<dyn VectorRepository>,
        clusters: Arc<dyn ClusterRepository>,
        ingest: IngestService,
        summarizer: ClusterSummarizer,
        chunk_size: usize,
    ) -> Self {
        Self {
            runs,
            feed_entries,
            jobs,
            vectors,
            clusters,
            ingest,
            summarizer,
            chunk_size,
            unprocessed_limit: 10_000,
        }
    }

    /// Runs the full pipeline for `run_id`/`target_date`/`tier`. Intended to
    /// be spawned off the request task that created the run record; errors
    /// are logged here rather than propagated, since there's no caller left
    /// to receive them.
    pub async fn run_pipeline(&self, run_id: String, target_date: DateTime<Utc>, tier: Tier) {
        if let Err(err) = self.run_pipeline_inner(&run_id, target_date, tier).await {
            error!(%run_id, error = %err, "pipeline run failed");
            let _ = self.runs.update_status(&run_id, RunStatus::Failed).await;
        }
    }

    async fn run_pipeline_inner(&self, run_id: &str, target_date: DateTime<Utc>, tier: Tier) -> anyhow::Result<()> {
        self.runs.update_status(run_id, RunStatus::Running).await?;

        let unprocessed = self.feed_entries.get_unprocessed(target_date, self.unprocessed_limit).await?;
        if unprocessed.is_empty() {
            info!(%run_id, "no unprocessed entries for target date");
            self.runs.mark_completed(run_id, 0, 0).await?;
            return Ok(());
        }

        let ids: Vec<Uuid> = unprocessed.iter().map(|e| e.id).collect();
        let claimed = self.jobs.claim_jobs_bulk(&ids, run_id).await?;
        info!(%run_id, total = unprocessed.len(), claimed, "claimed entries for run");

        let mut dedup = DeduplicationEngine::new();
        let mut total_failed = 0u64;
        for chunk in unprocessed.chunks(self.chunk_size) {
            let stats = self.ingest.process_chunk(run_id, chunk, &mut dedup).await;
            total_failed += stats.failed;
            info!(%run_id, processed = stats.processed, failed = stats.failed, duplicates = stats.duplicates, "chunk done");
        }

        if tier.has_clustering() {
            self.cluster_and_summarize(run_id, tier).await?;
        }

        self.runs
            .mark_completed(run_id, unprocessed.len() as i64, total_failed as i64)
            .await?;
        Ok(())
    }

    async fn cluster_and_summarize(&self, run_id: &str, tier: Tier) -> anyhow::Result<()> {
        let flashpoint_ids = self.feed_entries.get_flashpoint_ids_for_run(run_id).await?;

        for flashpoint_id in flashpoint_ids {
            let embeddings = self.vectors.get_embeddings_for_flashpoint(flashpoint_id, run_id).await?;
            if embeddings.is_empty() {
                continue;
            }

            let entry_ids: Vec<Uuid> = embeddings.iter().map(|e| e.feed_entry_id).collect();
            let vectors: Vec<Vec<f32>> = embeddings.iter().map(|e| e.vector.clone()).collect();
            let clusters = cluster_entries(&entry_ids, &vectors, CLUSTER_K, CLUSTER_COSINE_THRESHOLD);

            self.clusters.delete_clusters_for_flashpoint(flashpoint_id, run_id).await?;

            let entries = self.feed_entries.get_entries_for_flashpoint(flashpoint_id).await?;
            let entries_by_id: HashMap<Uuid, &FeedEntry> = entries.iter().map(|e| (e.id, e)).collect();

            for cluster in &clusters {
                let members: Vec<ClusterMember> = cluster
                    .members
                    .iter()
                    .map(|m| ClusterMember {
                        feed_entry_id: m.entry_id,
                        run_id: run_id.to_string(),
                        flashpoint_id,
                        cluster_id: cluster.cluster_id,
                        similarity_to_centroid: m.similarity_to_centroid,
                    })
                    .collect();
                self.clusters.insert_cluster_members(&members).await?;

                let mut ranked_members = cluster.members.clone();
                ranked_members.sort_by(|a, b| {
                    b.similarity_to_centroid
                        .partial_cmp(&a.similarity_to_centroid)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                let member_entries: Vec<FeedEntry> = ranked_members
                    .iter()
                    .filter_map(|m| entries_by_id.get(&m.entry_id).map(|e| (*e).clone()))
                    .collect();

                let summary = self
                    .summarizer
                    .summarize(tier, flashpoint_id, cluster.cluster_id, &member_entries)
                    .await;
                self.clusters.write_news_cluster(&summary).await?;

                let member_ids: Vec<Uuid> = cluster.members.iter().map(|m| m.entry_id).collect();
                self.jobs.bulk_update_status(&member_ids, run_id, JobStatus::Clustered).await?;
                self.jobs.bulk_update_status(&member_ids, run_id, JobStatus::Summarized).await?;
            }
        }

        Ok(())
    }
}

/// Periodically sweeps runs stuck `running`/`pending` past `max_age_hours`,
/// marking them `failed` so a crashed worker doesn't leave a run looking
/// active forever.
pub async fn sweep_stale_runs(runs: Arc<dyn RunRepository>, max_age_hours: i64, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match runs.mark_stale_runs_failed(max_age_hours).await {
            Ok(0) => {}
            Ok(n) => info!(swept = n, "marked stale runs as failed"),
            Err(err) => error!(error = %err, "stale run sweep failed"),
        }
    }
}
