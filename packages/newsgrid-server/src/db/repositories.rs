use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use newsgrid_core::{
    tables::{make_table_name, FEED_ENTRIES},
    ClusterMember, ClusterSummary, Embedding, FailureReason, FeedEntry, GeoEntity, Job, JobStatus,
    NerEntity, Run, RunStatus,
};

use crate::traits::{
    ClusterRepository, FeedEntryRepository, JobRepository, RunRepository, VectorRepository,
};

fn parse_run_status(s: &str) -> RunStatus {
    match s {
        "pending" => RunStatus::Pending,
        "running" => RunStatus::Running,
        "completed" => RunStatus::Completed,
        "partial" => RunStatus::Partial,
        _ => RunStatus::Failed,
    }
}

fn parse_job_status(s: &str) -> JobStatus {
    match s {
        "queued" => JobStatus::Queued,
        "fetching" => JobStatus::Fetching,
        "extracted" => JobStatus::Extracted,
        "deduped" => JobStatus::Deduped,
        "embedded" => JobStatus::Embedded,
        "clustered" => JobStatus::Clustered,
        "summarized" => JobStatus::Summarized,
        "scored" => JobStatus::Scored,
        "skipped_duplicate" => JobStatus::SkippedDuplicate,
        _ => JobStatus::Failed,
    }
}

fn parse_failure_reason(s: &str) -> FailureReason {
    match s {
        "fetch_timeout" => FailureReason::FetchTimeout,
        "fetch_blocked" => FailureReason::FetchBlocked,
        "paywall" => FailureReason::Paywall,
        "consent_wall" => FailureReason::ConsentWall,
        "js_required" => FailureReason::JsRequired,
        "no_text" => FailureReason::NoText,
        "extraction_error" => FailureReason::ExtractionError,
        "embedding_error" => FailureReason::EmbeddingError,
        "fetch_error" => FailureReason::FetchError,
        _ => FailureReason::Unknown,
    }
}

fn row_to_run(row: PgRow) -> anyhow::Result<Run> {
    let status: String = row.try_get("status")?;
    let tier: String = row.try_get("tier")?;
    Ok(Run {
        run_id: row.try_get("run_id")?,
        target_date: row.try_get("target_date")?,
        status: parse_run_status(&status),
        tier: match tier.as_str() {
            "standard" => newsgrid_core::Tier::Standard,
            "premium" => newsgrid_core::Tier::Premium,
            _ => newsgrid_core::Tier::Basic,
        },
        entries_total: row.try_get("entries_total")?,
        entries_failed: row.try_get("entries_failed")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}

fn row_to_feed_entry(row: PgRow) -> anyhow::Result<FeedEntry> {
    let entities: serde_json::Value = row.try_get("entities")?;
    let geo_entities: serde_json::Value = row.try_get("geo_entities")?;
    Ok(FeedEntry {
        id: row.try_get("id")?,
        flashpoint_id: row.try_get("flashpoint_id")?,
        url: row.try_get("url")?,
        domain: row.try_get("domain")?,
        title: row.try_get("title")?,
        language: row.try_get("language")?,
        sourcecountry: row.try_get("sourcecountry")?,
        description: row.try_get("description")?,
        published_at: row.try_get("published_at")?,
        content: row.try_get("content")?,
        title_en: row.try_get("title_en")?,
        summary: row.try_get("summary")?,
        entities: serde_json::from_value::<Vec<NerEntity>>(entities).unwrap_or_default(),
        geo_entities: serde_json::from_value::<Vec<GeoEntity>>(geo_entities).unwrap_or_default(),
        images: row.try_get("images")?,
    })
}

fn row_to_job(row: PgRow) -> anyhow::Result<Job> {
    let status: String = row.try_get("status")?;
    let failure_reason: Option<String> = row.try_get("failure_reason")?;
    Ok(Job {
        feed_entry_id: row.try_get("feed_entry_id")?,
        run_id: row.try_get("run_id")?,
        status: parse_job_status(&status),
        failure_reason: failure_reason.as_deref().map(parse_failure_reason),
        attempt_count: row.try_get("attempt_count")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Resolves the date-partitioned `feed_entries_*` table a row with a given
/// id or flashpoint id lives in by probing the working set of recent
/// partitions. Entries are enriched within a day or two of ingestion, so
/// this covers the operational window without needing the caller to thread
/// a target date through every lookup.
async fn find_table_containing(pool: &PgPool, column: &str, value: Uuid) -> anyhow::Result<Option<String>> {
    let today = Utc::now().date_naive();
    for days_back in 0..3i64 {
        let date = today - TimeDelta::days(days_back);
        let table = make_table_name(FEED_ENTRIES, date);
        let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .bind(format!("public.{table}"))
            .fetch_one(pool)
            .await?;
        if !exists {
            continue;
        }
        let sql = format!("SELECT 1 FROM {table} WHERE {column} = $1 LIMIT 1");
        if sqlx::query(&sql).bind(value).fetch_optional(pool).await?.is_some() {
            return Ok(Some(table));
        }
    }
    Ok(None)
}

/// `processing_runs` repository.
pub struct PgRunRepository {
    pool: PgPool,
}

impl PgRunRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunRepository for PgRunRepository {
    async fn create_run(&self, run_id: &str, target_date: DateTime<Utc>, tier: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO processing_runs (run_id, target_date, status, tier, entries_total, entries_failed, started_at)
             VALUES ($1, $2, 'pending', $3, 0, 0, now())",
        )
        .bind(run_id)
        .bind(target_date)
        .bind(tier)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_status(&self, run_id: &str, status: RunStatus) -> anyhow::Result<()> {
        sqlx::query("UPDATE processing_runs SET status = $1 WHERE run_id = $2")
            .bind(status.as_str())
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_completed(&self, run_id: &str, entries_total: i64, entries_failed: i64) -> anyhow::Result<()> {
        let status = if entries_failed == 0 {
            RunStatus::Completed
        } else if entries_failed >= entries_total && entries_total > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        };
        sqlx::query(
            "UPDATE processing_runs
             SET status = $1, entries_total = $2, entries_failed = $3, finished_at = now()
             WHERE run_id = $4",
        )
        .bind(status.as_str())
        .bind(entries_total)
        .bind(entries_failed)
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_run_by_id(&self, run_id: &str) -> anyhow::Result<Option<Run>> {
        let row = sqlx::query("SELECT * FROM processing_runs WHERE run_id = $1")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_run).transpose()
    }

    async fn get_runs_by_date(&self, target_date: DateTime<Utc>) -> anyhow::Result<Vec<Run>> {
        let rows = sqlx::query("SELECT * FROM processing_runs WHERE target_date::date = $1::date ORDER BY started_at DESC")
            .bind(target_date)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_run).collect()
    }

    async fn has_active_run(&self, target_date: DateTime<Utc>, max_age_hours: i64) -> anyhow::Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM processing_runs
             WHERE target_date::date = $1::date
               AND status IN ('pending', 'running')
               AND started_at > now() - make_interval(hours => $2::int)",
        )
        .bind(target_date)
        .bind(max_age_hours as i32)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn mark_stale_runs_failed(&self, max_age_hours: i64) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "UPDATE processing_runs
             SET status = 'failed', finished_at = now()
             WHERE status IN ('pending', 'running')
               AND started_at < now() - make_interval(hours => $1::int)",
        )
        .bind(max_age_hours as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Date-partitioned `feed_entries_*` repository.
pub struct PgFeedEntryRepository {
    pool: PgPool,
}

impl PgFeedEntryRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedEntryRepository for PgFeedEntryRepository {
    async fn get_unprocessed(&self, target_date: DateTime<Utc>, limit: i64) -> anyhow::Result<Vec<FeedEntry>> {
        let table = make_table_name(FEED_ENTRIES, target_date.date_naive());
        // Excludes entries that already reached a terminal success state in
        // some prior run; a newly-created run_id never has jobs of its own
        // yet, so nothing else needs excluding here.
        let sql = format!(
            "SELECT fe.* FROM {table} fe
             LEFT JOIN feed_entry_jobs j
               ON j.feed_entry_id = fe.id AND j.status IN ('summarized', 'scored')
             WHERE fe.flashpoint_id IS NOT NULL AND j.feed_entry_id IS NULL
             ORDER BY fe.published_at ASC
             LIMIT $1"
        );
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_feed_entry).collect()
    }

    async fn get_entry_content_batch(&self, ids: &[Uuid]) -> anyhow::Result<Vec<FeedEntry>> {
        let mut out = Vec::with_capacity(ids.len());
        for &id in ids {
            let Some(table) = find_table_containing(&self.pool, "id", id).await? else {
                continue;
            };
            let sql = format!("SELECT * FROM {table} WHERE id = $1");
            if let Some(row) = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await? {
                out.push(row_to_feed_entry(row)?);
            }
        }
        Ok(out)
    }

    async fn get_entries_for_flashpoint(&self, flashpoint_id: Uuid) -> anyhow::Result<Vec<FeedEntry>> {
        let Some(table) = find_table_containing(&self.pool, "flashpoint_id", flashpoint_id).await? else {
            return Ok(Vec::new());
        };
        let sql = format!("SELECT * FROM {table} WHERE flashpoint_id = $1");
        let rows = sqlx::query(&sql).bind(flashpoint_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_feed_entry).collect()
    }

    async fn update_enrichment(&self, id: Uuid, content: &str, language: Option<&str>) -> anyhow::Result<()> {
        let Some(table) = find_table_containing(&self.pool, "id", id).await? else {
            anyhow::bail!("feed entry {id} not found in any recent partition");
        };
        let sql = format!("UPDATE {table} SET content = $1, language = $2 WHERE id = $3");
        sqlx::query(&sql)
            .bind(content)
            .bind(language)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_flashpoint_ids_for_run(&self, run_id: &str) -> anyhow::Result<Vec<Uuid>> {
        let target_date: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT target_date FROM processing_runs WHERE run_id = $1")
                .bind(run_id)
                .fetch_optional(&self.pool)
                .await?;
        let Some(target_date) = target_date else {
            return Ok(Vec::new());
        };
        let table = make_table_name(FEED_ENTRIES, target_date.date_naive());
        let sql = format!(
            "SELECT DISTINCT fe.flashpoint_id FROM {table} fe
             JOIN feed_entry_jobs j ON j.feed_entry_id = fe.id
             WHERE j.run_id = $1"
        );
        let rows: Vec<Uuid> = sqlx::query_scalar(&sql).bind(run_id).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

/// `feed_entry_jobs` repository.
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn create_job(&self, feed_entry_id: Uuid, run_id: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO feed_entry_jobs (feed_entry_id, run_id, status, attempt_count, updated_at)
             VALUES ($1, $2, 'queued', 0, now())
             ON CONFLICT (feed_entry_id, run_id) DO NOTHING",
        )
        .bind(feed_entry_id)
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn claim_job(&self, feed_entry_id: Uuid, run_id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO feed_entry_jobs (feed_entry_id, run_id, status, attempt_count, updated_at)
             VALUES ($1, $2, 'fetching', 1, now())
             ON CONFLICT (feed_entry_id, run_id) DO NOTHING",
        )
        .bind(feed_entry_id)
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn claim_jobs_bulk(&self, feed_entry_ids: &[Uuid], run_id: &str) -> anyhow::Result<u64> {
        if feed_entry_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "INSERT INTO feed_entry_jobs (feed_entry_id, run_id, status, attempt_count, updated_at)
             SELECT id, $2, 'fetching', 1, now() FROM UNNEST($1::uuid[]) AS id
             ON CONFLICT (feed_entry_id, run_id) DO NOTHING",
        )
        .bind(feed_entry_ids)
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn bulk_update_status(&self, feed_entry_ids: &[Uuid], run_id: &str, status: JobStatus) -> anyhow::Result<()> {
        if feed_entry_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "UPDATE feed_entry_jobs SET status = $1, updated_at = now()
             WHERE run_id = $2 AND feed_entry_id = ANY($3::uuid[])",
        )
        .bind(status.as_str())
        .bind(run_id)
        .bind(feed_entry_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_status(&self, feed_entry_id: Uuid, run_id: &str, status: JobStatus) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE feed_entry_jobs SET status = $1, updated_at = now()
             WHERE feed_entry_id = $2 AND run_id = $3",
        )
        .bind(status.as_str())
        .bind(feed_entry_id)
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed(&self, feed_entry_id: Uuid, run_id: &str, reason: FailureReason, message: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE feed_entry_jobs
             SET status = 'failed', failure_reason = $1, last_error = $2,
                 attempt_count = attempt_count + 1, updated_at = now()
             WHERE feed_entry_id = $3 AND run_id = $4",
        )
        .bind(reason.as_str())
        .bind(message)
        .bind(feed_entry_id)
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_run_stats(&self, run_id: &str) -> anyhow::Result<Vec<(JobStatus, i64)>> {
        let rows = sqlx::query(
            "SELECT status, count(*) AS n FROM feed_entry_jobs WHERE run_id = $1 GROUP BY status",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                let status: String = row.try_get("status")?;
                let n: i64 = row.try_get("n")?;
                Ok((parse_job_status(&status), n))
            })
            .collect()
    }

    async fn get_jobs_for_run(&self, run_id: &str) -> anyhow::Result<Vec<Job>> {
        let rows = sqlx::query("SELECT * FROM feed_entry_jobs WHERE run_id = $1")
            .bind(run_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_job).collect()
    }
}

/// `feed_entry_vectors` repository.
pub struct PgVectorRepository {
    pool: PgPool,
}

impl PgVectorRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorRepository for PgVectorRepository {
    async fn upsert_embedding(&self, embedding: &Embedding) -> anyhow::Result<()> {
        let vector = pgvector::Vector::from(embedding.vector.clone());
        sqlx::query(
            "INSERT INTO feed_entry_vectors (feed_entry_id, run_id, model_name, embedding)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (feed_entry_id, run_id) DO UPDATE
             SET model_name = EXCLUDED.model_name, embedding = EXCLUDED.embedding",
        )
        .bind(embedding.feed_entry_id)
        .bind(&embedding.run_id)
        .bind(&embedding.model)
        .bind(vector)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn bulk_upsert_embeddings(&self, embeddings: &[Embedding]) -> anyhow::Result<()> {
        for embedding in embeddings {
            self.upsert_embedding(embedding).await?;
        }
        Ok(())
    }

    async fn get_embeddings_for_flashpoint(&self, flashpoint_id: Uuid, run_id: &str) -> anyhow::Result<Vec<Embedding>> {
        let target_date: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT target_date FROM processing_runs WHERE run_id = $1")
                .bind(run_id)
                .fetch_optional(&self.pool)
                .await?;
        let Some(target_date) = target_date else {
            return Ok(Vec::new());
        };
        let table = make_table_name(FEED_ENTRIES, target_date.date_naive());
        let sql = format!(
            "SELECT v.feed_entry_id, v.run_id, v.model_name, v.embedding
             FROM feed_entry_vectors v
             JOIN {table} fe ON fe.id = v.feed_entry_id
             WHERE fe.flashpoint_id = $1 AND v.run_id = $2"
        );
        let rows = sqlx::query(&sql)
            .bind(flashpoint_id)
            .bind(run_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                let vector: pgvector::Vector = row.try_get("embedding")?;
                Ok(Embedding {
                    feed_entry_id: row.try_get("feed_entry_id")?,
                    run_id: row.try_get("run_id")?,
                    model: row.try_get("model_name")?,
                    vector: vector.to_vec(),
                })
            })
            .collect()
    }
}

/// `cluster_members` / `news_clusters` repository.
pub struct PgClusterRepository {
    pool: PgPool,
}

impl PgClusterRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClusterRepository for PgClusterRepository {
    async fn insert_cluster_members(&self, members: &[ClusterMember]) -> anyhow::Result<()> {
        for member in members {
            sqlx::query(
                "INSERT INTO cluster_members (feed_entry_id, run_id, flashpoint_id, cluster_id, similarity)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (feed_entry_id, run_id) DO UPDATE
                 SET flashpoint_id = EXCLUDED.flashpoint_id, cluster_id = EXCLUDED.cluster_id,
                     similarity = EXCLUDED.similarity",
            )
            .bind(member.feed_entry_id)
            .bind(&member.run_id)
            .bind(member.flashpoint_id)
            .bind(member.cluster_id)
            .bind(f64::from(member.similarity_to_centroid))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn write_news_cluster(&self, summary: &ClusterSummary) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO news_clusters
                (flashpoint_id, cluster_id, summary, article_count, top_domains, languages, urls, images)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (flashpoint_id, cluster_id) DO UPDATE
             SET summary = EXCLUDED.summary, article_count = EXCLUDED.article_count,
                 top_domains = EXCLUDED.top_domains, languages = EXCLUDED.languages,
                 urls = EXCLUDED.urls, images = EXCLUDED.images",
        )
        .bind(summary.flashpoint_id)
        .bind(summary.cluster_id)
        .bind(&summary.summary)
        .bind(summary.article_count)
        .bind(&summary.top_domains)
        .bind(&summary.languages)
        .bind(&summary.urls)
        .bind(&summary.images)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_clusters_for_flashpoint(&self, flashpoint_id: Uuid, run_id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM cluster_members WHERE flashpoint_id = $1 AND run_id = $2")
            .bind(flashpoint_id)
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
