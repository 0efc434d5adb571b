//! Core data model: processing runs, per-entry jobs, and the artifacts they produce.
//!
//! Mirrors the relational schema owned by the server crate's repositories, but
//! lives here so that pure pipeline logic (state machine validation, scoring,
//! clustering) can depend on the types without pulling in `sqlx`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Partial,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Partial => "partial",
        }
    }
}

/// Lifecycle state of a single feed entry's processing job.
///
/// `Deduped` and `Scored` are terminal-adjacent states carried over from the
/// original system's schema; they are reserved for downstream consumers that
/// may track scoring separately from clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Fetching,
    Extracted,
    Deduped,
    Embedded,
    Clustered,
    Summarized,
    Scored,
    Failed,
    SkippedDuplicate,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Fetching => "fetching",
            JobStatus::Extracted => "extracted",
            JobStatus::Deduped => "deduped",
            JobStatus::Embedded => "embedded",
            JobStatus::Clustered => "clustered",
            JobStatus::Summarized => "summarized",
            JobStatus::Scored => "scored",
            JobStatus::Failed => "failed",
            JobStatus::SkippedDuplicate => "skipped_duplicate",
        }
    }

    /// True if no further transitions are expected from this state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Failed | JobStatus::SkippedDuplicate | JobStatus::Summarized | JobStatus::Scored
        )
    }
}

/// Reason a job failed, used for both logging and failure-rate triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    FetchError,
    FetchTimeout,
    FetchBlocked,
    Paywall,
    ConsentWall,
    JsRequired,
    NoText,
    ExtractionError,
    EmbeddingError,
    Unknown,
}

impl FailureReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::FetchError => "fetch_error",
            FailureReason::FetchTimeout => "fetch_timeout",
            FailureReason::FetchBlocked => "fetch_blocked",
            FailureReason::Paywall => "paywall",
            FailureReason::ConsentWall => "consent_wall",
            FailureReason::JsRequired => "js_required",
            FailureReason::NoText => "no_text",
            FailureReason::ExtractionError => "extraction_error",
            FailureReason::EmbeddingError => "embedding_error",
            FailureReason::Unknown => "unknown",
        }
    }
}

/// Subscription tier, which gates which pipeline stages run for a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Basic,
    Standard,
    Premium,
}

impl Tier {
    #[must_use]
    pub fn has_embeddings(self) -> bool {
        matches!(self, Tier::Standard | Tier::Premium)
    }

    #[must_use]
    pub fn has_clustering(self) -> bool {
        matches!(self, Tier::Standard | Tier::Premium)
    }

    #[must_use]
    pub fn has_llm_summaries(self) -> bool {
        matches!(self, Tier::Premium)
    }
}

/// A single processing run over a target date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub target_date: DateTime<Utc>,
    pub status: RunStatus,
    pub tier: Tier,
    pub entries_total: i64,
    pub entries_failed: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// A raw feed entry sourced from upstream ingestion, prior to any pipeline work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    pub id: Uuid,
    pub flashpoint_id: Uuid,
    pub url: String,
    pub domain: String,
    pub title: String,
    pub language: Option<String>,
    pub sourcecountry: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Extracted article body, populated by the fetch+extract stage. A
    /// resumed entry already carries this from a prior interrupted run.
    pub content: Option<String>,
    pub title_en: Option<String>,
    pub summary: Option<String>,
    pub entities: Vec<NerEntity>,
    pub geo_entities: Vec<GeoEntity>,
    pub images: Vec<String>,
}

/// A named entity recognized in an entry's title or body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NerEntity {
    pub text: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
}

/// A country resolved from a location-type named entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoEntity {
    pub country_name: String,
    pub alpha2: String,
    pub alpha3: String,
}

/// Per-entry, per-run processing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub feed_entry_id: Uuid,
    pub run_id: String,
    pub status: JobStatus,
    pub failure_reason: Option<FailureReason>,
    pub attempt_count: i32,
    pub updated_at: DateTime<Utc>,
}

/// A dense embedding vector attached to a feed entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub feed_entry_id: Uuid,
    pub run_id: String,
    pub vector: Vec<f32>,
    pub model: String,
}

/// Membership of a feed entry in a computed cluster, with its similarity to
/// the cluster centroid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterMember {
    pub feed_entry_id: Uuid,
    pub run_id: String,
    pub flashpoint_id: Uuid,
    pub cluster_id: i32,
    pub similarity_to_centroid: f32,
}

/// A persisted summary for one cluster within a flashpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub flashpoint_id: Uuid,
    pub cluster_id: i32,
    pub summary: String,
    pub article_count: i32,
    pub top_domains: Vec<String>,
    pub languages: Vec<String>,
    pub urls: Vec<String>,
    pub images: Vec<String>,
}
