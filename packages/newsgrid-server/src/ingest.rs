//! Per-entry ingest: fetch, extract, enrich, and dedupe-check, chunked per
//! run so a crash partway through a large batch loses at most one chunk's
//! worth of progress.

use std::sync::Arc;

use tracing::{info, warn};

use newsgrid_core::{
    derive_hostname, detect_failure_reason, extract_candidate_images, extract_article_text,
    DedupOutcome, DeduplicationEngine, Embedder, FailureReason, FeedEntry, GeoResolver,
    JobStatus, LanguageDetector, NerExtractor, Translator,
};

use crate::error::JobError;
use crate::extract_adapters::default_extractor_chain;
use crate::fetch::AsyncFetcher;
use crate::traits::{FeedEntryRepository, JobRepository, VectorRepository};

/// Model-backed enrichment stages, each optional: a deployment that hasn't
/// wired a given model simply skips that stage rather than failing the
/// entry.
#[derive(Default)]
pub struct Enrichers {
    pub language_detector: Option<Arc<dyn LanguageDetector>>,
    pub translator: Option<Arc<dyn Translator>>,
    pub ner_extractor: Option<Arc<dyn NerExtractor>>,
    pub geo_resolver: Option<Arc<dyn GeoResolver>>,
    pub embedder: Option<Arc<dyn Embedder>>,
}

/// Drives fetch -> extract -> enrich -> dedupe for one processing run.
pub struct IngestService {
    entries: Arc<dyn FeedEntryRepository>,
    jobs: Arc<dyn JobRepository>,
    vectors: Arc<dyn VectorRepository>,
    fetcher: Arc<AsyncFetcher>,
    enrichers: Enrichers,
}

/// Outcome of processing one chunk of entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkStats {
    pub processed: u64,
    pub failed: u64,
    pub duplicates: u64,
}

impl IngestService {
    #[must_use]
    pub fn new(
        entries: Arc<dyn FeedEntryRepository>,
        jobs: Arc<dyn JobRepository>,
        vectors: Arc<dyn VectorRepository>,
        fetcher: Arc<AsyncFetcher>,
        enrichers: Enrichers,
    ) -> Self {
        Self { entries, jobs, vectors, fetcher, enrichers }
    }

    /// Processes one chunk of entries for `run_id`: fetch+extract+enrich
    /// each, check it against `dedup` (shared across the whole run), then
    /// batch-embed whatever survived if an embedder is configured.
    pub async fn process_chunk(
        &self,
        run_id: &str,
        chunk: &[FeedEntry],
        dedup: &mut DeduplicationEngine,
    ) -> ChunkStats {
        let mut stats = ChunkStats::default();
        let mut to_embed: Vec<(uuid::Uuid, String)> = Vec::new();

        for entry in chunk {
            match self.process_entry(entry).await {
                Ok(enriched_text) => {
                    let _ = self.jobs.update_status(entry.id, run_id, JobStatus::Extracted).await;
                    let outcome = dedup.check_and_register(&entry.id.to_string(), &enriched_text);
                    match outcome {
                        DedupOutcome::Unique => {
                            to_embed.push((entry.id, enriched_text));
                            let _ = self.jobs.update_status(entry.id, run_id, JobStatus::Deduped).await;
                        }
                        DedupOutcome::ExactDuplicate { of_id } | DedupOutcome::NearDuplicate { of_id, .. } => {
                            stats.duplicates += 1;
                            info!(entry_id = %entry.id, %of_id, "skipping duplicate entry");
                            let _ = self.jobs.update_status(entry.id, run_id, JobStatus::SkippedDuplicate).await;
                        }
                    }
                    stats.processed += 1;
                }
                Err(err) => {
                    stats.failed += 1;
                    warn!(entry_id = %entry.id, reason = ?err.reason, "entry processing failed");
                    let _ = self.jobs.mark_failed(entry.id, run_id, err.reason, &err.message).await;
                }
            }
        }

        if let Some(embedder) = &self.enrichers.embedder {
            if !to_embed.is_empty() {
                self.embed_batch(run_id, embedder.as_ref(), &to_embed).await;
            }
        }

        stats
    }

    /// Fetches and extracts one entry's article body, then runs the
    /// optional enrichment fan-out against it. Returns the text that should
    /// be registered with the run's [`DeduplicationEngine`].
    ///
    /// An entry resumed from a prior interrupted run already carries
    /// extracted content; fetch and extraction are skipped and the existing
    /// content feeds straight into enrichment and dedupe.
    async fn process_entry(&self, entry: &FeedEntry) -> Result<String, JobError> {
        let (text, html) = match &entry.content {
            Some(existing) => (existing.clone(), None),
            None => {
                let fetched = self.fetcher.fetch(&entry.url).await?;
                let extractors = default_extractor_chain();
                let extraction =
                    extract_article_text(&extractors, &fetched.html, newsgrid_core::extraction::MIN_TEXT_LENGTH)
                        .map_err(|err| JobError::new(err.reason, format!("extraction failed: {:?}", err.warnings)))?;

                if detect_failure_reason(&fetched.html, extraction.text.len()) == FailureReason::NoText
                    && extraction.text.len() < newsgrid_core::extraction::MIN_TEXT_LENGTH
                {
                    return Err(JobError::new(FailureReason::NoText, "extracted text too short"));
                }

                (extraction.text, Some(fetched.html))
            }
        };

        let language = self.enrichers.language_detector.as_ref().and_then(|d| d.detect(&text));

        self.entries
            .update_enrichment(entry.id, &text, language.as_deref())
            .await
            .map_err(|e| JobError::new(FailureReason::ExtractionError, e.to_string()))?;

        if let (Some(translator), Some(lang)) = (&self.enrichers.translator, &language) {
            let _title_en = translator.translate_to_english(&entry.title, lang);
        }

        if let Some(ner) = &self.enrichers.ner_extractor {
            if let Ok(entities) = ner.extract(&text) {
                if let Some(geo) = &self.enrichers.geo_resolver {
                    let _geo_entities = geo.resolve(&entities);
                }
            }
        }

        let _hostname = derive_hostname(&entry.url);
        if let Some(html) = &html {
            let _images = extract_candidate_images(html, &entry.url);
        }

        Ok(text)
    }

    async fn embed_batch(&self, run_id: &str, embedder: &dyn Embedder, entries: &[(uuid::Uuid, String)]) {
        let texts: Vec<String> = entries.iter().map(|(_, t)| t.clone()).collect();
        match embedder.embed_batch(&texts) {
            Ok(vectors) => {
                let embeddings: Vec<newsgrid_core::Embedding> = entries
                    .iter()
                    .zip(vectors)
                    .map(|((id, _), vector)| newsgrid_core::Embedding {
                        feed_entry_id: *id,
                        run_id: run_id.to_string(),
                        vector,
                        model: embedder.model_name().to_string(),
                    })
                    .collect();
                if let Err(err) = self.vectors.bulk_upsert_embeddings(&embeddings).await {
                    warn!(%run_id, error = %err, "bulk embedding upsert failed");
                    return;
                }
                for (id, _) in entries {
                    let _ = self.jobs.update_status(*id, run_id, JobStatus::Embedded).await;
                }
            }
            Err(err) => {
                warn!(%run_id, error = %err, "batch embedding failed");
                for (id, _) in entries {
                    let _ = self
                        .jobs
                        .mark_failed(*id, run_id, FailureReason::EmbeddingError, &err.to_string())
                        .await;
                }
            }
        }
    }
}
