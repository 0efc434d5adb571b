//! Interfaces for the model-backed enrichment fan-out (language detection,
//! translation, NER, geo-resolution, embedding, LLM summarization).
//!
//! These stages depend on loaded ML models and external services, which are
//! deliberately out of scope here: the traits describe the contract the
//! ingest orchestrator drives, and concrete implementations (wrapping
//! whatever model runtime or API client a deployment chooses) live in the
//! server crate or a deployment-specific adapter crate.

use crate::domain::{GeoEntity, NerEntity};

/// Detects the ISO-639-1 language code of a piece of text.
pub trait LanguageDetector: Send + Sync {
    /// Returns a best-guess language code, or `None` if detection is
    /// inconclusive (e.g. text too short).
    fn detect(&self, text: &str) -> Option<String>;
}

/// Translates text into English.
pub trait Translator: Send + Sync {
    /// Returns `None` if `source_lang` is already English or unsupported.
    fn translate_to_english(&self, text: &str, source_lang: &str) -> Option<String>;
}

/// Extracts named entities from text.
pub trait NerExtractor: Send + Sync {
    /// # Errors
    ///
    /// Returns an error only for unrecoverable model failures; entity-level
    /// ambiguity is resolved by the implementation, never surfaced as an
    /// error.
    fn extract(&self, text: &str) -> anyhow::Result<Vec<NerEntity>>;
}

/// Resolves location-type named entities (`LOC`, `GPE`) to country records.
pub trait GeoResolver: Send + Sync {
    fn resolve(&self, entities: &[NerEntity]) -> Vec<GeoEntity>;
}

/// Computes a fixed-dimension, L2-normalized embedding for a batch of texts.
pub trait Embedder: Send + Sync {
    /// The dimensionality of vectors this embedder produces.
    fn dimension(&self) -> usize;

    /// The model name tag stored alongside each embedding row.
    fn model_name(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error if the underlying model fails on the whole batch.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Summarizes a cluster's concatenated article content via an external LLM.
///
/// May internally retry or fail over between providers; the orchestrator
/// only sees a single `summarize` call per cluster and falls back to the
/// extractive summary on error.
pub trait LlmSummarizer: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if every retry/fallback the implementation attempts
    /// is exhausted.
    fn summarize(&self, cluster_input: &str) -> anyhow::Result<String>;
}
