//! Per-cluster summarization: extractive for lower tiers, LLM-backed for
//! premium, with the extractive summary always computed as the LLM path's
//! fallback on failure.

use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};
use tracing::warn;

use newsgrid_core::{ClusterSummary, FeedEntry, LlmSummarizer, Tier};

const TOP_DOMAINS_CAP: usize = 10;
const URLS_CAP: usize = 50;
const IMAGES_CAP: usize = 20;
const SUMMARY_TOP_ARTICLES: usize = 10;
const SUMMARY_SENTENCES_PER_ARTICLE: usize = 2;
const SUMMARY_MAX_SENTENCES: usize = 5;
const SUMMARY_MIN_SENTENCE_LEN: usize = 30;

/// Builds per-cluster summaries, rate-limiting LLM calls process-wide.
pub struct ClusterSummarizer {
    llm: Option<Arc<dyn LlmSummarizer>>,
    llm_limiter: Option<RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>>,
}

impl ClusterSummarizer {
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmSummarizer>>, rpm: u32) -> Self {
        let llm_limiter = llm.is_some().then(|| {
            let quota = Quota::per_minute(NonZeroU32::new(rpm.max(1)).expect("max(1) is nonzero"));
            RateLimiter::direct(quota)
        });
        Self { llm, llm_limiter }
    }

    /// Summarizes the given cluster members, using the LLM backend when
    /// `tier` allows it and falling back to the extractive summary if the
    /// LLM call fails or isn't configured.
    pub async fn summarize(
        &self,
        tier: Tier,
        flashpoint_id: uuid::Uuid,
        cluster_id: i32,
        members: &[FeedEntry],
    ) -> ClusterSummary {
        let extractive = extractive_summary(members);

        let summary = if tier.has_llm_summaries() {
            match (&self.llm, &self.llm_limiter) {
                (Some(llm), Some(limiter)) => {
                    limiter.until_ready().await;
                    let input = cluster_input(members);
                    match llm.summarize(&input) {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(%flashpoint_id, cluster_id, error = %err, "llm summarization failed, using extractive fallback");
                            extractive.clone()
                        }
                    }
                }
                _ => extractive.clone(),
            }
        } else {
            extractive
        };

        ClusterSummary {
            flashpoint_id,
            cluster_id,
            summary,
            article_count: members.len() as i32,
            top_domains: top_domains(members),
            languages: languages(members),
            urls: urls(members),
            images: images(members),
        }
    }
}

fn cluster_input(members: &[FeedEntry]) -> String {
    members
        .iter()
        .filter_map(|m| m.content.as_deref())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Picks up to 5 distinct lead sentences across the first 10 articles (2 per
/// article, >30 chars, de-duplicated by first appearance), falling back to
/// article titles when nothing qualifies. A cheap stand-in for a real
/// extractive summarizer (e.g. TextRank) that still gives lower tiers a
/// usable summary without an LLM call.
fn extractive_summary(members: &[FeedEntry]) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut sentences = Vec::new();

    'articles: for m in members.iter().take(SUMMARY_TOP_ARTICLES) {
        let Some(content) = m.content.as_deref() else { continue };
        let mut taken = 0;
        for sentence in content.split(". ") {
            let sentence = sentence.trim();
            if sentence.len() <= SUMMARY_MIN_SENTENCE_LEN {
                continue;
            }
            if !seen.insert(sentence.to_string()) {
                continue;
            }
            sentences.push(sentence.to_string());
            taken += 1;
            if taken >= SUMMARY_SENTENCES_PER_ARTICLE {
                break;
            }
            if sentences.len() >= SUMMARY_MAX_SENTENCES {
                break 'articles;
            }
        }
        if sentences.len() >= SUMMARY_MAX_SENTENCES {
            break;
        }
    }

    if sentences.is_empty() {
        members.iter().map(|m| m.title.as_str()).collect::<Vec<_>>().join(" ")
    } else {
        sentences.join(" ")
    }
}

fn top_domains(members: &[FeedEntry]) -> Vec<String> {
    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for m in members {
        *counts.entry(m.domain.as_str()).or_default() += 1;
    }
    let mut domains: Vec<(&str, usize)> = counts.into_iter().collect();
    domains.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    domains.into_iter().take(TOP_DOMAINS_CAP).map(|(d, _)| d.to_string()).collect()
}

fn languages(members: &[FeedEntry]) -> Vec<String> {
    let set: BTreeSet<String> = members.iter().filter_map(|m| m.language.clone()).collect();
    set.into_iter().collect()
}

fn urls(members: &[FeedEntry]) -> Vec<String> {
    members.iter().map(|m| m.url.clone()).take(URLS_CAP).collect()
}

fn images(members: &[FeedEntry]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    members
        .iter()
        .flat_map(|m| m.images.iter().cloned())
        .filter(|url| seen.insert(url.clone()))
        .take(IMAGES_CAP)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn entry(domain: &str, content: &str, lang: &str) -> FeedEntry {
        FeedEntry {
            id: Uuid::new_v4(),
            flashpoint_id: Uuid::new_v4(),
            url: format!("https://{domain}/a"),
            domain: domain.to_string(),
            title: "title".to_string(),
            language: Some(lang.to_string()),
            sourcecountry: None,
            description: None,
            published_at: Some(Utc::now()),
            content: Some(content.to_string()),
            title_en: None,
            summary: None,
            entities: Vec::new(),
            geo_entities: Vec::new(),
            images: vec![format!("https://{domain}/img.jpg")],
        }
    }

    #[tokio::test]
    async fn basic_tier_uses_extractive_summary() {
        let summarizer = ClusterSummarizer::new(None, 60);
        let members = vec![entry(
            "a.com",
            "This is a sufficiently long lead sentence for the cluster. This is a second long sentence too.",
            "en",
        )];
        let summary = summarizer.summarize(Tier::Basic, Uuid::new_v4(), 0, &members).await;
        assert!(summary.summary.starts_with("This is a sufficiently long lead sentence"));
        assert_eq!(summary.article_count, 1);
    }

    #[tokio::test]
    async fn extractive_summary_falls_back_to_titles_when_no_sentence_qualifies() {
        let summarizer = ClusterSummarizer::new(None, 60);
        let members = vec![entry("a.com", "Too short.", "en")];
        let summary = summarizer.summarize(Tier::Basic, Uuid::new_v4(), 0, &members).await;
        assert_eq!(summary.summary, "title");
    }

    #[test]
    fn top_domains_ranks_by_frequency_then_name() {
        let members = vec![entry("b.com", "x", "en"), entry("a.com", "y", "en"), entry("a.com", "z", "en")];
        assert_eq!(top_domains(&members), vec!["a.com".to_string(), "b.com".to_string()]);
    }

    #[test]
    fn languages_are_sorted_and_deduplicated() {
        let members = vec![entry("a.com", "x", "fr"), entry("b.com", "y", "en"), entry("c.com", "z", "en")];
        assert_eq!(languages(&members), vec!["en".to_string(), "fr".to_string()]);
    }

    #[test]
    fn images_deduplicate_across_members() {
        let mut m1 = entry("a.com", "x", "en");
        m1.images = vec!["https://a.com/1.jpg".to_string()];
        let mut m2 = entry("a.com", "y", "en");
        m2.images = vec!["https://a.com/1.jpg".to_string(), "https://a.com/2.jpg".to_string()];
        assert_eq!(images(&[m1, m2]), vec!["https://a.com/1.jpg".to_string(), "https://a.com/2.jpg".to_string()]);
    }
}
