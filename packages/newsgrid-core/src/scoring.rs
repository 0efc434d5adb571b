//! Hotspot scoring: a weighted combination of volume, recency, source
//! diversity, and topic weight for a flashpoint.
//!
//! This is a downstream-consumer concern -- the ingest pipeline does not
//! write scores itself -- but the formula is exposed here as a pure function
//! so alerting/ranking consumers share one implementation.

use std::collections::HashMap;
use std::sync::LazyLock;

/// IPTC top-level topic weights used by the topic component of the score.
/// Topics not present in this table default to [`DEFAULT_TOPIC_WEIGHT`].
pub static TOPIC_WEIGHTS: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    HashMap::from([
        ("conflict, war and peace", 1.0),
        ("politics", 0.85),
        ("disaster, accident and emergency incident", 0.9),
        ("economy, business and finance", 0.6),
        ("health", 0.55),
        ("crime, law and justice", 0.5),
        ("environment", 0.45),
        ("science and technology", 0.35),
        ("arts, culture, entertainment and media", 0.2),
        ("sport", 0.15),
        ("lifestyle and leisure", 0.1),
    ])
});

pub const DEFAULT_TOPIC_WEIGHT: f64 = 0.3;

/// Half-life, in hours, of the recency decay component.
pub const RECENCY_HALF_LIFE_HOURS: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotspotScore {
    pub total: f64,
    pub volume_component: f64,
    pub recency_component: f64,
    pub diversity_component: f64,
    pub topic_component: f64,
}

/// Computes a hotspot score from:
/// - `article_count`: number of articles in the cluster
/// - `hours_since_latest`: age, in hours, of the most recent article
/// - `distinct_domains`: number of distinct source domains
/// - `topic`: lowercase IPTC top-level topic name, looked up in
///   [`TOPIC_WEIGHTS`]
///
/// Weighted 30% volume (log-scaled), 25% recency (exponential decay), 25%
/// source diversity (log-scaled), 20% topic weight.
#[must_use]
pub fn compute_hotspot_score(
    article_count: u32,
    hours_since_latest: f64,
    distinct_domains: u32,
    topic: &str,
) -> HotspotScore {
    let volume_component = (f64::from(article_count) + 1.0).ln();
    let recency_component = 2f64.powf(-hours_since_latest / RECENCY_HALF_LIFE_HOURS);
    let diversity_component = (f64::from(distinct_domains) + 1.0).ln();
    let topic_component = *TOPIC_WEIGHTS
        .get(topic.to_lowercase().as_str())
        .unwrap_or(&DEFAULT_TOPIC_WEIGHT);

    let total = 0.30 * volume_component
        + 0.25 * recency_component
        + 0.25 * diversity_component
        + 0.20 * topic_component;

    HotspotScore {
        total,
        volume_component,
        recency_component,
        diversity_component,
        topic_component,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_high_volume_scores_higher_than_stale_low_volume() {
        let fresh = compute_hotspot_score(50, 1.0, 20, "conflict, war and peace");
        let stale = compute_hotspot_score(2, 72.0, 1, "lifestyle and leisure");
        assert!(fresh.total > stale.total);
    }

    #[test]
    fn unknown_topic_uses_default_weight() {
        let score = compute_hotspot_score(5, 1.0, 3, "an unrecognized topic");
        assert!((score.topic_component - DEFAULT_TOPIC_WEIGHT).abs() < f64::EPSILON);
    }

    #[test]
    fn recency_decays_by_half_at_half_life() {
        let at_zero = compute_hotspot_score(1, 0.0, 1, "sport");
        let at_half_life = compute_hotspot_score(1, RECENCY_HALF_LIFE_HOURS, 1, "sport");
        assert!((at_half_life.recency_component - at_zero.recency_component / 2.0).abs() < 1e-9);
    }

    #[test]
    fn topic_lookup_is_case_insensitive() {
        let a = compute_hotspot_score(5, 1.0, 3, "Politics");
        let b = compute_hotspot_score(5, 1.0, 3, "politics");
        assert!((a.topic_component - b.topic_component).abs() < f64::EPSILON);
    }
}
