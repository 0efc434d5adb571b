//! Within-run near-duplicate detection.
//!
//! One [`DeduplicationEngine`] is scoped to a single processing run. Entries
//! are registered in fetch order; each registration checks the incoming
//! document against everything already seen in the run before deciding
//! whether it's an exact duplicate, a near duplicate, or novel. Cross-run
//! dedup is explicitly out of scope: the engine is created per run and
//! dropped at the end of it.

use std::collections::HashMap;

use crate::fingerprint::{compute_content_hash, MinHashSignature, NUM_HASHES};

/// LSH banding parameters: the signature is split into `BANDS` bands of
/// `ROWS_PER_BAND` hash values each. Two documents land in the same bucket
/// for a band if all `ROWS_PER_BAND` values in that band match, which makes
/// them dedup candidates worth a full Jaccard comparison.
const BANDS: usize = 16;
const ROWS_PER_BAND: usize = NUM_HASHES / BANDS;

/// Minimum estimated Jaccard similarity for two documents to be considered
/// near-duplicates.
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.8;

/// Outcome of registering a document with the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum DedupOutcome {
    /// No prior document in this run matches; the document has been
    /// registered as a new distinct signature.
    Unique,
    /// A prior document has an identical content hash.
    ExactDuplicate { of_id: String },
    /// A prior document has estimated Jaccard similarity above
    /// [`NEAR_DUPLICATE_THRESHOLD`].
    NearDuplicate { of_id: String, similarity: f64 },
}

struct RegisteredDoc {
    id: String,
    content_hash: String,
    signature: MinHashSignature,
}

/// Per-run near-duplicate detection engine combining exact content hashing
/// with MinHash/LSH approximate matching.
pub struct DeduplicationEngine {
    by_content_hash: HashMap<String, String>,
    docs: Vec<RegisteredDoc>,
    /// LSH buckets: band index -> band signature -> doc indices sharing it.
    buckets: Vec<HashMap<u64, Vec<usize>>>,
}

impl DeduplicationEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_content_hash: HashMap::new(),
            docs: Vec::new(),
            buckets: (0..BANDS).map(|_| HashMap::new()).collect(),
        }
    }

    /// Checks `text` against everything registered so far in this run. Exact
    /// matches register nothing further. Near-duplicates register their
    /// content hash only, so a later exact match against this text is still
    /// caught, but they never join the LSH index (which would let a chain of
    /// near-duplicates gradually drift into matching an unrelated document).
    /// Only a unique document is fully registered (hash + LSH). `id` is the
    /// feed entry identifier used to report which prior document a duplicate
    /// matches.
    pub fn check_and_register(&mut self, id: &str, text: &str) -> DedupOutcome {
        let content_hash = compute_content_hash(text);

        if let Some(existing_id) = self.by_content_hash.get(&content_hash) {
            return DedupOutcome::ExactDuplicate { of_id: existing_id.clone() };
        }

        let signature = MinHashSignature::compute(text);
        let candidates = self.candidate_indices(&signature);

        let mut best: Option<(usize, f64)> = None;
        for idx in candidates {
            let sim = signature.estimated_jaccard(&self.docs[idx].signature);
            let better_than_best = match &best {
                Some((_, b)) => sim > *b,
                None => true,
            };
            if sim >= NEAR_DUPLICATE_THRESHOLD && better_than_best {
                best = Some((idx, sim));
            }
        }

        if let Some((idx, sim)) = best {
            let of_id = self.docs[idx].id.clone();
            self.register_hash_only(id, content_hash);
            return DedupOutcome::NearDuplicate { of_id, similarity: sim };
        }

        self.register_full(id, content_hash, signature);
        DedupOutcome::Unique
    }

    /// Records `content_hash` for a near-duplicate so future exact matches
    /// against it are caught, without adding it to the LSH index.
    fn register_hash_only(&mut self, id: &str, content_hash: String) {
        self.by_content_hash.entry(content_hash).or_insert_with(|| id.to_string());
    }

    /// Records a unique document's hash, LSH bands, and signature.
    fn register_full(&mut self, id: &str, content_hash: String, signature: MinHashSignature) {
        self.by_content_hash
            .entry(content_hash.clone())
            .or_insert_with(|| id.to_string());

        let idx = self.docs.len();
        for band in 0..BANDS {
            let key = band_key(&signature, band);
            self.buckets[band].entry(key).or_default().push(idx);
        }
        self.docs.push(RegisteredDoc {
            id: id.to_string(),
            content_hash,
            signature,
        });
    }

    fn candidate_indices(&self, signature: &MinHashSignature) -> Vec<usize> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for band in 0..BANDS {
            let key = band_key(signature, band);
            if let Some(indices) = self.buckets[band].get(&key) {
                for &idx in indices {
                    if seen.insert(idx) {
                        out.push(idx);
                    }
                }
            }
        }
        out
    }

    /// Number of documents fully registered (i.e. unique) so far. Exact and
    /// near duplicates don't count: they never join the LSH index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl Default for DeduplicationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn band_key(signature: &MinHashSignature, band: usize) -> u64 {
    let start = band * ROWS_PER_BAND;
    let slice = &signature.0[start..start + ROWS_PER_BAND];
    let mut acc: u64 = 0xcbf2_9ce4_8422_2325;
    for &v in slice {
        acc ^= v;
        acc = acc.wrapping_mul(0x0000_0100_0000_01B3);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_document_is_unique() {
        let mut engine = DeduplicationEngine::new();
        let outcome = engine.check_and_register("a", "the quick brown fox jumps over the lazy dog");
        assert_eq!(outcome, DedupOutcome::Unique);
    }

    #[test]
    fn identical_text_is_exact_duplicate() {
        let mut engine = DeduplicationEngine::new();
        engine.check_and_register("a", "Breaking: markets rally on rate cut news");
        let outcome = engine.check_and_register("b", "breaking:   markets rally on rate cut news");
        assert_eq!(
            outcome,
            DedupOutcome::ExactDuplicate { of_id: "a".to_string() }
        );
    }

    #[test]
    fn near_identical_text_is_near_duplicate() {
        let mut engine = DeduplicationEngine::new();
        engine.check_and_register(
            "a",
            "the city council approved a new budget plan on tuesday afternoon after weeks of debate",
        );
        let outcome = engine.check_and_register(
            "b",
            "the city council approved a new budget plan on tuesday evening after weeks of debate",
        );
        match outcome {
            DedupOutcome::NearDuplicate { of_id, similarity } => {
                assert_eq!(of_id, "a");
                assert!(similarity >= NEAR_DUPLICATE_THRESHOLD);
            }
            other => panic!("expected near duplicate, got {other:?}"),
        }
    }

    #[test]
    fn unrelated_text_is_unique() {
        let mut engine = DeduplicationEngine::new();
        engine.check_and_register("a", "stock markets rallied after the earnings report");
        let outcome = engine.check_and_register(
            "b",
            "researchers discover a new species of deep sea fish near the mariana trench",
        );
        assert_eq!(outcome, DedupOutcome::Unique);
    }

    #[test]
    fn three_documents_chain_correctly() {
        let mut engine = DeduplicationEngine::new();
        assert_eq!(
            engine.check_and_register("a", "election results announced late last night"),
            DedupOutcome::Unique
        );
        assert_eq!(
            engine.check_and_register("b", "election results announced late last night"),
            DedupOutcome::ExactDuplicate { of_id: "a".to_string() }
        );
        assert_eq!(
            engine.check_and_register("c", "a completely different story about agriculture policy"),
            DedupOutcome::Unique
        );
        // "b" was an exact duplicate, so only the two unique documents (a, c)
        // were fully registered.
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn exact_duplicate_does_not_join_lsh() {
        let mut engine = DeduplicationEngine::new();
        engine.check_and_register("a", "the city council approved a new budget plan on tuesday afternoon");
        engine.check_and_register("b", "the city council approved a new budget plan on tuesday afternoon");
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn near_duplicate_chain_does_not_match_unrelated_text() {
        let mut engine = DeduplicationEngine::new();
        engine.check_and_register(
            "a",
            "the city council approved a new budget plan on tuesday afternoon after weeks of debate",
        );
        let near = engine.check_and_register(
            "b",
            "the city council approved a new budget plan on tuesday evening after weeks of debate",
        );
        assert!(matches!(near, DedupOutcome::NearDuplicate { .. }));

        // "b" registered its hash but never joined the LSH index, so it can't
        // be used as a candidate for a later, unrelated document.
        let outcome = engine.check_and_register(
            "c",
            "researchers discover a new species of deep sea fish near the mariana trench",
        );
        assert_eq!(outcome, DedupOutcome::Unique);
        // Only "a" (unique) and "c" (unique) are fully registered.
        assert_eq!(engine.len(), 2);
    }
}
