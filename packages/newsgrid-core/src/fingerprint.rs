//! Content hashing and MinHash signature computation for near-duplicate
//! detection.

use sha2::{Digest, Sha256};

use crate::text::{normalize_text, word_shingles};

/// Number of independent hash functions in a MinHash signature. Larger values
/// give a tighter Jaccard similarity estimate at the cost of more work per
/// document. Matches the `MINHASH_NUM_PERM` default used elsewhere.
pub const NUM_HASHES: usize = 128;

/// Shingle size (in words) used to build the MinHash input set.
pub const SHINGLE_SIZE: usize = 3;

/// SHA-256 hex digest of the normalized text. Two documents with an identical
/// content hash are treated as exact duplicates regardless of surface
/// formatting differences.
#[must_use]
pub fn compute_content_hash(text: &str) -> String {
    let normalized = normalize_text(text);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// A MinHash signature: `NUM_HASHES` minimum hash values over the document's
/// shingle set, used to estimate Jaccard similarity between documents without
/// storing the full shingle sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinHashSignature(pub [u64; NUM_HASHES]);

impl MinHashSignature {
    /// Computes a MinHash signature over the word-level shingles of `text`.
    ///
    /// Each of the `NUM_HASHES` hash functions is a distinct affine
    /// transform `(a * h + b) mod PRIME` of a base 64-bit hash of the
    /// shingle, seeded deterministically by hash-function index so that two
    /// runs over the same text produce identical signatures.
    #[must_use]
    pub fn compute(text: &str) -> Self {
        let normalized = normalize_text(text);
        let shingles = word_shingles(&normalized, SHINGLE_SIZE);
        Self::from_shingles(&shingles)
    }

    /// Computes a signature directly from a pre-built shingle set. Exposed so
    /// callers that already have shingles (e.g. test fixtures) can skip
    /// normalization.
    #[must_use]
    pub fn from_shingles(shingles: &[String]) -> Self {
        const PRIME: u64 = 0xFFFF_FFFF_FFFF_FFC5; // largest 64-bit prime below 2^64

        let mut sig = [u64::MAX; NUM_HASHES];
        if shingles.is_empty() {
            return Self(sig);
        }

        for shingle in shingles {
            let base = fnv1a64(shingle.as_bytes());
            for (i, slot) in sig.iter_mut().enumerate() {
                let (a, b) = hash_coeffs(i);
                let h = (a.wrapping_mul(base).wrapping_add(b)) % PRIME;
                if h < *slot {
                    *slot = h;
                }
            }
        }
        Self(sig)
    }

    /// Estimated Jaccard similarity between two documents: the fraction of
    /// hash slots where the two signatures agree.
    #[must_use]
    pub fn estimated_jaccard(&self, other: &Self) -> f64 {
        let matches = self
            .0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a == b)
            .count();
        matches as f64 / NUM_HASHES as f64
    }
}

/// Derives deterministic per-hash-function coefficients from the index so
/// `NUM_HASHES` affine transforms are fixed across the process lifetime.
fn hash_coeffs(index: usize) -> (u64, u64) {
    let a = fnv1a64(format!("minhash-a-{index}").as_bytes()) | 1; // ensure odd, nonzero
    let b = fnv1a64(format!("minhash-b-{index}").as_bytes());
    (a, b)
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01B3;
    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        let a = compute_content_hash("Hello, World!");
        let b = compute_content_hash("Hello, World!");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_normalizes_before_hashing() {
        let a = compute_content_hash("Hello,   World!!");
        let b = compute_content_hash("hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_differs_for_different_text() {
        let a = compute_content_hash("the quick brown fox");
        let b = compute_content_hash("a slow red fox");
        assert_ne!(a, b);
    }

    #[test]
    fn minhash_identical_text_has_jaccard_one() {
        let sig1 = MinHashSignature::compute("the quick brown fox jumps over the lazy dog");
        let sig2 = MinHashSignature::compute("the quick brown fox jumps over the lazy dog");
        assert!((sig1.estimated_jaccard(&sig2) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn minhash_similar_text_has_high_jaccard() {
        let sig1 = MinHashSignature::compute(
            "the city council approved a new budget plan on tuesday afternoon",
        );
        let sig2 = MinHashSignature::compute(
            "the city council approved a new budget plan on tuesday evening",
        );
        let sim = sig1.estimated_jaccard(&sig2);
        assert!(sim > 0.6, "expected high similarity, got {sim}");
    }

    #[test]
    fn minhash_unrelated_text_has_low_jaccard() {
        let sig1 = MinHashSignature::compute("stock markets rallied after the earnings report");
        let sig2 = MinHashSignature::compute("researchers discover a new species of deep sea fish");
        let sim = sig1.estimated_jaccard(&sig2);
        assert!(sim < 0.3, "expected low similarity, got {sim}");
    }
}
