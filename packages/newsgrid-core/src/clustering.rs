//! Within-flashpoint article clustering over embedding vectors.
//!
//! Builds a k-nearest-neighbor graph over cosine similarity, unions any pair
//! above a similarity threshold, and returns connected components as
//! clusters, largest first.

use uuid::Uuid;

/// Weighted, path-compressed union-find over a fixed number of elements.
struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// One resulting cluster: a dense-ranked id, its member entries (largest
/// cluster gets id 1), and each member's similarity to the cluster centroid.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub cluster_id: i32,
    pub members: Vec<ClusterMemberResult>,
}

#[derive(Debug, Clone)]
pub struct ClusterMemberResult {
    pub entry_id: Uuid,
    pub similarity_to_centroid: f32,
}

/// Clusters `entry_ids` using their parallel `embeddings` via a kNN graph
/// plus union-find over cosine similarity.
///
/// - `k`: number of nearest neighbors considered per entry.
/// - `cosine_threshold`: minimum cosine similarity for two entries to be
///   unioned into the same cluster.
///
/// Returns clusters sorted by size descending (ties broken by the index of
/// each cluster's first-occurring member, for determinism), each with a
/// dense-ranked `cluster_id` starting at 1. A single entry with no neighbors
/// above threshold forms its own singleton cluster.
///
/// # Panics
///
/// Panics if `entry_ids.len() != embeddings.len()`.
#[must_use]
pub fn cluster_entries(
    entry_ids: &[Uuid],
    embeddings: &[Vec<f32>],
    k: usize,
    cosine_threshold: f32,
) -> Vec<Cluster> {
    assert_eq!(entry_ids.len(), embeddings.len());
    let n = entry_ids.len();

    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![Cluster {
            cluster_id: 1,
            members: vec![ClusterMemberResult {
                entry_id: entry_ids[0],
                similarity_to_centroid: 1.0,
            }],
        }];
    }

    let mut uf = UnionFind::new(n);

    for i in 0..n {
        let mut sims: Vec<(usize, f32)> = (0..n)
            .filter(|&j| j != i)
            .map(|j| (j, cosine_similarity(&embeddings[i], &embeddings[j])))
            .collect();
        sims.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        for &(j, sim) in sims.iter().take(k) {
            if sim >= cosine_threshold {
                uf.union(i, j);
            }
        }
    }

    let mut components: std::collections::HashMap<usize, Vec<usize>> = std::collections::HashMap::new();
    for i in 0..n {
        let root = uf.find(i);
        components.entry(root).or_default().push(i);
    }

    // `indices` is built by iterating i in 0..n, so indices[0] is always the
    // first-occurring member of its component regardless of HashMap order.
    let mut groups: Vec<Vec<usize>> = components.into_values().collect();
    groups.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));

    groups
        .into_iter()
        .enumerate()
        .map(|(rank, indices)| {
            let dim = embeddings[indices[0]].len();
            let mut centroid = vec![0.0f32; dim];
            for &idx in &indices {
                for (c, v) in centroid.iter_mut().zip(&embeddings[idx]) {
                    *c += v;
                }
            }
            let count = indices.len() as f32;
            for c in &mut centroid {
                *c /= count;
            }

            let members = indices
                .iter()
                .map(|&idx| ClusterMemberResult {
                    entry_id: entry_ids[idx],
                    similarity_to_centroid: cosine_similarity(&embeddings[idx], &centroid),
                })
                .collect();

            Cluster {
                cluster_id: rank as i32 + 1,
                members,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid_n(n: u8) -> Uuid {
        Uuid::from_bytes([n; 16])
    }

    #[test]
    fn empty_input_yields_no_clusters() {
        assert!(cluster_entries(&[], &[], 10, 0.65).is_empty());
    }

    #[test]
    fn single_entry_yields_singleton_cluster() {
        let ids = vec![uuid_n(1)];
        let embeddings = vec![vec![1.0, 0.0]];
        let clusters = cluster_entries(&ids, &embeddings, 10, 0.65);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 1);
        assert!((clusters[0].members[0].similarity_to_centroid - 1.0).abs() < 1e-6);
    }

    #[test]
    fn two_similar_vectors_form_one_cluster() {
        let ids = vec![uuid_n(1), uuid_n(2)];
        let embeddings = vec![vec![1.0, 0.0], vec![0.99, 0.01]];
        let clusters = cluster_entries(&ids, &embeddings, 10, 0.65);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 2);
    }

    #[test]
    fn two_orthogonal_vectors_form_separate_clusters() {
        let ids = vec![uuid_n(1), uuid_n(2)];
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let clusters = cluster_entries(&ids, &embeddings, 10, 0.65);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn largest_cluster_gets_id_one() {
        let ids = vec![uuid_n(1), uuid_n(2), uuid_n(3), uuid_n(4)];
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![0.99, 0.01],
            vec![0.98, 0.02],
            vec![0.0, 1.0],
        ];
        let clusters = cluster_entries(&ids, &embeddings, 10, 0.65);
        assert_eq!(clusters[0].cluster_id, 1);
        assert_eq!(clusters[0].members.len(), 3);
        assert_eq!(clusters[1].cluster_id, 2);
        assert_eq!(clusters[1].members.len(), 1);
    }

    #[test]
    fn equal_size_clusters_break_ties_by_first_member_index() {
        // Two independent pairs of identical vectors form two size-2 clusters.
        // The tie must break by first-occurring member index, not HashMap
        // iteration order, so repeated runs over the same input are stable.
        let ids = vec![uuid_n(1), uuid_n(2), uuid_n(3), uuid_n(4)];
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        ];
        let clusters = cluster_entries(&ids, &embeddings, 10, 0.65);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].cluster_id, 1);
        assert!(clusters[0].members.iter().any(|m| m.entry_id == ids[0]));
        assert_eq!(clusters[1].cluster_id, 2);
        assert!(clusters[1].members.iter().any(|m| m.entry_id == ids[2]));
    }
}
