//! Brute-force exact k-NN, used only as ground truth for recall@k — the
//! core crate deliberately has no exact-search code path (Non-goal), so
//! this lives entirely in the harness.

use hnsw_index::Metric;
use std::collections::HashSet;

/// Scans every `(id, vector)` pair and returns the `k` highest-scoring
/// ids against `query`, descending.
pub fn brute_force_knn(data: &[(u64, Vec<f32>)], query: &[f32], k: usize, metric: Metric) -> Vec<u64> {
    let mut scored: Vec<(u64, f32)> = data
        .iter()
        .map(|(id, v)| (*id, metric.score(query, v)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(k).map(|(id, _)| id).collect()
}

/// Fraction of `ground_truth` recovered by `approx`, in `[0, 1]`.
pub fn recall_at_k(approx: &[u64], ground_truth: &[u64]) -> f64 {
    if ground_truth.is_empty() {
        return 1.0;
    }
    let truth: HashSet<u64> = ground_truth.iter().copied().collect();
    let hits = approx.iter().filter(|id| truth.contains(id)).count();
    hits as f64 / ground_truth.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brute_force_ranks_closest_first() {
        let data = vec![
            (1, vec![1.0, 0.0]),
            (2, vec![0.0, 1.0]),
            (3, vec![0.9, 0.1]),
        ];
        let result = brute_force_knn(&data, &[1.0, 0.0], 2, Metric::Cosine);
        assert_eq!(result, vec![1, 3]);
    }

    #[test]
    fn recall_counts_overlap_fraction() {
        assert_eq!(recall_at_k(&[1, 2, 3], &[1, 2, 3]), 1.0);
        assert_eq!(recall_at_k(&[1, 5, 9], &[1, 2, 3]), 1.0 / 3.0);
        assert_eq!(recall_at_k(&[], &[1, 2, 3]), 0.0);
    }

    #[test]
    fn recall_against_empty_ground_truth_is_perfect() {
        assert_eq!(recall_at_k(&[1, 2], &[]), 1.0);
    }
}
