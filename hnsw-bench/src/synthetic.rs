//! Synthetic dataset generation, for benchmarking without a real
//! fvecs/ivecs corpus on disk.
//!
//! Grounded in the pack's convention of seeding small-scale test data
//! through an injectable RNG (same seam as `hnsw_index::LevelSampler`);
//! a fixed seed makes `hnsw-bench --synthetic` runs reproducible across
//! invocations, which matters for comparing two builds of the index.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws `count` random vectors of `dim` dimensions, uniform in `[-1, 1)`.
pub fn random_vectors(count: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_the_same_dataset() {
        let a = random_vectors(10, 4, 42);
        let b = random_vectors(10, 4, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_diverge() {
        let a = random_vectors(10, 4, 1);
        let b = random_vectors(10, 4, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn shape_matches_request() {
        let data = random_vectors(5, 8, 7);
        assert_eq!(data.len(), 5);
        assert!(data.iter().all(|v| v.len() == 8));
    }
}
