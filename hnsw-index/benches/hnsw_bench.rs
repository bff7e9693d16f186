//! Criterion micro-benchmarks for insertion and query latency.
//!
//! Grounded in `examples/deven96-ahnlich/ahnlich/similarity/benches/hnsw_bench.rs`'s
//! `bench_hnsw_insert`/`bench_hnsw_incremental_insert`/`bench_search_layer`
//! shape, adapted to this crate's `Graph`/`GraphConfig` API and to a
//! synthetic dataset (no fvecs fixtures ship with this crate — the
//! `hnsw-bench` CLI crate is where real datasets are loaded).

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hnsw_index::{Graph, GraphConfig, Metric};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DIM: usize = 64;
const DATASET_SIZE: usize = 2_000;

fn synthetic_dataset(count: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect())
        .collect()
}

fn build_graph(config: &GraphConfig, dataset: &[Vec<f32>]) -> Graph {
    let mut graph = Graph::new(config.clone()).unwrap();
    for (id, vector) in dataset.iter().enumerate() {
        graph.add_point(id as u64, vector.clone()).unwrap();
    }
    graph
}

fn bench_insert(c: &mut Criterion) {
    let dataset = synthetic_dataset(DATASET_SIZE, DIM, 1);
    let config = GraphConfig::default()
        .with_m(16)
        .with_ef_construction(100)
        .with_metric(Metric::Euclidean);

    c.bench_function("hnsw_insert_2k_synthetic", |b| {
        b.iter(|| build_graph(&config, &dataset))
    });
}

fn bench_incremental_insert(c: &mut Criterion) {
    let dataset = synthetic_dataset(DATASET_SIZE, DIM, 1);
    let query = synthetic_dataset(1, DIM, 2).remove(0);
    let config = GraphConfig::default()
        .with_m(16)
        .with_ef_construction(100)
        .with_metric(Metric::Euclidean);

    c.bench_function("hnsw_incremental_insert", |b| {
        b.iter_batched(
            || build_graph(&config, &dataset),
            |mut graph| {
                graph
                    .add_point(DATASET_SIZE as u64, black_box(query.clone()))
                    .unwrap();
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_search_knn(c: &mut Criterion) {
    let dataset = synthetic_dataset(DATASET_SIZE, DIM, 1);
    let query = synthetic_dataset(1, DIM, 3).remove(0);
    let config = GraphConfig::default()
        .with_m(16)
        .with_ef_construction(100)
        .with_ef_search(50)
        .with_metric(Metric::Euclidean);
    let graph = build_graph(&config, &dataset);

    c.bench_function("hnsw_search_k10", |b| {
        b.iter(|| graph.search_knn(black_box(&query), 10, None).unwrap())
    });
}

criterion_group!(benches, bench_insert, bench_incremental_insert, bench_search_knn);
criterion_main!(benches);
