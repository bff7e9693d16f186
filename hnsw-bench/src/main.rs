//! CLI benchmark harness for `hnsw-index` (SPEC_FULL §6, component K).
//!
//! Builds a [`hnsw_index::Graph`] over a dataset — either a real
//! fvecs/ivecs corpus or a synthetic one generated on the fly — times
//! construction and query latency, computes recall@k against a
//! brute-force baseline computed here (never inside the core crate),
//! and prints a JSON report. Exercises the core; contributes nothing to
//! its algorithmic surface.

mod bruteforce;
mod fvecs;
mod report;
mod synthetic;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use hnsw_index::{Graph, GraphConfig, Metric};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bruteforce::{brute_force_knn, recall_at_k};
use report::{percentiles, BenchReport};

#[derive(Parser)]
#[command(name = "hnsw-bench", about = "Build/query benchmarks for hnsw-index", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark against a synthetic, randomly generated dataset.
    Synthetic {
        /// Number of points to insert.
        #[arg(long, default_value_t = 10_000)]
        count: usize,
        /// Number of query vectors to draw from the same distribution.
        #[arg(long, default_value_t = 100)]
        queries: usize,
        /// Vector dimensionality.
        #[arg(long, default_value_t = 128)]
        dim: usize,
        #[command(flatten)]
        index: IndexArgs,
        /// RNG seed, for reproducible datasets across runs.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Benchmark against a real fvecs dataset, with an optional fvecs
    /// query file and ivecs ground-truth file for recall@k.
    Fvecs {
        /// Path to the base dataset (`.fvecs`).
        #[arg(long)]
        base: PathBuf,
        /// Path to query vectors (`.fvecs`); defaults to the first
        /// `queries` base vectors when omitted.
        #[arg(long)]
        query: Option<PathBuf>,
        /// Path to precomputed ground truth (`.ivecs`); computed via
        /// brute force when omitted.
        #[arg(long)]
        ground_truth: Option<PathBuf>,
        /// Number of query vectors to evaluate when `--query` is omitted.
        #[arg(long, default_value_t = 100)]
        queries: usize,
        #[command(flatten)]
        index: IndexArgs,
    },
}

#[derive(Args)]
struct IndexArgs {
    /// Max neighbors per node per layer.
    #[arg(long, default_value_t = 16)]
    m: usize,
    /// Beam width used during insertion.
    #[arg(long, default_value_t = 200)]
    ef_construction: usize,
    /// Default beam width used at query time.
    #[arg(long, default_value_t = 50)]
    ef_search: usize,
    /// Number of neighbors to retrieve per query.
    #[arg(long, default_value_t = 10)]
    k: usize,
    /// Similarity metric: `cosine` or `euclidean`.
    #[arg(long, default_value = "cosine")]
    metric: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hnsw_bench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let report = match cli.command {
        Commands::Synthetic {
            count,
            queries,
            dim,
            index,
            seed,
        } => {
            tracing::info!(count, dim, queries, "generating synthetic dataset");
            let data = synthetic::random_vectors(count, dim, seed);
            let query_vectors = synthetic::random_vectors(queries, dim, seed.wrapping_add(1));
            run_bench(data, query_vectors, index)?
        }
        Commands::Fvecs {
            base,
            query,
            ground_truth,
            queries,
            index,
        } => {
            tracing::info!(path = %base.display(), "loading base dataset");
            let base_vectors = fvecs::read_fvecs(&base)?;
            let query_vectors = match query {
                Some(path) => fvecs::read_fvecs(&path)?,
                None => base_vectors.iter().take(queries).cloned().collect(),
            };
            let data: Vec<(u64, Vec<f32>)> = base_vectors
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i as u64, v))
                .collect();

            let precomputed_truth = match ground_truth {
                Some(path) => Some(fvecs::read_ivecs(&path)?),
                None => None,
            };
            run_bench_with_truth(data, query_vectors, precomputed_truth, index)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_bench(data: Vec<(u64, Vec<f32>)>, query_vectors: Vec<Vec<f32>>, index: IndexArgs) -> anyhow::Result<BenchReport> {
    run_bench_with_truth(data, query_vectors, None, index)
}

/// Shared build/query/recall pipeline for both subcommands.
///
/// `precomputed_truth[i]` (if present) is interpreted as ids for
/// `query_vectors[i]`; otherwise ground truth is computed by brute force
/// against `data`, as the spec's bench harness is responsible for.
fn run_bench_with_truth(
    data: Vec<(u64, Vec<f32>)>,
    query_vectors: Vec<Vec<f32>>,
    precomputed_truth: Option<Vec<Vec<i32>>>,
    index: IndexArgs,
) -> anyhow::Result<BenchReport> {
    let metric = Metric::from_str(&index.metric).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let dimension = data.first().map(|(_, v)| v.len()).unwrap_or(0);

    let config = GraphConfig::default()
        .with_m(index.m)
        .with_ef_construction(index.ef_construction)
        .with_ef_search(index.ef_search)
        .with_metric(metric);
    let mut graph = Graph::new(config)?;

    let dataset_size = data.len();
    tracing::info!(dataset_size, "building index");
    let build_started = Instant::now();
    graph.build_index(data.clone(), dataset_size.max(1), |current, total| {
        tracing::debug!(current, total, "build progress");
    })?;
    let build_time_ms = build_started.elapsed().as_secs_f64() * 1_000.0;

    let mut latencies_ms = Vec::with_capacity(query_vectors.len());
    let mut recalls = Vec::with_capacity(query_vectors.len());

    for (i, query) in query_vectors.iter().enumerate() {
        let started = Instant::now();
        let hits = graph.search_knn(query, index.k, None)?;
        latencies_ms.push(started.elapsed().as_secs_f64() * 1_000.0);

        let approx_ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        let ground_truth: Vec<u64> = match &precomputed_truth {
            Some(truth) => truth
                .get(i)
                .map(|ids| ids.iter().take(index.k).map(|&id| id as u64).collect())
                .unwrap_or_default(),
            None => brute_force_knn(&data, query, index.k, metric),
        };
        recalls.push(recall_at_k(&approx_ids, &ground_truth));
    }

    let recall_at_k = if recalls.is_empty() {
        0.0
    } else {
        recalls.iter().sum::<f64>() / recalls.len() as f64
    };

    Ok(BenchReport {
        dataset_size,
        dimension,
        m: index.m,
        ef_construction: index.ef_construction,
        ef_search: index.ef_search,
        metric: index.metric,
        k: index.k,
        build_time_ms,
        query_latency: percentiles(&mut latencies_ms),
        recall_at_k,
    })
}
