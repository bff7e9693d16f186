//! JSON report shape emitted by the CLI (SPEC_FULL §6: "a CLI produces
//! JSON reports of build time, query latency percentiles, and recall@k
//! vs brute force").

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LatencyReport {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub dataset_size: usize,
    pub dimension: usize,
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub metric: String,
    pub k: usize,
    pub build_time_ms: f64,
    pub query_latency: LatencyReport,
    pub recall_at_k: f64,
}

/// Computes p50/p95/p99 from a set of per-query latencies, in milliseconds.
/// `samples` need not be pre-sorted.
pub fn percentiles(samples: &mut [f64]) -> LatencyReport {
    if samples.is_empty() {
        return LatencyReport {
            p50_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
        };
    }
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pick = |q: f64| -> f64 {
        let idx = ((samples.len() as f64 - 1.0) * q).round() as usize;
        samples[idx.min(samples.len() - 1)]
    };
    LatencyReport {
        p50_ms: pick(0.50),
        p95_ms: pick(0.95),
        p99_ms: pick(0.99),
    }
}
