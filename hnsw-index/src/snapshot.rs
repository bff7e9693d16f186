//! Stable snapshot/restore of graph state (§4.F).
//!
//! `GraphSnapshot` is the value both `to_json`/`from_json` (via
//! `serde_json`) and the [`crate::store::GraphStore`] persistence seam
//! (via `bincode`) are built on, mirroring the teacher's `IndexMetadata`
//! pattern of a single serde-derived value shared across encodings.

use serde::{Deserialize, Serialize};

use crate::metric::Metric;

/// A single node's persisted state: id, level, vector, and every layer's
/// adjacency list in stored (already invariant-preserving) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: u64,
    pub level: usize,
    pub vector: Vec<f32>,
    pub neighbors: Vec<Vec<u64>>,
}

/// The full graph state. `ef_search`, `metric`, and `dimension` are
/// `Option` so an older snapshot missing them restores using
/// [`crate::config::GraphConfig`]'s defaults rather than failing to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub m: usize,
    pub ef_construction: usize,
    #[serde(default)]
    pub ef_search: Option<usize>,
    #[serde(default)]
    pub metric: Option<Metric>,
    #[serde(default)]
    pub dimension: Option<usize>,
    pub level_max: isize,
    pub entry_point_id: Option<u64>,
    pub nodes: Vec<NodeSnapshot>,
}
