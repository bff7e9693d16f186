//! In-memory Hierarchical Navigable Small World (HNSW) approximate
//! nearest neighbor index.
//!
//! Given a stream of `(id, vector)` insertions, [`Graph`] builds a
//! multi-layer proximity graph supporting sub-linear k-NN queries under a
//! configurable similarity metric, trading recall for latency via
//! `ef_construction`/`ef_search`.
//!
//! # Example
//!
//! ```rust
//! use hnsw_index::{Graph, GraphConfig, Metric};
//!
//! # fn example() -> hnsw_index::Result<()> {
//! let config = GraphConfig::default().with_metric(Metric::Cosine);
//! let mut graph = Graph::new(config)?;
//!
//! graph.add_point(1, vec![1.0, 0.0, 0.0])?;
//! graph.add_point(2, vec![0.9, 0.1, 0.0])?;
//!
//! let hits = graph.search_knn(&[1.0, 0.0, 0.0], 1, None)?;
//! assert_eq!(hits[0].id, 1);
//! # Ok(())
//! # }
//! ```
//!
//! Deletion and concurrent insertion are out of scope: the graph is built
//! by a single logical writer, and points are immutable once inserted.

mod config;
mod error;
mod graph;
mod heap;
mod level;
mod metric;
mod node;
mod snapshot;
mod store;

pub use config::GraphConfig;
pub use error::{GraphError, Result};
pub use graph::{Graph, SearchHit};
pub use level::{ExponentialLevelSampler, FixedLevelSampler, LevelSampler};
pub use metric::Metric;
pub use snapshot::{GraphSnapshot, NodeSnapshot};
pub use store::{FileGraphStore, GraphStore, ManagedGraph};
