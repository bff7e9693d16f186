//! Per-point storage: id, assigned top layer, vector payload, adjacency.

use serde::{Deserialize, Serialize};

/// A single point in the graph.
///
/// `id` and `vector` are fixed at construction; `neighbors` is the only
/// field the insertion procedure ever mutates, and only through
/// [`crate::graph::Graph`]'s linking step. A layer's neighbor list is
/// not kept in any particular score order: edges are appended as they
/// are installed, and an overflow past `M` is resolved by re-running
/// the neighbor-selection heuristic over the whole list rather than
/// dropping the tail entry (§4.E.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    pub level: usize,
    pub vector: Vec<f32>,
    neighbors: Vec<Vec<u64>>,
}

impl Node {
    /// Creates a node present on layers `0..=level`, with empty adjacency
    /// lists at every layer.
    pub fn new(id: u64, level: usize, vector: Vec<f32>) -> Self {
        Self {
            id,
            level,
            vector,
            neighbors: vec![Vec::new(); level + 1],
        }
    }

    #[inline]
    pub fn neighbors(&self, layer: usize) -> &[u64] {
        &self.neighbors[layer]
    }

    #[inline]
    pub fn neighbors_mut(&mut self, layer: usize) -> &mut Vec<u64> {
        &mut self.neighbors[layer]
    }

    pub fn set_neighbors(&mut self, layer: usize, ids: Vec<u64>) {
        self.neighbors[layer] = ids;
    }

    /// All per-layer adjacency lists, layer 0 first.
    pub fn all_neighbors(&self) -> &[Vec<u64>] {
        &self.neighbors
    }

    /// Rebuilds a node from its stored adjacency lists (used by snapshot
    /// restore, where edges are already known-good and need no relinking).
    pub fn from_parts(id: u64, level: usize, vector: Vec<f32>, neighbors: Vec<Vec<u64>>) -> Self {
        Self {
            id,
            level,
            vector,
            neighbors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_allocates_one_adjacency_list_per_layer() {
        let n = Node::new(7, 2, vec![1.0, 2.0]);
        assert_eq!(n.all_neighbors().len(), 3);
        assert!(n.neighbors(0).is_empty());
        assert!(n.neighbors(2).is_empty());
    }

    #[test]
    fn set_neighbors_replaces_a_single_layer() {
        let mut n = Node::new(1, 1, vec![0.0]);
        n.set_neighbors(0, vec![2, 3]);
        assert_eq!(n.neighbors(0), &[2, 3]);
        assert!(n.neighbors(1).is_empty());
    }
}
