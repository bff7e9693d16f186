//! The HNSW index itself (§4.E): owns nodes, entry point, level cap;
//! implements greedy descent, layer beam search, the diversity-preserving
//! neighbor-selection heuristic, bidirectional linking with pruning, and
//! the public insert/query/snapshot/restore surface.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::heap::{BestHeap, CandidateHeap};
use crate::level::{ExponentialLevelSampler, LevelSampler};
use crate::metric::Metric;
use crate::node::Node;
use crate::snapshot::{GraphSnapshot, NodeSnapshot};

/// A single k-NN result, sorted descending by score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: u64,
    pub score: f32,
}

/// The in-memory HNSW graph.
pub struct Graph {
    nodes: HashMap<u64, Node>,
    m: usize,
    ef_construction: usize,
    ef_search: usize,
    metric: Metric,
    dimension: Option<usize>,
    entry_point_id: Option<u64>,
    level_max: isize,
    sampler: Box<dyn LevelSampler>,
}

impl Graph {
    /// Builds an empty graph with a real, non-deterministic level sampler.
    #[instrument(skip(config), fields(m = config.m, ef_construction = config.ef_construction))]
    pub fn new(config: GraphConfig) -> Result<Self> {
        let config = config.validated()?;
        let sampler = Box::new(ExponentialLevelSampler::new(config.m));
        Self::with_sampler(config, sampler)
    }

    /// Builds an empty graph with a caller-supplied level sampler — the
    /// determinism seam §4.D and §8 require for reproducible tests.
    pub fn with_sampler(config: GraphConfig, sampler: Box<dyn LevelSampler>) -> Result<Self> {
        let config = config.validated()?;
        Ok(Self {
            nodes: HashMap::new(),
            m: config.m,
            ef_construction: config.ef_construction,
            ef_search: config.ef_search,
            metric: config.metric,
            dimension: config.dimension,
            entry_point_id: None,
            level_max: -1,
            sampler,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn entry_point_id(&self) -> Option<u64> {
        self.entry_point_id
    }

    pub fn level_max(&self) -> isize {
        self.level_max
    }

    /// Inserts a point. Fails with [`GraphError::DuplicateId`] if `id` is
    /// already present or [`GraphError::DimensionMismatch`] if `vector`
    /// disagrees with the graph's fixed dimension.
    #[instrument(skip(self, vector), fields(id))]
    pub fn add_point(&mut self, id: u64, vector: Vec<f32>) -> Result<()> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateId(id));
        }

        match self.dimension {
            Some(d) if d != vector.len() => {
                return Err(GraphError::DimensionMismatch {
                    expected: d,
                    actual: vector.len(),
                });
            }
            None => self.dimension = Some(vector.len()),
            _ => {}
        }

        let node_level = self.sampler.sample();

        if self.nodes.is_empty() {
            trace!(node_level, "first point, seeding entry point");
            self.nodes.insert(id, Node::new(id, node_level, vector));
            self.entry_point_id = Some(id);
            self.level_max = node_level as isize;
            return Ok(());
        }

        let mut ep = self
            .entry_point_id
            .ok_or_else(|| GraphError::Corrupt("graph has nodes but no entry point".into()))?;

        let mut layer = self.level_max;
        while layer > node_level as isize {
            ep = self.greedy_descent(&vector, ep, layer as usize)?;
            layer -= 1;
        }

        self.nodes
            .insert(id, Node::new(id, node_level, vector.clone()));

        let start_layer = (node_level as isize).min(self.level_max).max(0) as usize;
        for layer in (0..=start_layer).rev() {
            let candidates = self.search_layer(&vector, ep, layer, self.ef_construction)?;
            let candidate_ids: Vec<u64> = candidates
                .iter()
                .map(|&(cid, _)| cid)
                .filter(|&cid| cid != id)
                .collect();

            if let Some(&(top_id, _)) = candidates.first() {
                ep = top_id;
            }

            let selected = self.select_neighbors_heuristic(&vector, candidate_ids, self.m)?;
            for (nid, _) in selected {
                self.link(id, nid, layer)?;
            }
        }

        if node_level as isize > self.level_max {
            debug!(new_level_max = node_level, "promoting entry point");
            self.level_max = node_level as isize;
            self.entry_point_id = Some(id);
        }

        Ok(())
    }

    /// Clears the graph and re-inserts `data` in order. `on_progress` is
    /// invoked every `progress_interval` insertions and once more at
    /// completion (never twice for the same count).
    pub fn build_index(
        &mut self,
        data: Vec<(u64, Vec<f32>)>,
        progress_interval: usize,
        mut on_progress: impl FnMut(usize, usize),
    ) -> Result<()> {
        self.nodes.clear();
        self.level_max = -1;
        self.entry_point_id = None;
        self.dimension = None;

        let total = data.len();
        let mut last_reported = 0usize;
        for (i, (id, vector)) in data.into_iter().enumerate() {
            self.add_point(id, vector)?;
            let current = i + 1;
            if progress_interval > 0 && current % progress_interval == 0 {
                on_progress(current, total);
                last_reported = current;
            }
        }
        if last_reported != total {
            on_progress(total, total);
        }
        Ok(())
    }

    /// Returns at most `k` results sorted descending by score. Empty graph
    /// or `k == 0` returns an empty vec, never an error.
    #[instrument(skip(self, query))]
    pub fn search_knn(
        &self,
        query: &[f32],
        k: usize,
        ef_search_override: Option<usize>,
    ) -> Result<Vec<SearchHit>> {
        if self.nodes.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if self.nodes.len() == 1 {
            let entry_id = self.entry_point_id.ok_or_else(|| {
                GraphError::Corrupt("graph has one node but no entry point".into())
            })?;
            let score = self.score_against(query, entry_id)?;
            return Ok(vec![SearchHit {
                id: entry_id,
                score,
            }]);
        }

        let mut ep = self
            .entry_point_id
            .ok_or_else(|| GraphError::Corrupt("graph is non-empty but has no entry point".into()))?;

        let mut layer = self.level_max;
        while layer > 0 {
            ep = self.greedy_descent(query, ep, layer as usize)?;
            layer -= 1;
        }

        let ef = ef_search_override.unwrap_or(self.ef_search).max(k);
        let candidates = self.search_layer(query, ep, 0, ef)?;

        let mut seen = HashSet::with_capacity(k);
        let mut results = Vec::with_capacity(k.min(candidates.len()));
        for (id, score) in candidates {
            if seen.insert(id) {
                results.push(SearchHit { id, score });
                if results.len() == k {
                    break;
                }
            }
        }
        Ok(results)
    }

    /// Captures the full graph state for persistence (§4.F).
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<NodeSnapshot> = self
            .nodes
            .values()
            .map(|n| NodeSnapshot {
                id: n.id,
                level: n.level,
                vector: n.vector.clone(),
                neighbors: n.all_neighbors().to_vec(),
            })
            .collect();
        nodes.sort_by_key(|n| n.id);

        GraphSnapshot {
            m: self.m,
            ef_construction: self.ef_construction,
            ef_search: Some(self.ef_search),
            metric: Some(self.metric),
            dimension: self.dimension,
            level_max: self.level_max,
            entry_point_id: self.entry_point_id,
            nodes,
        }
    }

    /// Rebuilds a graph from a snapshot with no re-indexing; invariants
    /// are satisfied immediately since the stored adjacency is trusted.
    /// Missing `ef_search`/`metric`/`dimension` default to [`GraphConfig`]'s
    /// constructor defaults, matching the back-compat seam in §4.F.
    pub fn restore(snapshot: GraphSnapshot) -> Result<Self> {
        let defaults = GraphConfig::default();
        let mut nodes = HashMap::with_capacity(snapshot.nodes.len());
        for n in snapshot.nodes {
            nodes.insert(
                n.id,
                Node::from_parts(n.id, n.level, n.vector, n.neighbors),
            );
        }

        Ok(Self {
            nodes,
            m: snapshot.m,
            ef_construction: snapshot.ef_construction,
            ef_search: snapshot.ef_search.unwrap_or(defaults.ef_search),
            metric: snapshot.metric.unwrap_or(defaults.metric),
            dimension: snapshot.dimension,
            entry_point_id: snapshot.entry_point_id,
            level_max: snapshot.level_max,
            sampler: Box::new(ExponentialLevelSampler::new(snapshot.m)),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.snapshot()).map_err(|e| GraphError::Serialization(e.to_string()))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let snapshot: GraphSnapshot =
            serde_json::from_str(s).map_err(|e| GraphError::Serialization(e.to_string()))?;
        Self::restore(snapshot)
    }

    // --- internal algorithm ---

    fn get_node(&self, id: u64) -> Result<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| GraphError::Corrupt(format!("neighbor id {id} missing from node map")))
    }

    fn get_node_mut(&mut self, id: u64) -> Result<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| GraphError::Corrupt(format!("neighbor id {id} missing from node map")))
    }

    fn score_against(&self, query: &[f32], id: u64) -> Result<f32> {
        let node = self.get_node(id)?;
        Ok(self.metric.score(query, &node.vector))
    }

    /// Repeatedly replaces `ep` with its highest-scoring neighbor on
    /// `layer` as long as the score strictly improves, terminating at a
    /// local maximum (§4.E.1 step 3).
    fn greedy_descent(&self, query: &[f32], start: u64, layer: usize) -> Result<u64> {
        let mut current = start;
        let mut current_score = self.score_against(query, current)?;
        loop {
            let node = self.get_node(current)?;
            if layer > node.level {
                return Err(GraphError::Corrupt(format!(
                    "greedy descent visited node {current} absent from layer {layer}"
                )));
            }
            let mut best: Option<(u64, f32)> = None;
            for &nid in node.neighbors(layer) {
                let s = self.score_against(query, nid)?;
                if s > current_score && best.map(|(_, bs)| s > bs).unwrap_or(true) {
                    best = Some((nid, s));
                }
            }
            match best {
                Some((nid, s)) => {
                    current = nid;
                    current_score = s;
                }
                None => break,
            }
        }
        Ok(current)
    }

    /// Layer beam search (§4.E.2): expands from `ep` at `layer`, returning
    /// up to `ef` nodes sorted descending by score against `query`.
    fn search_layer(
        &self,
        query: &[f32],
        ep: u64,
        layer: usize,
        ef: usize,
    ) -> Result<Vec<(u64, f32)>> {
        let mut visited = HashSet::new();
        visited.insert(ep);

        let ep_score = self.score_against(query, ep)?;
        let mut candidates: CandidateHeap<u64> = CandidateHeap::new();
        let mut best: BestHeap<u64> = BestHeap::new();
        candidates.push(ep, ep_score);
        best.push(ep, ep_score);

        while let Some((c, c_score)) = candidates.pop() {
            if best.len() >= ef {
                if let Some((_, worst)) = best.peek() {
                    if c_score < worst {
                        break;
                    }
                }
            }

            let node = self.get_node(c)?;
            if layer > node.level {
                continue;
            }
            let neighbor_ids: Vec<u64> = node.neighbors(layer).to_vec();
            for n in neighbor_ids {
                if !visited.insert(n) {
                    continue;
                }
                let s = self.score_against(query, n)?;
                let worst = best.peek().map(|(_, s)| s);
                let admit = best.len() < ef || worst.map(|w| s > w).unwrap_or(true);
                if admit {
                    candidates.push(n, s);
                    best.push(n, s);
                    if best.len() > ef {
                        best.pop();
                    }
                }
            }
        }

        Ok(best.into_sorted_desc())
    }

    /// Neighbor-selection heuristic (§4.E.3): processes `candidate_ids`
    /// descending by `score(pivot, c)`, admitting `c` only if every
    /// already-selected neighbor is no closer to `c` than the pivot is.
    fn select_neighbors_heuristic(
        &self,
        pivot: &[f32],
        candidate_ids: Vec<u64>,
        m: usize,
    ) -> Result<Vec<(u64, f32)>> {
        let mut scored: Vec<(u64, f32)> = candidate_ids
            .into_iter()
            .map(|cid| {
                let v = &self.get_node(cid)?.vector;
                Ok((cid, self.metric.score(pivot, v)))
            })
            .collect::<Result<_>>()?;
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut selected: Vec<(u64, f32)> = Vec::with_capacity(m.min(scored.len()));
        for (cid, c_score) in scored {
            if selected.len() >= m {
                break;
            }
            let c_vector = self.get_node(cid)?.vector.clone();
            let mut admit = true;
            for &(sid, _) in &selected {
                let s_vector = &self.get_node(sid)?.vector;
                if self.metric.score(&c_vector, s_vector) > c_score {
                    admit = false;
                    break;
                }
            }
            if admit {
                selected.push((cid, c_score));
            }
        }
        Ok(selected)
    }

    /// Installs a bidirectional edge between `a` and `b` at `layer`,
    /// pruning either side back down to `m` via the heuristic if the edge
    /// pushes it over the cap, and removing the reciprocal back-pointer
    /// for anything dropped (§4.E.4 — the only path that removes an edge).
    fn link(&mut self, a: u64, b: u64, layer: usize) -> Result<()> {
        self.insert_edge(a, b, layer)?;
        self.insert_edge(b, a, layer)?;
        Ok(())
    }

    fn insert_edge(&mut self, n: u64, b: u64, layer: usize) -> Result<()> {
        let m = self.m;
        {
            let node = self.get_node_mut(n)?;
            if layer > node.level {
                return Err(GraphError::Corrupt(format!(
                    "cannot link node {n} at layer {layer} above its own level"
                )));
            }
            let neighbors = node.neighbors_mut(layer);
            if let Some(pos) = neighbors.iter().position(|&x| x == b) {
                neighbors.remove(pos);
            }
            neighbors.push(b);
            if neighbors.len() <= m {
                return Ok(());
            }
        }

        let (candidate_ids, pivot_vector) = {
            let node = self.get_node(n)?;
            (node.neighbors(layer).to_vec(), node.vector.clone())
        };
        let selected = self.select_neighbors_heuristic(&pivot_vector, candidate_ids, m)?;
        let kept: HashSet<u64> = selected.iter().map(|&(id, _)| id).collect();

        let node = self.get_node_mut(n)?;
        let dropped: Vec<u64> = node
            .neighbors(layer)
            .iter()
            .copied()
            .filter(|id| !kept.contains(id))
            .collect();
        node.set_neighbors(layer, selected.into_iter().map(|(id, _)| id).collect());

        for dropped_id in dropped {
            warn!(n, dropped_id, layer, "pruning overflowed neighbor list");
            self.remove_back_pointer(dropped_id, n, layer)?;
        }
        Ok(())
    }

    fn remove_back_pointer(&mut self, holder: u64, target: u64, layer: usize) -> Result<()> {
        let node = self.get_node_mut(holder)?;
        if layer <= node.level {
            node.neighbors_mut(layer).retain(|&x| x != target);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::FixedLevelSampler;

    fn graph_with_levels(m: usize, metric: Metric, levels: impl IntoIterator<Item = usize>) -> Graph {
        let config = GraphConfig::default().with_m(m).with_metric(metric);
        Graph::with_sampler(config, Box::new(FixedLevelSampler::new(levels))).unwrap()
    }

    // Scenario 1: cosine ranking.
    #[test]
    fn cosine_ranking_scenario() {
        let mut g = graph_with_levels(16, Metric::Cosine, std::iter::repeat(0));
        g.add_point(1, vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        g.add_point(2, vec![2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        g.add_point(3, vec![3.0, 4.0, 5.0, 6.0, 7.0]).unwrap();
        g.add_point(4, vec![4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        g.add_point(5, vec![5.0, 6.0, 7.0, 8.0, 9.0]).unwrap();

        let results = g.search_knn(&[3.0, 4.0, 5.0, 6.0, 7.0], 3, None).unwrap();
        let ids: Vec<u64> = results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 4, 2]);
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }

    // Scenario 3: entry-point promotion.
    #[test]
    fn entry_point_promotion_scenario() {
        let mut g = graph_with_levels(16, Metric::Cosine, [0, 3, 1, 0, 2]);
        for id in 0..5u64 {
            g.add_point(id, vec![(id + 1) as f32, (id + 2) as f32]).unwrap();
        }
        assert_eq!(g.entry_point_id(), Some(1));
        assert_eq!(g.level_max(), 3);
    }

    // Scenario 4: neighbor cap under a tight M.
    #[test]
    fn neighbor_cap_scenario() {
        let mut g = graph_with_levels(2, Metric::Euclidean, std::iter::repeat(0));
        g.add_point(1, vec![0.0, 0.0]).unwrap();
        g.add_point(2, vec![0.0, 1.0]).unwrap();
        g.add_point(3, vec![0.0, 2.0]).unwrap();
        g.add_point(4, vec![0.0, 3.0]).unwrap();

        let n4 = g.get_node(4).unwrap();
        assert_eq!(n4.neighbors(0).len(), 1);
        assert!(n4.neighbors(0).contains(&3));

        let n2 = g.get_node(2).unwrap();
        assert!(n2.neighbors(0).len() <= 2);
        assert!(n2.neighbors(0).contains(&1));
        assert!(n2.neighbors(0).contains(&3));
    }

    // Scenario 5: diversity heuristic.
    #[test]
    fn diversity_heuristic_scenario() {
        let g = graph_with_levels(16, Metric::Euclidean, std::iter::repeat(0));
        let mut g = g;
        g.add_point(2, vec![1.0, 0.0]).unwrap();
        g.add_point(3, vec![2.0, 0.0]).unwrap();
        g.add_point(4, vec![0.0, 2.0]).unwrap();

        let selected = g
            .select_neighbors_heuristic(&[0.0, 0.0], vec![2, 3, 4], 2)
            .unwrap();
        let ids: Vec<u64> = selected.into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn empty_graph_search_returns_empty() {
        let g = graph_with_levels(16, Metric::Cosine, std::iter::repeat(0));
        assert_eq!(g.search_knn(&[1.0, 2.0], 3, None).unwrap(), vec![]);
    }

    #[test]
    fn zero_k_returns_empty() {
        let mut g = graph_with_levels(16, Metric::Cosine, std::iter::repeat(0));
        g.add_point(1, vec![1.0, 2.0]).unwrap();
        assert_eq!(g.search_knn(&[1.0, 2.0], 0, None).unwrap(), vec![]);
    }

    #[test]
    fn single_node_search_returns_that_node() {
        let mut g = graph_with_levels(16, Metric::Cosine, std::iter::repeat(0));
        g.add_point(42, vec![1.0, 2.0, 3.0]).unwrap();
        let hits = g.search_knn(&[1.0, 2.0, 3.0], 5, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 42);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut g = graph_with_levels(16, Metric::Cosine, std::iter::repeat(0));
        g.add_point(1, vec![1.0, 2.0]).unwrap();
        let err = g.add_point(1, vec![3.0, 4.0]).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateId(1)));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut g = graph_with_levels(16, Metric::Cosine, std::iter::repeat(0));
        g.add_point(1, vec![1.0, 2.0]).unwrap();
        let err = g.add_point(2, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            GraphError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn symmetry_and_degree_bound_hold_after_many_inserts() {
        let mut g = graph_with_levels(4, Metric::Euclidean, std::iter::repeat(0));
        for i in 0..40u64 {
            let v = vec![i as f32, (i * 2 % 7) as f32, (i % 5) as f32];
            g.add_point(i, v).unwrap();
        }
        for (&id, node) in g.nodes.iter() {
            for layer in 0..=node.level {
                assert!(node.neighbors(layer).len() <= g.m);
                assert!(!node.neighbors(layer).contains(&id));
                let mut seen = HashSet::new();
                for &nb in node.neighbors(layer) {
                    assert!(seen.insert(nb), "duplicate neighbor");
                }
                for &nb in node.neighbors(layer) {
                    let back = g.nodes.get(&nb).unwrap();
                    assert!(
                        layer <= back.level && back.neighbors(layer).contains(&id),
                        "asymmetric edge {id} -> {nb} at layer {layer}"
                    );
                }
            }
        }
    }

    #[test]
    fn build_index_reports_progress_and_resets_state() {
        let mut g = graph_with_levels(16, Metric::Cosine, std::iter::repeat(0));
        g.add_point(999, vec![1.0, 1.0]).unwrap();

        let data: Vec<(u64, Vec<f32>)> = (0..10)
            .map(|i| (i, vec![i as f32, (i + 1) as f32]))
            .collect();

        let mut calls = Vec::new();
        g.build_index(data, 3, |current, total| calls.push((current, total)))
            .unwrap();

        assert_eq!(g.len(), 10);
        assert_eq!(calls, vec![(3, 10), (6, 10), (9, 10), (10, 10)]);
    }

    #[test]
    fn snapshot_round_trips_search_results() {
        let mut g = graph_with_levels(16, Metric::Cosine, std::iter::repeat(0));
        g.add_point(1, vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        g.add_point(2, vec![2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        g.add_point(3, vec![3.0, 4.0, 5.0, 6.0, 7.0]).unwrap();
        g.add_point(4, vec![4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        g.add_point(5, vec![5.0, 6.0, 7.0, 8.0, 9.0]).unwrap();

        let json = g.to_json().unwrap();
        let restored = Graph::from_json(&json).unwrap();

        let query = [6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(
            g.search_knn(&query, 2, None).unwrap(),
            restored.search_knn(&query, 2, None).unwrap()
        );
    }
}
