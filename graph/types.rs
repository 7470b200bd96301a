//! # Connectivity graph values
//!
//! A `Graph` is an immutable, undirected, weighted graph over a fixed set of
//! regions. Nodes are the indices `0..n` and carry the region label of the
//! atlas they were built from. Edges are stored once per unordered pair with
//! `source < target`, in the order they were inserted by the builder. That
//! insertion order is the secondary key of every edge ranking, so it is part
//! of the contract and is preserved by every filter.

use std::sync::Arc;

/// The ordered region labels of an atlas, shared by reference across every
/// graph built from it.
pub type RegionLabels = Arc<[String]>;

/// A weighted undirected edge between two region indices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
}

impl Edge {
    /// Creates an edge with its endpoints normalized so that `source < target`.
    pub fn new(a: usize, b: usize, weight: f64) -> Self {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        Self {
            source,
            target,
            weight,
        }
    }

    /// The unordered endpoint pair identifying this edge.
    pub fn key(&self) -> (usize, usize) {
        (self.source, self.target)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
    labels: RegionLabels,
    edges: Vec<Edge>,
}

impl Graph {
    pub(crate) fn from_parts(labels: RegionLabels, edges: Vec<Edge>) -> Self {
        Self { labels, edges }
    }

    /// Returns a graph over the same nodes and labels but with `edges` as its
    /// edge set. Used by the filters to produce a reduced copy.
    pub(crate) fn with_edges(&self, edges: Vec<Edge>) -> Self {
        Self {
            labels: Arc::clone(&self.labels),
            edges,
        }
    }

    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn labels(&self) -> &RegionLabels {
        &self.labels
    }

    /// The `label` attribute of `node`.
    pub fn label(&self, node: usize) -> Option<&str> {
        self.labels.get(node).map(String::as_str)
    }

    /// Number of unordered node pairs, `C(n, 2)`.
    pub fn max_edge_count(&self) -> usize {
        let n = self.node_count();
        n * n.saturating_sub(1) / 2
    }

    /// Fraction of all node pairs connected by an edge. Zero for graphs with
    /// fewer than two nodes.
    pub fn density(&self) -> f64 {
        let pairs = self.max_edge_count();
        if pairs == 0 {
            0.0
        } else {
            self.edges.len() as f64 / pairs as f64
        }
    }

    pub fn contains_edge(&self, a: usize, b: usize) -> bool {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.edges.iter().any(|edge| edge.key() == key)
    }

    /// Adjacency lists with `(neighbor, weight)` entries in edge order.
    pub fn adjacency(&self) -> Vec<Vec<(usize, f64)>> {
        let mut adjacency = vec![Vec::new(); self.node_count()];
        for edge in &self.edges {
            adjacency[edge.source].push((edge.target, edge.weight));
            adjacency[edge.target].push((edge.source, edge.weight));
        }
        adjacency
    }
}
