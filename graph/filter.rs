//! # Edge filtering
//!
//! Sparsifies a complete connectivity graph under one of three policies:
//!
//! - `Density`: keep the strongest `floor(d * C(n, 2))` edges.
//! - `Threshold`: keep every edge with weight at or above `t`. The kept count is
//!   computed first and then handed to the same top-K selector as `Density`, so
//!   both policies resolve weight ties identically.
//! - `Pmfg`: the planar maximally filtered graph. Edges are offered strongest
//!   first to an initially empty graph and kept only if the graph stays planar,
//!   until `3 (n - 2)` edges are kept or the candidates run out.
//!
//! Every policy reads the source graph and returns a new one; the source is
//! never touched, so one complete graph can serve a whole threshold sweep.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::planarity::{PlanarGraphBuilder, max_planar_edges};
use crate::types::{Edge, Graph};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unsupported filter policy '{0}' (expected one of: density, threshold, pmfg)")]
    UnsupportedFilterPolicy(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPolicy {
    Density,
    Threshold,
    Pmfg,
}

impl FilterPolicy {
    pub const ALL: [FilterPolicy; 3] = [Self::Density, Self::Threshold, Self::Pmfg];

    pub fn name(self) -> &'static str {
        match self {
            Self::Density => "density",
            Self::Threshold => "threshold",
            Self::Pmfg => "pmfg",
        }
    }
}

impl fmt::Display for FilterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterPolicy {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|policy| policy.name() == s)
            .ok_or_else(|| FilterError::UnsupportedFilterPolicy(s.to_string()))
    }
}

/// Applies `policy` with parameter `param` to `graph` and returns the reduced
/// graph. `param` is ignored by `Pmfg`.
pub fn filter(graph: &Graph, policy: FilterPolicy, param: f64) -> Graph {
    match policy {
        FilterPolicy::Density => filter_by_density(graph, param),
        FilterPolicy::Threshold => filter_by_threshold(graph, param),
        FilterPolicy::Pmfg => filter_by_pmfg(graph),
    }
}

/// Filters every graph of a batch, preserving batch order.
pub fn filter_graphs(graphs: &[Graph], policy: FilterPolicy, param: f64) -> Vec<Graph> {
    graphs
        .par_iter()
        .map(|graph| filter(graph, policy, param))
        .collect()
}

/// Indices of `edges` sorted by ascending weight. The sort is stable, so equal
/// weights keep insertion order and the later-inserted edge ranks higher.
pub fn rank_edges(edges: &[Edge]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..edges.len()).collect();
    order.sort_by(|&a, &b| compare_weights(edges[a].weight, edges[b].weight));
    order
}

// Signed zeros compare equal so that clipped correlations tie on insertion order.
fn compare_weights(a: f64, b: f64) -> Ordering {
    let normalize = |w: f64| if w == 0.0 { 0.0 } else { w };
    normalize(a).total_cmp(&normalize(b))
}

pub fn filter_by_density(graph: &Graph, density: f64) -> Graph {
    let density = if density.is_nan() {
        0.0
    } else {
        density.clamp(0.0, 1.0)
    };
    let amount = (graph.max_edge_count() as f64 * density).floor() as usize;
    filter_by_amount(graph, amount)
}

pub fn filter_by_threshold(graph: &Graph, threshold: f64) -> Graph {
    let amount = graph
        .edges()
        .iter()
        .filter(|edge| edge.weight >= threshold)
        .count();
    filter_by_amount(graph, amount)
}

/// Keeps the `amount` highest-ranked edges of `graph`. Surviving edges keep
/// their original insertion order.
pub fn filter_by_amount(graph: &Graph, amount: usize) -> Graph {
    let edges = graph.edges();
    let amount = amount.min(edges.len());
    let order = rank_edges(edges);

    let mut keep = vec![false; edges.len()];
    for &index in &order[edges.len() - amount..] {
        keep[index] = true;
    }

    graph.with_edges(select(edges, &keep))
}

pub fn filter_by_pmfg(graph: &Graph) -> Graph {
    let edges = graph.edges();
    let Some(target) = max_planar_edges(graph.node_count()) else {
        return graph.with_edges(edges.to_vec());
    };

    let mut builder = PlanarGraphBuilder::new(graph.node_count());
    let mut keep = vec![false; edges.len()];
    for &index in rank_edges(edges).iter().rev() {
        if builder.edge_count() == target {
            break;
        }
        let edge = edges[index];
        keep[index] = builder.try_add_edge(edge.source, edge.target);
    }

    log::debug!(
        "PMFG kept {} of {} candidate edges (target {target})",
        builder.edge_count(),
        edges.len()
    );
    graph.with_edges(select(edges, &keep))
}

fn select(edges: &[Edge], keep: &[bool]) -> Vec<Edge> {
    edges
        .iter()
        .zip(keep)
        .filter_map(|(edge, &keep)| keep.then_some(*edge))
        .collect()
}
