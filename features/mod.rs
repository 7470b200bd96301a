//! # Graph-level features
//!
//! Each filtered graph becomes one row of a feature table. The extraction is a
//! seam: anything implementing `GraphFeatureExtractor` can be plugged into the
//! export driver. `GlobalFeatures` is the built-in extractor and computes
//! whole-graph summary statistics.

pub mod export;

use polars::prelude::*;
use rayon::prelude::*;
use std::collections::VecDeque;

use crate::types::Graph;

pub use export::{ExportError, FeatureExporter, export_features, feature_table_path, load_feature_table};

/// Column holding subject names when a table is built with names.
pub const SUBJECT_COLUMN: &str = "subject";

pub trait GraphFeatureExtractor: Send + Sync {
    /// Column names, in the order `extract` returns values.
    fn feature_names(&self) -> Vec<String>;

    fn extract(&self, graph: &Graph) -> Vec<f64>;
}

const GLOBAL_FEATURE_NAMES: [&str; 13] = [
    "node_count",
    "edge_count",
    "density",
    "total_weight",
    "mean_weight",
    "mean_degree",
    "max_degree",
    "mean_strength",
    "isolated_nodes",
    "connected_components",
    "largest_component",
    "average_clustering",
    "transitivity",
];

/// Whole-graph statistics. Clustering and transitivity are unweighted.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalFeatures;

impl GraphFeatureExtractor for GlobalFeatures {
    fn feature_names(&self) -> Vec<String> {
        GLOBAL_FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    fn extract(&self, graph: &Graph) -> Vec<f64> {
        let n = graph.node_count();
        let m = graph.edge_count();
        let adjacency = graph.adjacency();

        let total_weight: f64 = graph.edges().iter().map(|e| e.weight).sum();
        let degrees: Vec<usize> = adjacency.iter().map(Vec::len).collect();
        let max_degree = degrees.iter().copied().max().unwrap_or(0);
        let isolated = degrees.iter().filter(|&&d| d == 0).count();
        let (components, largest) = component_sizes(&adjacency);
        let (average_clustering, transitivity) = clustering(n, &adjacency);

        let per_node = |value: f64| if n == 0 { 0.0 } else { value / n as f64 };
        vec![
            n as f64,
            m as f64,
            graph.density(),
            total_weight,
            if m == 0 { 0.0 } else { total_weight / m as f64 },
            per_node(2.0 * m as f64),
            max_degree as f64,
            per_node(2.0 * total_weight),
            isolated as f64,
            components as f64,
            largest as f64,
            average_clustering,
            transitivity,
        ]
    }
}

fn component_sizes(adjacency: &[Vec<(usize, f64)>]) -> (usize, usize) {
    let mut seen = vec![false; adjacency.len()];
    let mut queue = VecDeque::new();
    let (mut components, mut largest) = (0, 0);

    for start in 0..adjacency.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        queue.push_back(start);
        let mut size = 0;
        while let Some(node) = queue.pop_front() {
            size += 1;
            for &(next, _) in &adjacency[node] {
                if !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
        components += 1;
        largest = largest.max(size);
    }
    (components, largest)
}

/// Returns `(average local clustering, transitivity)`. Nodes of degree below
/// two contribute a local clustering of zero.
fn clustering(n: usize, adjacency: &[Vec<(usize, f64)>]) -> (f64, f64) {
    if n == 0 {
        return (0.0, 0.0);
    }
    let mut connected = vec![false; n * n];
    for (node, neighbors) in adjacency.iter().enumerate() {
        for &(next, _) in neighbors {
            connected[node * n + next] = true;
        }
    }

    let mut local_sum = 0.0;
    let (mut closed, mut triples) = (0usize, 0usize);
    for neighbors in adjacency {
        let degree = neighbors.len();
        if degree < 2 {
            continue;
        }
        let mut links = 0usize;
        for (i, &(a, _)) in neighbors.iter().enumerate() {
            for &(b, _) in &neighbors[i + 1..] {
                if connected[a * n + b] {
                    links += 1;
                }
            }
        }
        let pairs = degree * (degree - 1) / 2;
        local_sum += links as f64 / pairs as f64;
        closed += links;
        triples += pairs;
    }

    let transitivity = if triples == 0 {
        0.0
    } else {
        closed as f64 / triples as f64
    };
    (local_sum / n as f64, transitivity)
}

/// Builds a feature table with one row per graph. When `subjects` is given it
/// becomes a leading `subject` column and must match `graphs` in length.
pub fn features_table<E: GraphFeatureExtractor>(
    graphs: &[Graph],
    subjects: Option<&[String]>,
    extractor: &E,
) -> PolarsResult<DataFrame> {
    let rows: Vec<Vec<f64>> = graphs.par_iter().map(|g| extractor.extract(g)).collect();
    let names = extractor.feature_names();

    let mut columns: Vec<Column> = Vec::with_capacity(names.len() + 1);
    if let Some(subjects) = subjects {
        columns.push(Series::new(SUBJECT_COLUMN.into(), subjects.to_vec()).into());
    }
    for (index, name) in names.iter().enumerate() {
        let values: Vec<f64> = rows
            .iter()
            .map(|row| row.get(index).copied().unwrap_or(f64::NAN))
            .collect();
        columns.push(Series::new(name.as_str().into(), values).into());
    }
    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_graph;
    use crate::types::RegionLabels;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn labels(n: usize) -> RegionLabels {
        (0..n).map(|i| format!("r{i}")).collect::<Vec<_>>().into()
    }

    fn feature(graph: &Graph, name: &str) -> f64 {
        let index = GLOBAL_FEATURE_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .unwrap();
        GlobalFeatures.extract(graph)[index]
    }

    fn triangle_with_tail() -> Graph {
        // Triangle 0-1-2, pendant 3 on node 2, isolated node 4.
        let mut matrix = Array2::<f64>::zeros((5, 5));
        for &(a, b, w) in &[(0, 1, 0.5), (1, 2, 0.5), (0, 2, 0.5), (2, 3, 1.0)] {
            matrix[[a, b]] = w;
            matrix[[b, a]] = w;
        }
        let complete = build_graph(&matrix, &labels(5)).unwrap();
        crate::filter::filter_by_threshold(&complete, 0.1)
    }

    #[test]
    fn counts_and_weights() {
        let graph = triangle_with_tail();
        assert_eq!(feature(&graph, "edge_count"), 4.0);
        assert_eq!(feature(&graph, "node_count"), 5.0);
        assert_abs_diff_eq!(feature(&graph, "density"), 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(feature(&graph, "total_weight"), 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(feature(&graph, "mean_weight"), 0.625, epsilon = 1e-12);
        assert_eq!(feature(&graph, "max_degree"), 3.0);
        assert_eq!(feature(&graph, "isolated_nodes"), 1.0);
    }

    #[test]
    fn components_and_clustering() {
        let graph = triangle_with_tail();
        assert_eq!(feature(&graph, "connected_components"), 2.0);
        assert_eq!(feature(&graph, "largest_component"), 4.0);
        // Local clustering: nodes 0 and 1 are 1, node 2 is 1/3, others 0.
        assert_abs_diff_eq!(
            feature(&graph, "average_clustering"),
            (1.0 + 1.0 + 1.0 / 3.0) / 5.0,
            epsilon = 1e-12
        );
        // Three closed pairs out of 1 + 1 + 3 neighbour pairs.
        assert_abs_diff_eq!(feature(&graph, "transitivity"), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn empty_graph_has_zero_features() {
        let graph = build_graph(&Array2::<f64>::zeros((0, 0)), &labels(0)).unwrap();
        let values = GlobalFeatures.extract(&graph);
        assert_eq!(values.len(), GLOBAL_FEATURE_NAMES.len());
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn table_has_one_row_per_graph() {
        let graphs = vec![triangle_with_tail(), triangle_with_tail()];
        let subjects = vec!["a".to_string(), "b".to_string()];
        let table = features_table(&graphs, Some(&subjects), &GlobalFeatures).unwrap();
        assert_eq!(table.height(), 2);
        assert_eq!(table.width(), GLOBAL_FEATURE_NAMES.len() + 1);
        assert_eq!(table.get_column_names()[0].as_str(), SUBJECT_COLUMN);
    }
}
