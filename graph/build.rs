//! # Graph builder
//!
//! Turns a correlation matrix into the complete weighted graph over its
//! regions. Every unordered pair becomes an edge, zero weights included: the
//! complete graph is the single source every filter policy selects from.

use ndarray::Array2;
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;

use crate::types::{Edge, Graph, RegionLabels};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error(
        "the atlas provides {labels} region labels but the correlation matrix has {matrix} regions"
    )]
    DimensionMismatch { labels: usize, matrix: usize },
    #[error("correlation matrix must be square, found shape {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
}

/// Builds the complete weighted graph of `matrix`, labelling node `i` with
/// `labels[i]`.
///
/// Edges are inserted row-major over the upper triangle, so `(0, 1)` comes
/// first and `(n - 2, n - 1)` last. The lower triangle is never read.
pub fn build_graph(matrix: &Array2<f64>, labels: &RegionLabels) -> Result<Graph, GraphError> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(GraphError::NotSquare { rows, cols });
    }
    if labels.len() != rows {
        return Err(GraphError::DimensionMismatch {
            labels: labels.len(),
            matrix: rows,
        });
    }

    let mut edges = Vec::with_capacity(rows * rows.saturating_sub(1) / 2);
    for i in 0..rows {
        for j in (i + 1)..rows {
            edges.push(Edge::new(i, j, matrix[[i, j]]));
        }
    }

    Ok(Graph::from_parts(Arc::clone(labels), edges))
}

/// Builds one graph per subject. The first failing subject aborts the batch.
pub fn build_graphs(
    matrices: &[Array2<f64>],
    labels: &RegionLabels,
) -> Result<Vec<Graph>, GraphError> {
    matrices
        .par_iter()
        .map(|matrix| build_graph(matrix, labels))
        .collect()
}
