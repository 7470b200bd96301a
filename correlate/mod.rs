//! # Correlation builder
//!
//! Turns per-subject regional time series, shaped `[timesteps, regions]`, into
//! region-by-region correlation matrices. Every output matrix is symmetric,
//! has an exactly zero diagonal and contains only finite, non-negative values:
//! either the magnitude of each coefficient (`use_absolute`) or the
//! coefficient with negatives clipped to zero.
//!
//! Inputs are assumed finite. Regions with zero variance correlate with
//! nothing and yield zero rows rather than NaN.

pub mod shrinkage;

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How the covariance behind each correlation matrix is estimated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationEstimator {
    /// Plain Pearson correlation of the sample covariance.
    Empirical,
    /// Ledoit-Wolf shrunk covariance of the standardized signals.
    #[default]
    LedoitWolf,
}

/// Computes one correlation matrix per subject with the default (Ledoit-Wolf)
/// estimator.
pub fn time_series_to_correlation(series: &[Array2<f64>], use_absolute: bool) -> Vec<Array2<f64>> {
    time_series_to_correlation_with(series, use_absolute, CorrelationEstimator::default())
}

pub fn time_series_to_correlation_with(
    series: &[Array2<f64>],
    use_absolute: bool,
    estimator: CorrelationEstimator,
) -> Vec<Array2<f64>> {
    series
        .par_iter()
        .map(|subject| {
            let mut matrix = match estimator {
                CorrelationEstimator::Empirical => pearson(subject.view()),
                CorrelationEstimator::LedoitWolf => shrinkage::ledoit_wolf_correlation(subject.view()),
            };
            apply_sign_policy(&mut matrix, use_absolute);
            matrix
        })
        .collect()
}

/// Pearson correlation between the columns of `signals`.
pub fn pearson(signals: ArrayView2<f64>) -> Array2<f64> {
    let centered = center_columns(signals);
    let samples = signals.nrows().max(1) as f64;
    let covariance = centered.t().dot(&centered) / samples;
    covariance_to_correlation(&covariance)
}

pub(crate) fn center_columns(signals: ArrayView2<f64>) -> Array2<f64> {
    let mut centered = signals.to_owned();
    if let Some(means) = signals.mean_axis(Axis(0)) {
        centered -= &means;
    }
    centered
}

/// Rescales a covariance matrix to unit diagonal. Rows of zero-variance
/// variables are left at zero.
pub fn covariance_to_correlation(covariance: &Array2<f64>) -> Array2<f64> {
    let scale = covariance.diag().mapv(|v| if v > 0.0 { v.sqrt() } else { 0.0 });
    let mut correlation = covariance.clone();
    for ((i, j), value) in correlation.indexed_iter_mut() {
        let denominator = scale[i] * scale[j];
        *value = if denominator > 0.0 {
            *value / denominator
        } else {
            0.0
        };
    }
    correlation
}

/// Zeroes the diagonal, replaces non-finite entries with zero, then applies the
/// sign policy.
pub fn apply_sign_policy(matrix: &mut Array2<f64>, use_absolute: bool) {
    matrix.diag_mut().fill(0.0);
    matrix.mapv_inplace(|v| {
        if !v.is_finite() {
            0.0
        } else if use_absolute {
            v.abs()
        } else if v <= 0.0 {
            0.0
        } else {
            v
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn sample_series() -> Array2<f64> {
        array![
            [1.0, 2.0, -1.0, 0.5],
            [2.0, 4.1, -2.2, 0.1],
            [3.0, 5.9, -2.9, 0.7],
            [4.0, 8.2, -4.1, 0.2],
            [5.0, 9.8, -5.0, 0.9]
        ]
    }

    fn empirical(series: Array2<f64>, use_absolute: bool) -> Array2<f64> {
        time_series_to_correlation_with(&[series], use_absolute, CorrelationEstimator::Empirical)
            .remove(0)
    }

    fn assert_invariants(matrix: &Array2<f64>) {
        let n = matrix.nrows();
        assert_eq!(matrix.ncols(), n);
        for i in 0..n {
            assert_eq!(matrix[[i, i]], 0.0);
            for j in 0..n {
                assert_abs_diff_eq!(matrix[[i, j]], matrix[[j, i]], epsilon = 1e-12);
                assert!(matrix[[i, j]].is_finite());
                assert!(matrix[[i, j]].is_sign_positive());
            }
        }
    }

    #[test]
    fn clipped_correlations_are_non_negative() {
        let matrix = &empirical(sample_series(), false);
        assert_invariants(matrix);
        assert!(matrix[[0, 1]] > 0.99);
        assert_eq!(matrix[[0, 2]], 0.0);
    }

    #[test]
    fn absolute_mode_keeps_anti_correlation_strength() {
        let matrix = &empirical(sample_series(), true);
        assert_invariants(matrix);
        assert!(matrix[[0, 2]] > 0.99);
    }

    #[test]
    fn pearson_matches_hand_computation() {
        let signals = array![[1.0, 1.0], [2.0, 3.0], [3.0, 2.0]];
        let correlation = pearson(signals.view());
        assert_abs_diff_eq!(correlation[[0, 1]], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(correlation[[0, 0]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_region_yields_zero_row() {
        let signals = array![[1.0, 5.0, 2.0], [2.0, 5.0, 1.0], [3.0, 5.0, 0.0]];
        let matrix = &empirical(signals, true);
        assert_invariants(matrix);
        assert_eq!(matrix[[1, 0]], 0.0);
        assert_eq!(matrix[[1, 2]], 0.0);
        assert_abs_diff_eq!(matrix[[0, 2]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn subjects_are_independent_and_ordered() {
        let first = sample_series();
        let second = sample_series().slice(ndarray::s![.., 0..2]).to_owned();
        let matrices = time_series_to_correlation(&[first, second], false);
        assert_eq!(matrices.len(), 2);
        assert_eq!(matrices[0].dim(), (4, 4));
        assert_eq!(matrices[1].dim(), (2, 2));
    }

    #[test]
    fn ledoit_wolf_shrinks_towards_zero() {
        let series = sample_series();
        let empirical = time_series_to_correlation_with(
            std::slice::from_ref(&series),
            true,
            CorrelationEstimator::Empirical,
        );
        let shrunk =
            time_series_to_correlation_with(&[series], true, CorrelationEstimator::LedoitWolf);
        assert_invariants(&shrunk[0]);
        for ((i, j), &value) in shrunk[0].indexed_iter() {
            assert!(value <= empirical[0][[i, j]] + 1e-12);
        }
    }

    #[test]
    fn default_entry_point_uses_ledoit_wolf() {
        let series = sample_series();
        let default = time_series_to_correlation(std::slice::from_ref(&series), false);
        let shrunk =
            time_series_to_correlation_with(&[series], false, CorrelationEstimator::LedoitWolf);
        assert_eq!(CorrelationEstimator::default(), CorrelationEstimator::LedoitWolf);
        assert_eq!(default, shrunk);
    }

    #[test]
    fn clipping_leaves_no_negative_zeros() {
        let mut matrix = array![[1.0, -0.0, -0.3], [-0.0, 1.0, 0.4], [-0.3, 0.4, 1.0]];
        apply_sign_policy(&mut matrix, false);
        assert!(matrix.iter().all(|v| v.is_sign_positive()));
        assert_eq!(matrix[[0, 2]], 0.0);
        assert_eq!(matrix[[1, 2]], 0.4);
    }
}
