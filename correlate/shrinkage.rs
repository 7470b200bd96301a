use ndarray::{Array2, ArrayView2, Axis};

use super::{center_columns, covariance_to_correlation};

/// Correlation matrix of the Ledoit-Wolf shrunk covariance of `signals`.
///
/// Columns are z-scored first, so the shrinkage target is a multiple of the
/// identity on standardized data and the result stays a valid correlation
/// matrix.
pub fn ledoit_wolf_correlation(signals: ArrayView2<f64>) -> Array2<f64> {
    let standardized = standardize_columns(signals);
    let covariance = ledoit_wolf_covariance(standardized.view());
    covariance_to_correlation(&covariance)
}

/// Shrunk covariance `(1 - s) S + s mu I` where `S` is the empirical
/// covariance, `mu` its mean variance and `s` the Ledoit-Wolf coefficient.
pub fn ledoit_wolf_covariance(signals: ArrayView2<f64>) -> Array2<f64> {
    let centered = center_columns(signals);
    let samples = centered.nrows().max(1) as f64;
    let features = centered.ncols();

    let empirical = centered.t().dot(&centered) / samples;
    let shrinkage = shrinkage_coefficient(&centered);
    let mu = empirical.diag().sum() / features.max(1) as f64;

    let mut shrunk = empirical * (1.0 - shrinkage);
    shrunk.diag_mut().mapv_inplace(|v| v + shrinkage * mu);
    shrunk
}

/// The Ledoit-Wolf shrinkage coefficient in `[0, 1]` for already centered
/// data shaped `[samples, features]`.
pub fn shrinkage_coefficient(centered: &Array2<f64>) -> f64 {
    let (samples, features) = centered.dim();
    if features <= 1 || samples == 0 {
        return 0.0;
    }
    let n = samples as f64;
    let p = features as f64;

    let squared = centered.mapv(|v| v * v);
    let variance_trace = squared.sum_axis(Axis(0)) / n;
    let mu = variance_trace.sum() / p;

    let beta_sum = squared.t().dot(&squared).sum();
    let delta_sum = centered.t().dot(centered).mapv(|v| v * v).sum() / (n * n);

    let beta = (beta_sum / n - delta_sum) / (p * n);
    let delta = (delta_sum - 2.0 * mu * variance_trace.sum() + p * mu * mu) / p;
    let beta = beta.min(delta);

    if beta == 0.0 || delta == 0.0 {
        0.0
    } else {
        (beta / delta).clamp(0.0, 1.0)
    }
}

fn standardize_columns(signals: ArrayView2<f64>) -> Array2<f64> {
    let mut standardized = center_columns(signals);
    let samples = standardized.nrows().max(1) as f64;
    for mut column in standardized.axis_iter_mut(Axis(1)) {
        let std = (column.mapv(|v| v * v).sum() / samples).sqrt();
        if std > 0.0 {
            column.mapv_inplace(|v| v / std);
        } else {
            column.fill(0.0);
        }
    }
    standardized
}
