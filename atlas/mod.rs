//! # Atlas and region labels
//!
//! An atlas is the fixed, ordered list of region-of-interest coordinates that
//! time series were extracted from. Its only job here is to name the graph
//! nodes: region `i` is labelled with its coordinate rendered as `[x y z]`,
//! each element right-aligned to a common width (`[ 27 -97 -13]`).
//!
//! Labels are resolved once per run and shared by every graph through an
//! `Arc<[String]>`.

use ndarray::Array2;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

use crate::types::RegionLabels;

const COORDINATE_COLUMNS: [&str; 3] = ["x", "y", "z"];

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("The required column '{0}' was not found in the atlas file.")]
    ColumnNotFound(String),
    #[error("Missing or non-numeric values were found in atlas column '{0}'.")]
    InvalidValues(String),
    #[error("Non-finite values (NaN or Infinity) were found in atlas column '{0}'.")]
    NonFinite(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Atlas {
    /// Region coordinates, shape `[regions, 3]`.
    coordinates: Array2<f64>,
}

impl Atlas {
    pub fn from_coordinates(coordinates: Array2<f64>) -> Self {
        Self { coordinates }
    }

    pub fn len(&self) -> usize {
        self.coordinates.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.nrows() == 0
    }

    pub fn coordinates(&self) -> &Array2<f64> {
        &self.coordinates
    }

    pub fn labels(&self) -> RegionLabels {
        self.coordinates
            .rows()
            .into_iter()
            .map(|row| format_coordinate(&row.to_vec()))
            .collect::<Vec<_>>()
            .into()
    }
}

/// Reads an atlas from a tab-separated file with `x`, `y` and `z` columns. Other
/// columns are ignored.
pub fn load_atlas(path: &Path) -> Result<Atlas, AtlasError> {
    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_separator(b'\t')),
        )
        .finish()?;

    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    for column in COORDINATE_COLUMNS {
        if !names.iter().any(|name| name == column) {
            return Err(AtlasError::ColumnNotFound(column.to_string()));
        }
    }

    let regions = df.height();
    let mut coordinates = Array2::<f64>::zeros((regions, COORDINATE_COLUMNS.len()));
    for (axis, column) in COORDINATE_COLUMNS.iter().enumerate() {
        let values = numeric_column(&df, column)?;
        for (row, value) in values.into_iter().enumerate() {
            coordinates[[row, axis]] = value;
        }
    }

    log::info!("Loaded atlas with {regions} regions from {}", path.display());
    Ok(Atlas::from_coordinates(coordinates))
}

fn numeric_column(df: &DataFrame, column: &str) -> Result<Vec<f64>, AtlasError> {
    let series = df.column(column)?;
    let casted = series
        .cast(&DataType::Float64)
        .map_err(|_| AtlasError::InvalidValues(column.to_string()))?;
    if casted.null_count() > 0 {
        return Err(AtlasError::InvalidValues(column.to_string()));
    }
    let chunked = casted.f64()?.rechunk();
    let values: Vec<f64> = chunked.into_no_null_iter().collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AtlasError::NonFinite(column.to_string()));
    }
    Ok(values)
}

/// Renders one coordinate as `[x y z]`. Integral values print without a
/// fractional part; all elements share the width of the widest one.
pub fn format_coordinate(values: &[f64]) -> String {
    let rendered: Vec<String> = values
        .iter()
        .map(|&v| {
            if v.fract() == 0.0 && v.abs() < 1e15 {
                format!("{}", v as i64)
            } else {
                format!("{v}")
            }
        })
        .collect();
    let width = rendered.iter().map(String::len).max().unwrap_or(0);
    let padded: Vec<String> = rendered
        .iter()
        .map(|text| format!("{text:>width$}"))
        .collect();
    format!("[{}]", padded.join(" "))
}
