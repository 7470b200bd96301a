//! # Scan loading
//!
//! Regional time series arrive as one tab-separated file per subject: a header
//! row naming the regions and one row per timestep. Extraction of those series
//! from imaging volumes happens upstream of this crate.
//!
//! `load_scans` either recomputes everything from the scan files, persisting
//! the time series and correlation matrices to the cache as it goes, or loads
//! the previously persisted arrays, depending on `ScanLoadOptions::recompute`.

pub mod cache;

use natord::compare;
use ndarray::Array2;
use polars::prelude::*;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::correlate::{CorrelationEstimator, time_series_to_correlation_with};
pub use cache::{CacheKind, ScanCache};

const SCAN_EXTENSION: &str = "tsv";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Data type should be one of [correlation, time_series, both], found '{0}'")]
    InvalidDataType(String),
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to (de)serialize cached array: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("No cached {kind} array for subject '{name}' at {path}")]
    MissingCache {
        kind: CacheKind,
        name: String,
        path: PathBuf,
    },
    #[error("Scan file {0} contains no samples")]
    Empty(PathBuf),
    #[error("Could not derive a subject name from {0}")]
    UnnamedScan(PathBuf),
}

/// Which arrays `load_scans` should return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    TimeSeries,
    Correlation,
    Both,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            Self::TimeSeries => "time_series",
            Self::Correlation => "correlation",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::TimeSeries, Self::Correlation, Self::Both]
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ScanError::InvalidDataType(s.to_string()))
    }
}

#[derive(Debug)]
pub enum ScanData {
    TimeSeries(Vec<Array2<f64>>),
    Correlation(Vec<Array2<f64>>),
    Both {
        time_series: Vec<Array2<f64>>,
        correlations: Vec<Array2<f64>>,
    },
}

impl ScanData {
    pub fn into_correlations(self) -> Option<Vec<Array2<f64>>> {
        match self {
            Self::Correlation(correlations) | Self::Both { correlations, .. } => Some(correlations),
            Self::TimeSeries(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ScanLoadOptions {
    /// Recompute from the scan files instead of loading the cache.
    pub recompute: bool,
    pub use_absolute: bool,
    pub estimator: CorrelationEstimator,
}

/// Lists the scan files of `dir` in natural order (`sub2` before `sub10`).
pub fn list_scans(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut scans: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == SCAN_EXTENSION))
        .collect();
    scans.sort_by(|a, b| compare(&file_name_lossy(a), &file_name_lossy(b)));
    Ok(scans)
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// The cache key of a scan: its file name.
pub fn subject_name(path: &Path) -> Result<String, ScanError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ScanError::UnnamedScan(path.to_path_buf()))
}

/// Reads one subject's time series, shaped `[timesteps, regions]`. Missing and
/// non-finite samples are replaced with zero.
pub fn load_time_series(path: &Path) -> Result<Array2<f64>, ScanError> {
    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_separator(b'\t')),
        )
        .finish()?;

    let (timesteps, regions) = (df.height(), df.width());
    if timesteps == 0 || regions == 0 {
        return Err(ScanError::Empty(path.to_path_buf()));
    }

    let mut series = Array2::<f64>::zeros((timesteps, regions));
    for (region, column) in df.get_columns().iter().enumerate() {
        let casted = column.cast(&polars::prelude::DataType::Float64)?;
        for (timestep, value) in casted.f64()?.into_iter().enumerate() {
            series[[timestep, region]] = value.filter(|v| v.is_finite()).unwrap_or(0.0);
        }
    }

    log::debug!(
        "Loaded {timesteps} timesteps over {regions} regions from {}",
        path.display()
    );
    Ok(series)
}

/// Loads the requested arrays for every scan, recomputing or reading the cache.
pub fn load_scans(
    scan_paths: &[PathBuf],
    cache: &ScanCache,
    data_type: DataType,
    options: &ScanLoadOptions,
) -> Result<ScanData, ScanError> {
    let names = scan_paths
        .iter()
        .map(|path| subject_name(path))
        .collect::<Result<Vec<_>, _>>()?;

    if !options.recompute {
        log::info!("Loading {} cached subjects ({data_type})", names.len());
        return load_saved_scans(cache, &names, data_type);
    }

    log::info!("Extracting time series for {} subjects", names.len());
    let time_series = scan_paths
        .iter()
        .map(|path| load_time_series(path))
        .collect::<Result<Vec<_>, _>>()?;
    cache.save_all(CacheKind::TimeSeries, &names, &time_series)?;

    Ok(match data_type {
        DataType::TimeSeries => ScanData::TimeSeries(time_series),
        DataType::Correlation => {
            ScanData::Correlation(correlate_and_save(cache, &names, &time_series, options)?)
        }
        DataType::Both => {
            let correlations = correlate_and_save(cache, &names, &time_series, options)?;
            ScanData::Both {
                time_series,
                correlations,
            }
        }
    })
}

fn correlate_and_save(
    cache: &ScanCache,
    names: &[String],
    time_series: &[Array2<f64>],
    options: &ScanLoadOptions,
) -> Result<Vec<Array2<f64>>, ScanError> {
    let correlations =
        time_series_to_correlation_with(time_series, options.use_absolute, options.estimator);
    cache.save_all(CacheKind::Correlation, names, &correlations)?;
    Ok(correlations)
}

fn load_saved_scans(
    cache: &ScanCache,
    names: &[String],
    data_type: DataType,
) -> Result<ScanData, ScanError> {
    Ok(match data_type {
        DataType::TimeSeries => ScanData::TimeSeries(cache.load_all(CacheKind::TimeSeries, names)?),
        DataType::Correlation => {
            ScanData::Correlation(cache.load_all(CacheKind::Correlation, names)?)
        }
        DataType::Both => ScanData::Both {
            time_series: cache.load_all(CacheKind::TimeSeries, names)?,
            correlations: cache.load_all(CacheKind::Correlation, names)?,
        },
    })
}
