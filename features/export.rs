//! # Feature export driver
//!
//! For one filter policy and a list of parameter values, filters every
//! subject's graph, extracts features and writes one table per value to
//! `{output}/{policy}/graph_{value}.csv`. Complete graphs are built once and
//! reused across parameter values; a PMFG does not depend on the parameter and
//! is computed only once.
//!
//! Tables are written to a temporary file and renamed into place, so a reader
//! never observes a half-written table and re-running overwrites cleanly.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use ndarray::Array2;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{GlobalFeatures, GraphFeatureExtractor, features_table};
use crate::build::{GraphError, build_graphs};
use crate::filter::{FilterPolicy, filter_graphs};
use crate::types::{Graph, RegionLabels};

const TABLE_EXTENSION: &str = "csv";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to build graphs: {0}")]
    Graph(#[from] GraphError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    Polars(#[from] PolarsError),
    #[error("{subjects} subject names were given for {matrices} correlation matrices")]
    SubjectCountMismatch { subjects: usize, matrices: usize },
}

/// Where the table for `policy` at parameter `value` lives under `output_dir`.
/// The value is rendered in its shortest round-trip form (`0.1`, `1.0`).
pub fn feature_table_path(output_dir: &Path, policy: FilterPolicy, value: f64) -> PathBuf {
    let mut buffer = ryu::Buffer::new();
    output_dir
        .join(policy.name())
        .join(format!("graph_{}.{TABLE_EXTENSION}", buffer.format(value)))
}

pub fn load_feature_table(
    output_dir: &Path,
    policy: FilterPolicy,
    value: f64,
) -> Result<DataFrame, ExportError> {
    let path = feature_table_path(output_dir, policy, value);
    let df = CsvReader::new(File::open(&path)?)
        .with_options(CsvReadOptions::default().with_has_header(true))
        .finish()?;
    Ok(df)
}

fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let draw_target = if io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(20)
    } else {
        ProgressDrawTarget::hidden()
    };

    let pb = ProgressBar::with_draw_target(Some(len), draw_target);
    if let Ok(style) = ProgressStyle::with_template(
        "\n> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    pb.set_message(message.to_string());
    pb
}

pub struct FeatureExporter<E: GraphFeatureExtractor = GlobalFeatures> {
    output_dir: PathBuf,
    labels: RegionLabels,
    subjects: Option<Vec<String>>,
    extractor: E,
}

impl FeatureExporter<GlobalFeatures> {
    pub fn new(output_dir: impl Into<PathBuf>, labels: RegionLabels) -> Self {
        Self::with_extractor(output_dir, labels, GlobalFeatures)
    }
}

impl<E: GraphFeatureExtractor> FeatureExporter<E> {
    pub fn with_extractor(output_dir: impl Into<PathBuf>, labels: RegionLabels, extractor: E) -> Self {
        Self {
            output_dir: output_dir.into(),
            labels,
            subjects: None,
            extractor,
        }
    }

    /// Adds a leading subject column to every exported table.
    pub fn with_subjects(mut self, subjects: Vec<String>) -> Self {
        self.subjects = Some(subjects);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Filters, extracts and writes one table per value. Returns the written
    /// paths in the order of `values`.
    pub fn export(
        &self,
        policy: FilterPolicy,
        correlations: &[Array2<f64>],
        values: &[f64],
    ) -> Result<Vec<PathBuf>, ExportError> {
        if let Some(subjects) = &self.subjects {
            if subjects.len() != correlations.len() {
                return Err(ExportError::SubjectCountMismatch {
                    subjects: subjects.len(),
                    matrices: correlations.len(),
                });
            }
        }

        let complete = build_graphs(correlations, &self.labels)?;
        log::info!(
            "Exporting {policy} features for {} subjects over {} values",
            complete.len(),
            values.len()
        );

        let pb = create_progress_bar(values.len() as u64, &format!("Filtering ({policy})"));
        let mut pmfg: Option<Vec<Graph>> = None;
        let mut written = Vec::with_capacity(values.len());

        for &value in values {
            let filtered = match policy {
                FilterPolicy::Pmfg => pmfg
                    .get_or_insert_with(|| filter_graphs(&complete, policy, value))
                    .clone(),
                FilterPolicy::Density | FilterPolicy::Threshold => {
                    filter_graphs(&complete, policy, value)
                }
            };

            let mut table =
                features_table(&filtered, self.subjects.as_deref(), &self.extractor)?;
            let path = feature_table_path(&self.output_dir, policy, value);
            write_table_atomically(&mut table, &path)?;
            log::debug!("Wrote {} rows to {}", table.height(), path.display());

            written.push(path);
            pb.inc(1);
        }

        pb.finish_with_message("Feature tables written");
        log::info!(
            "Wrote {} {policy} feature tables under {}",
            written.len(),
            self.output_dir.display()
        );
        Ok(written)
    }
}

/// Convenience entry point: global features, no subject column.
pub fn export_features(
    output_dir: &Path,
    labels: RegionLabels,
    policy: FilterPolicy,
    correlations: &[Array2<f64>],
    values: &[f64],
) -> Result<Vec<PathBuf>, ExportError> {
    FeatureExporter::new(output_dir, labels).export(policy, correlations, values)
}

fn write_table_atomically(table: &mut DataFrame, path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension(format!("{TABLE_EXTENSION}.tmp"));

    let write_result = File::create(&temp_path)
        .map_err(ExportError::from)
        .and_then(|file| Ok(CsvWriter::new(file).include_header(true).finish(table)?));
    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    fs::rename(&temp_path, path).map_err(|err| {
        let _ = fs::remove_file(&temp_path);
        ExportError::Io(err)
    })
}
