//! Pipeline configuration, stored as TOML.
//!
//! Every field has a default so a partial file is valid; command-line flags
//! are applied on top of whatever was loaded.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::correlate::CorrelationEstimator;
use crate::filter::FilterPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML config file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Region coordinate table (`x`, `y`, `z` columns).
    pub atlas: PathBuf,
    /// Directory of per-subject time series files.
    pub scans_dir: PathBuf,
    /// Root of the persisted time series and correlation arrays.
    pub cache_dir: PathBuf,
    /// Root of the exported feature tables.
    pub output_dir: PathBuf,
    /// Recompute from the scans instead of reading the cache.
    pub recompute: bool,
    pub use_absolute: bool,
    pub estimator: CorrelationEstimator,
    pub policy: FilterPolicy,
    /// Parameter sweep for `policy`: densities or thresholds.
    pub thresholds: Vec<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            atlas: PathBuf::from("atlas.tsv"),
            scans_dir: PathBuf::from("scans"),
            cache_dir: PathBuf::from("cache"),
            output_dir: PathBuf::from("features"),
            recompute: false,
            use_absolute: false,
            estimator: CorrelationEstimator::default(),
            policy: FilterPolicy::Density,
            thresholds: (1..=10).map(|step| step as f64 / 10.0).collect(),
        }
    }
}

impl PipelineConfig {
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let config = toml::from_str(&toml_string)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        let config = PipelineConfig {
            recompute: true,
            use_absolute: true,
            estimator: CorrelationEstimator::Empirical,
            policy: FilterPolicy::Pmfg,
            thresholds: vec![0.0],
            ..PipelineConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: PipelineConfig =
            toml::from_str("policy = \"threshold\"\nthresholds = [0.25, 0.5]\n").unwrap();
        assert_eq!(config.policy, FilterPolicy::Threshold);
        assert_eq!(config.thresholds, vec![0.25, 0.5]);
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.estimator, CorrelationEstimator::LedoitWolf);
    }

    #[test]
    fn unknown_policy_is_a_parse_error() {
        let parsed = toml::from_str::<PipelineConfig>("policy = \"mst\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn default_sweep_covers_tenths() {
        let sweep = PipelineConfig::default().thresholds;
        assert_eq!(sweep.len(), 10);
        assert_eq!(sweep[0], 0.1);
        assert_eq!(sweep[9], 1.0);
    }
}
