use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::ScanError;

/// The persisted array families, each stored in its own subdirectory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    TimeSeries,
    Correlation,
}

impl CacheKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::TimeSeries => "time_series",
            Self::Correlation => "correlation",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Per-subject array store rooted at a directory:
/// `{root}/{time_series|correlation}/{subject}.json`.
#[derive(Clone, Debug)]
pub struct ScanCache {
    root: PathBuf,
}

impl ScanCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, kind: CacheKind, name: &str) -> PathBuf {
        self.root.join(kind.dir_name()).join(format!("{name}.json"))
    }

    pub fn save(&self, kind: CacheKind, name: &str, array: &Array2<f64>) -> Result<(), ScanError> {
        let path = self.path(kind, name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer(&mut writer, array)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(&self, kind: CacheKind, name: &str) -> Result<Array2<f64>, ScanError> {
        let path = self.path(kind, name);
        if !path.is_file() {
            return Err(ScanError::MissingCache {
                kind,
                name: name.to_string(),
                path,
            });
        }
        let reader = BufReader::new(File::open(&path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save_all(
        &self,
        kind: CacheKind,
        names: &[String],
        arrays: &[Array2<f64>],
    ) -> Result<(), ScanError> {
        for (name, array) in names.iter().zip(arrays) {
            self.save(kind, name, array)?;
        }
        log::debug!(
            "Persisted {} {kind} arrays under {}",
            arrays.len(),
            self.root.display()
        );
        Ok(())
    }

    pub fn load_all(&self, kind: CacheKind, names: &[String]) -> Result<Vec<Array2<f64>>, ScanError> {
        names.iter().map(|name| self.load(kind, name)).collect()
    }
}
