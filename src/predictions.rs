//! Identifiers the model predicted as safe to exclude
//!
//! Two file shapes are accepted:
//!
//! ```text
//! { "identifiers": ["viewDidLoad", "customMethod"] }
//! { "Sources/App/ViewController.swift": ["viewDidLoad"], ... }
//! ```
//!
//! The first applies one list to every file, the second is keyed by file.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Failed to read predictions {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in predictions {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Predictions {0} must be {{\"identifiers\": [...]}} or a map of file to identifier list")]
    Shape(PathBuf),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SharedPredictions {
    identifiers: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPredictions {
    Shared(SharedPredictions),
    PerFile(HashMap<String, Vec<String>>),
}

const SHARED_KEY: &str = "identifiers";

/// Predicted identifiers, shared or per file
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    Shared(Vec<String>),
    PerFile(HashMap<String, Vec<String>>),
}

impl Default for Predictions {
    fn default() -> Self {
        Predictions::Shared(Vec::new())
    }
}

impl Predictions {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, PredictionError> {
        let content = std::fs::read_to_string(path).map_err(|source| PredictionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse JSON content; `origin` names the source in errors
    pub fn parse(content: &str, origin: &Path) -> Result<Self, PredictionError> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|source| PredictionError::Json {
                path: origin.to_path_buf(),
                source,
            })?;

        let raw: RawPredictions =
            serde_json::from_value(value).map_err(|_| PredictionError::Shape(origin.to_path_buf()))?;

        match raw {
            RawPredictions::Shared(shared) => Ok(Predictions::Shared(shared.identifiers)),
            // "identifiers" next to file keys is a mixed document
            RawPredictions::PerFile(map) if map.contains_key(SHARED_KEY) => {
                Err(PredictionError::Shape(origin.to_path_buf()))
            }
            RawPredictions::PerFile(map) => Ok(Predictions::PerFile(map)),
        }
    }

    /// Identifiers to verify for `file`
    ///
    /// Per-file lookup tries the path as given, then relative to `root`,
    /// then the bare file name.
    pub fn for_file(&self, file: &Path, root: &Path) -> &[String] {
        match self {
            Predictions::Shared(ids) => ids.as_slice(),
            Predictions::PerFile(map) => {
                let relative = file.strip_prefix(root).ok();
                let name = file.file_name().map(Path::new);

                [Some(file), relative, name]
                    .into_iter()
                    .flatten()
                    .find_map(|key| map.get(&*key.to_string_lossy()))
                    .map(Vec::as_slice)
                    .unwrap_or(&[])
            }
        }
    }

    /// Total identifiers across all entries
    pub fn len(&self) -> usize {
        match self {
            Predictions::Shared(ids) => ids.len(),
            Predictions::PerFile(map) => map.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
