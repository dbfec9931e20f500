//! Configuration for verification runs
//!
//! Reads configuration from `strict-verifier.yaml` / `.yml` / `.json` in the
//! working directory, or from an explicit path. CLI flags are merged on top
//! and the result is validated before any file is processed.

use crate::verifier::VerifierConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Worker pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Concurrent files (0 = one per CPU)
    pub workers: usize,

    /// Per-file extraction timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Minimum confidence for an exclusion to be reported
    pub min_confidence: f64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            min_confidence: 1.0,
        }
    }
}

/// External analyzer invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Analyzer executable
    pub path: PathBuf,

    /// Extra arguments placed before the source file
    pub args: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("SwiftASTAnalyzer/.build/release/SwiftASTAnalyzer"),
            args: Vec::new(),
        }
    }
}

/// File handling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Include patterns
    pub include: Vec<String>,

    /// Exclude patterns
    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: vec!["**/*.swift".to_string()],
            exclude: vec![
                "**/.build/**".to_string(),
                "**/Pods/**".to_string(),
                "**/DerivedData/**".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Rule file
    pub rules: PathBuf,

    /// Directory for reports when no output path is given
    pub results_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            rules: PathBuf::from("rules/swift_exclusion_rules.yaml"),
            results_dir: PathBuf::from("data/results"),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub verification: VerificationConfig,
    pub extractor: ExtractorConfig,
    pub files: FilesConfig,
    pub paths: PathsConfig,
}

/// CLI overrides; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub workers: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub min_confidence: Option<f64>,
    pub analyzer: Option<PathBuf>,
    pub rules: Option<PathBuf>,
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration from the working directory, or defaults
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_dir(Path::new("."))
    }

    /// Load the first default-named config file in `dir`, or defaults
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let config_names = [
            "strict-verifier.yaml",
            "strict-verifier.yml",
            "strict-verifier.json",
        ];

        for name in &config_names {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        Ok(Self::default())
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(&mut self, cli: CliOverrides) {
        if let Some(w) = cli.workers {
            self.engine.workers = w;
        }
        if let Some(t) = cli.timeout_secs {
            self.engine.timeout_secs = t;
        }
        if let Some(c) = cli.min_confidence {
            self.verification.min_confidence = c;
        }
        if let Some(a) = cli.analyzer {
            self.extractor.path = a;
        }
        if let Some(r) = cli.rules {
            self.paths.rules = r;
        }
    }

    /// Reject values that cannot drive a run
    pub fn validate(&self) -> Result<(), ConfigError> {
        let confidence = self.verification.min_confidence;
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(ConfigError::Invalid(format!(
                "min_confidence must be between 0 and 1, got {}",
                confidence
            )));
        }
        if self.engine.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.files.include.is_empty() {
            return Err(ConfigError::Invalid(
                "files.include must list at least one pattern".to_string(),
            ));
        }
        if self.extractor.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("extractor.path is empty".to_string()));
        }
        Ok(())
    }

    /// Per-file extraction timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.engine.timeout_secs)
    }

    /// Effective pool size
    pub fn worker_count(&self) -> usize {
        if self.engine.workers == 0 {
            num_cpus::get()
        } else {
            self.engine.workers
        }
    }

    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            min_confidence: self.verification.min_confidence,
        }
    }
}
