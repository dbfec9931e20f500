//! Source file discovery under a project root

use crate::config::FilesConfig;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Project path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("No source files found under {0}")]
    NoFiles(PathBuf),
}

/// Include/exclude filter over paths relative to the project root
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    include: GlobSet,
    exclude: GlobSet,
}

impl FileDiscovery {
    pub fn new(files: &FilesConfig) -> Result<Self, DiscoveryError> {
        Ok(Self {
            include: build_set(&files.include)?,
            exclude: build_set(&files.exclude)?,
        })
    }

    /// Whether a root-relative path is selected
    pub fn is_selected(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    /// Selected files under `root`, sorted
    ///
    /// A root that is itself a file is returned as the only entry.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        if !root.exists() {
            return Err(DiscoveryError::NotFound(root.to_path_buf()));
        }
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }

        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable path under {}: {}", root.display(), e);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .strip_prefix(root)
                    .map(|relative| self.is_selected(relative))
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();

        if files.is_empty() {
            return Err(DiscoveryError::NoFiles(root.to_path_buf()));
        }

        files.sort();
        log::info!("Discovered {} source files under {}", files.len(), root.display());
        Ok(files)
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, DiscoveryError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
