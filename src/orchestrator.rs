//! Parallel verification of a project's files
//!
//! Files are processed on a fixed-size rayon pool. Each worker extracts one
//! file's symbols, verifies that file's predictions and sends the result over
//! a channel; the calling thread is the only writer of the run report.

use crate::extractor::{ExtractionError, SymbolExtractor};
use crate::predictions::Predictions;
use crate::report::RunReport;
use crate::symbol::SymbolTable;
use crate::verifier::{FileReport, FileVerificationResult, StrictVerifier};
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Per-file processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Queued,
    Extracting,
    Verifying,
    Succeeded,
    Failed,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileState::Queued => "queued",
            FileState::Extracting => "extracting",
            FileState::Verifying => "verifying",
            FileState::Succeeded => "succeeded",
            FileState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

fn transition(file: &Path, state: FileState) {
    log::debug!("{}: {}", file.display(), state);
}

/// Runs extraction and verification across files
pub struct Orchestrator {
    verifier: StrictVerifier,
    extractor: Arc<dyn SymbolExtractor>,
    workers: usize,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(verifier: StrictVerifier, extractor: Arc<dyn SymbolExtractor>) -> Self {
        Self {
            verifier,
            extractor,
            workers: 5,
            timeout: Duration::from_secs(30),
        }
    }

    /// Pool size; at least one worker
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Per-file extraction timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn verifier(&self) -> &StrictVerifier {
        &self.verifier
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Verify every file; one result per file regardless of failures
    pub fn run(
        &self,
        project: &Path,
        files: &[PathBuf],
        predictions: &Predictions,
    ) -> Result<RunReport, OrchestratorError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;

        log::info!(
            "Verifying {} files with {} workers ({}s timeout)",
            files.len(),
            self.workers,
            self.timeout.as_secs()
        );
        for file in files {
            transition(file, FileState::Queued);
        }

        let start = Instant::now();
        let mut report = RunReport::new(project, self.workers);
        let (tx, rx) = mpsc::channel::<FileVerificationResult>();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                pool.install(|| {
                    files.par_iter().for_each_with(tx, |tx, file| {
                        let identifiers = predictions.for_file(file, project);
                        // Receiver lives until every sender is dropped
                        let _ = tx.send(self.process_file(file, identifiers));
                    });
                });
            });

            for result in rx {
                report.record(result);
            }
        });

        report.finish(start.elapsed());
        log::info!(
            "Verified {} files ({} failed) in {:.2}s",
            report.total_files(),
            report.failed_files(),
            report.processing_time_seconds()
        );
        Ok(report)
    }

    /// Extract and verify a single file, converting failures into a failed result
    pub fn process_file(&self, file: &Path, identifiers: &[String]) -> FileVerificationResult {
        match self.extract(file) {
            Ok(symbols) => {
                transition(file, FileState::Verifying);
                let result = self.verifier.verify_file(file, identifiers, &symbols);
                transition(file, FileState::Succeeded);
                result
            }
            Err(e) => {
                transition(file, FileState::Failed);
                log::warn!("{}: {}", file.display(), e);
                FileVerificationResult::failed(file, e)
            }
        }
    }

    /// Single-file mode; extraction failure is returned to the caller
    pub fn check_file(&self, file: &Path, identifiers: &[String]) -> Result<FileReport, ExtractionError> {
        let symbols = self.extract(file)?;
        let details = self.verifier.verify(identifiers, &symbols);
        Ok(self.verifier.file_report(details))
    }

    fn extract(&self, file: &Path) -> Result<SymbolTable, ExtractionError> {
        transition(file, FileState::Extracting);
        let symbols = self.extractor.extract(file, self.timeout)?;
        log::debug!("{}: {} symbols", file.display(), symbols.len());
        Ok(SymbolTable::new(symbols))
    }
}
