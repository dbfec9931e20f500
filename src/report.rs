//! Aggregated results of a verification run

use crate::verifier::{FileVerificationResult, VerdictCounts};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of a run over a project
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Project root
    pub project: PathBuf,

    /// Worker pool size used
    pub workers: usize,

    /// One entry per file, in completion order
    pub results: Vec<FileVerificationResult>,

    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl RunReport {
    pub fn new(project: &Path, workers: usize) -> Self {
        Self {
            project: project.to_path_buf(),
            workers,
            results: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Append one file's result
    pub fn record(&mut self, result: FileVerificationResult) {
        self.results.push(result);
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    pub fn total_files(&self) -> usize {
        self.results.len()
    }

    pub fn success_files(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed_files(&self) -> usize {
        self.total_files() - self.success_files()
    }

    pub fn processing_time_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Throughput; 0 when no time elapsed
    pub fn files_per_second(&self) -> f64 {
        let secs = self.processing_time_seconds();
        if secs > 0.0 {
            self.total_files() as f64 / secs
        } else {
            0.0
        }
    }

    /// Prediction counts summed over successful files
    pub fn counts(&self) -> VerdictCounts {
        self.results
            .iter()
            .filter(|r| r.success)
            .fold(VerdictCounts::default(), |acc, r| VerdictCounts {
                total: acc.total + r.total_predictions,
                found_in_ast: acc.found_in_ast + r.found_in_ast,
                rule_matched: acc.rule_matched + r.rule_matched,
                excluded: acc.excluded + r.exclusions.len(),
            })
    }

    /// Failed results, for reporting
    pub fn failures(&self) -> impl Iterator<Item = &FileVerificationResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Get exit code (0 = success, 1 = every file failed)
    pub fn exit_code(&self) -> i32 {
        if self.total_files() > 0 && self.success_files() == 0 {
            1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn success(file: &str, predictions: usize, found: usize, matched: usize, excluded: &[&str]) -> FileVerificationResult {
        FileVerificationResult {
            file: PathBuf::from(file),
            success: true,
            exclusions: excluded.iter().map(|s| s.to_string()).collect(),
            total_predictions: predictions,
            found_in_ast: found,
            rule_matched: matched,
            details: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn test_counts_skip_failed_files() {
        let mut report = RunReport::new(Path::new("/project"), 5);
        report.record(success("A.swift", 4, 3, 2, &["a", "b"]));
        report.record(FileVerificationResult::failed(Path::new("B.swift"), "timed out"));
        report.record(success("C.swift", 2, 1, 1, &["c"]));

        assert_eq!(report.total_files(), 3);
        assert_eq!(report.success_files(), 2);
        assert_eq!(report.failed_files(), 1);
        assert_eq!(
            report.counts(),
            VerdictCounts {
                total: 6,
                found_in_ast: 4,
                rule_matched: 3,
                excluded: 3,
            }
        );
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_throughput() {
        let mut report = RunReport::new(Path::new("."), 2);
        report.record(success("A.swift", 0, 0, 0, &[]));
        report.record(success("B.swift", 0, 0, 0, &[]));
        assert_eq!(report.files_per_second(), 0.0);

        report.finish(Duration::from_millis(500));
        assert_eq!(report.processing_time_seconds(), 0.5);
        assert_eq!(report.files_per_second(), 4.0);
    }

    #[test]
    fn test_exit_code_when_everything_failed() {
        let mut report = RunReport::new(Path::new("."), 1);
        assert_eq!(report.exit_code(), 0);
        report.record(FileVerificationResult::failed(Path::new("A.swift"), "boom"));
        assert_eq!(report.exit_code(), 1);
    }
}
