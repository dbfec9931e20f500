//! Output formatters for verification results

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::report::RunReport;
use crate::verifier::FileReport;
use std::path::Path;

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format a whole-project run
    fn format(&self, report: &RunReport) -> String;

    /// Format a single-file report
    fn format_file(&self, report: &FileReport) -> String;
}

/// Percentage with one decimal, or "0%" when there is nothing to divide
pub fn percent(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        "0%".to_string()
    } else {
        format!("{:.1}%", numerator as f64 / denominator as f64 * 100.0)
    }
}

/// Write a report, creating parent directories as needed
pub fn write_report(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)
}
