//! JSON output formatter

use super::{percent, OutputFormatter};
use crate::report::RunReport;
use crate::verifier::{FileReport, FileVerificationResult, IdentifierVerdict};
use serde::Serialize;

/// JSON formatter for machine-readable reports
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

#[derive(Serialize)]
struct JsonRun<'a> {
    project: String,
    total_files: usize,
    success_files: usize,
    failed_files: usize,
    processing_time_seconds: f64,
    files_per_second: f64,
    workers: usize,
    results: Vec<JsonFileResult<'a>>,
}

/// Failed files carry only `file`, `success` and `error`
#[derive(Serialize)]
struct JsonFileResult<'a> {
    file: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclusions: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_predictions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    found_in_ast: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule_matched: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<JsonVerdict<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonVerdict<'a> {
    identifier: &'a str,
    found_in_ast: bool,
    rule_matched: bool,
    matched_rules: &'a [String],
    final_decision: bool,
    confidence: f64,
    reasoning: &'a str,
}

#[derive(Serialize)]
struct JsonFileReport<'a> {
    summary: JsonSummary,
    exclusions: &'a [String],
    details: Vec<JsonVerdict<'a>>,
}

#[derive(Serialize)]
struct JsonSummary {
    total_llm_predictions: usize,
    found_in_ast: usize,
    rule_matched: usize,
    final_exclusions: usize,
    hallucination_rate: String,
    rule_match_rate: String,
}

fn verdict(v: &IdentifierVerdict) -> JsonVerdict<'_> {
    JsonVerdict {
        identifier: &v.identifier,
        found_in_ast: v.found_in_ast,
        rule_matched: v.rule_matched(),
        matched_rules: &v.matched_rule_ids,
        final_decision: v.final_decision,
        confidence: v.confidence,
        reasoning: &v.reasoning,
    }
}

fn file_result(r: &FileVerificationResult) -> JsonFileResult<'_> {
    let file = r.file.display().to_string();
    if !r.success {
        return JsonFileResult {
            file,
            success: false,
            exclusions: None,
            total_predictions: None,
            found_in_ast: None,
            rule_matched: None,
            details: None,
            error: r.error.as_deref(),
        };
    }

    JsonFileResult {
        file,
        success: true,
        exclusions: Some(r.exclusions.as_slice()),
        total_predictions: Some(r.total_predictions),
        found_in_ast: Some(r.found_in_ast),
        rule_matched: Some(r.rule_matched),
        details: Some(r.details.iter().map(verdict).collect()),
        error: None,
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &RunReport) -> String {
        let output = JsonRun {
            project: report.project.display().to_string(),
            total_files: report.total_files(),
            success_files: report.success_files(),
            failed_files: report.failed_files(),
            processing_time_seconds: report.processing_time_seconds(),
            files_per_second: report.files_per_second(),
            workers: report.workers,
            results: report.results.iter().map(file_result).collect(),
        };
        self.render(&output)
    }

    fn format_file(&self, report: &FileReport) -> String {
        let counts = &report.counts;
        let output = JsonFileReport {
            summary: JsonSummary {
                total_llm_predictions: counts.total,
                found_in_ast: counts.found_in_ast,
                rule_matched: counts.rule_matched,
                final_exclusions: counts.excluded,
                hallucination_rate: percent(counts.total - counts.found_in_ast, counts.total),
                rule_match_rate: percent(counts.rule_matched, counts.found_in_ast),
            },
            exclusions: &report.exclusions,
            details: report.details.iter().map(verdict).collect(),
        };
        self.render(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::VerdictCounts;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    fn excluded_verdict() -> IdentifierVerdict {
        IdentifierVerdict {
            identifier: "viewDidLoad".to_string(),
            found_in_ast: true,
            matched_rule_ids: vec!["SYSTEM_LIFECYCLE_METHODS".to_string()],
            final_decision: true,
            confidence: 1.0,
            reasoning: "Matched 1 strict rule(s): SYSTEM_LIFECYCLE_METHODS".to_string(),
        }
    }

    fn sample_run() -> RunReport {
        let mut report = RunReport::new(Path::new("/project"), 5);
        report.record(FileVerificationResult {
            file: PathBuf::from("/project/A.swift"),
            success: true,
            exclusions: vec!["viewDidLoad".to_string()],
            total_predictions: 1,
            found_in_ast: 1,
            rule_matched: 1,
            details: vec![excluded_verdict()],
            error: None,
        });
        report.record(FileVerificationResult::failed(Path::new("/project/B.swift"), "Extractor timed out after 30.0s"));
        report.finish(Duration::from_secs(2));
        report
    }

    #[test]
    fn test_run_report_fields() {
        let output: Value = serde_json::from_str(&JsonFormatter::new().format(&sample_run())).unwrap();

        assert_eq!(output["project"], "/project");
        assert_eq!(output["total_files"], 2);
        assert_eq!(output["success_files"], 1);
        assert_eq!(output["failed_files"], 1);
        assert_eq!(output["processing_time_seconds"], 2.0);
        assert_eq!(output["files_per_second"], 1.0);
        assert_eq!(output["workers"], 5);

        assert_eq!(
            output["results"][0],
            json!({
                "file": "/project/A.swift",
                "success": true,
                "exclusions": ["viewDidLoad"],
                "total_predictions": 1,
                "found_in_ast": 1,
                "rule_matched": 1,
                "details": [{
                    "identifier": "viewDidLoad",
                    "found_in_ast": true,
                    "rule_matched": true,
                    "matched_rules": ["SYSTEM_LIFECYCLE_METHODS"],
                    "final_decision": true,
                    "confidence": 1.0,
                    "reasoning": "Matched 1 strict rule(s): SYSTEM_LIFECYCLE_METHODS"
                }]
            })
        );
        assert_eq!(
            output["results"][1],
            json!({
                "file": "/project/B.swift",
                "success": false,
                "error": "Extractor timed out after 30.0s"
            })
        );
    }

    #[test]
    fn test_file_report_summary() {
        let report = FileReport {
            counts: VerdictCounts {
                total: 3,
                found_in_ast: 2,
                rule_matched: 1,
                excluded: 1,
            },
            exclusions: vec!["viewDidLoad".to_string()],
            details: vec![excluded_verdict()],
        };
        let output: Value = serde_json::from_str(&JsonFormatter::new().pretty().format_file(&report)).unwrap();

        assert_eq!(
            output["summary"],
            json!({
                "total_llm_predictions": 3,
                "found_in_ast": 2,
                "rule_matched": 1,
                "final_exclusions": 1,
                "hallucination_rate": "33.3%",
                "rule_match_rate": "50.0%"
            })
        );
        assert_eq!(output["exclusions"], json!(["viewDidLoad"]));
        assert_eq!(output["details"][0]["matched_rules"], json!(["SYSTEM_LIFECYCLE_METHODS"]));
    }

    #[test]
    fn test_empty_file_report_rates() {
        let report = FileReport {
            counts: VerdictCounts::default(),
            exclusions: Vec::new(),
            details: Vec::new(),
        };
        let output: Value = serde_json::from_str(&JsonFormatter::new().format_file(&report)).unwrap();
        assert_eq!(output["summary"]["hallucination_rate"], "0%");
        assert_eq!(output["summary"]["rule_match_rate"], "0%");
    }
}
