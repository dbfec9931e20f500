//! Human-readable text output formatter

use super::{percent, OutputFormatter};
use crate::report::RunReport;
use crate::verifier::{FileReport, IdentifierVerdict, VerdictCounts};
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// List every identifier verdict in single-file reports
    pub show_details: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_details: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn paint(&self, s: String, style: fn(ColoredString) -> ColoredString) -> String {
        if self.colored {
            style(s.normal()).to_string()
        } else {
            s
        }
    }

    fn heading(&self, s: &str) -> String {
        self.paint(s.to_string(), |c| c.bold())
    }

    fn push_counts(&self, output: &mut String, counts: &VerdictCounts) {
        output.push_str(&format!("  LLM predictions: {}\n", counts.total));
        output.push_str(&format!(
            "  Found in AST:    {}/{} ({})\n",
            counts.found_in_ast,
            counts.total,
            percent(counts.found_in_ast, counts.total)
        ));
        output.push_str(&format!(
            "  Rule matched:    {}/{} ({})\n",
            counts.rule_matched,
            counts.found_in_ast,
            percent(counts.rule_matched, counts.found_in_ast)
        ));
        output.push_str(&format!(
            "  Exclusions:      {}\n",
            self.paint(counts.excluded.to_string(), |c| c.green().bold())
        ));

        let hallucinated = counts.total - counts.found_in_ast;
        let line = format!(
            "  Hallucination:   {}/{} ({})",
            hallucinated,
            counts.total,
            percent(hallucinated, counts.total)
        );
        output.push_str(&if hallucinated > 0 {
            self.paint(line, |c| c.yellow())
        } else {
            line
        });
        output.push('\n');
    }

    fn verdict_line(&self, v: &IdentifierVerdict) -> String {
        let mark = if v.final_decision {
            self.paint("EXCLUDE".to_string(), |c| c.green().bold())
        } else if v.found_in_ast {
            self.paint("KEEP".to_string(), |c| c.normal())
        } else {
            self.paint("MISSING".to_string(), |c| c.yellow())
        };
        format!("  {:<8} {} - {}", mark, v.identifier, v.reasoning)
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &RunReport) -> String {
        let mut output = String::new();

        output.push_str(&self.heading("Verification summary"));
        output.push('\n');
        output.push_str(&format!("  Project:  {}\n", report.project.display()));
        output.push_str(&format!("  Files:    {}\n", report.total_files()));
        output.push_str(&format!(
            "  Success:  {}\n",
            self.paint(report.success_files().to_string(), |c| c.green())
        ));
        let failed = report.failed_files().to_string();
        output.push_str(&format!(
            "  Failed:   {}\n",
            if report.failed_files() > 0 {
                self.paint(failed, |c| c.red().bold())
            } else {
                failed
            }
        ));

        if report.success_files() > 0 {
            output.push('\n');
            self.push_counts(&mut output, &report.counts());
        }

        let failures: Vec<_> = report.failures().collect();
        if !failures.is_empty() {
            output.push('\n');
            output.push_str(&self.heading("Failed files"));
            output.push('\n');
            for failure in failures {
                output.push_str(&format!(
                    "  {}: {}\n",
                    failure.file.display(),
                    self.paint(failure.error.clone().unwrap_or_default(), |c| c.red())
                ));
            }
        }

        output.push_str(&format!(
            "\nProcessed in {:.2}s ({:.2} files/sec, {} workers)\n",
            report.processing_time_seconds(),
            report.files_per_second(),
            report.workers
        ));

        output
    }

    fn format_file(&self, report: &FileReport) -> String {
        let mut output = String::new();

        if self.show_details && !report.details.is_empty() {
            for v in &report.details {
                output.push_str(&self.verdict_line(v));
                output.push('\n');
            }
            output.push('\n');
        }

        output.push_str(&self.heading("Summary"));
        output.push('\n');
        self.push_counts(&mut output, &report.counts);

        if !report.exclusions.is_empty() {
            output.push_str(&format!("\nExcluded: {}\n", report.exclusions.join(", ")));
        }

        output
    }
}
