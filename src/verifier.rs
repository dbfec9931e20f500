//! Strict verification of predicted identifiers
//!
//! An identifier is excluded only when it exists in the extracted syntax tree
//! *and* at least one rule fires for it. Confidence is binary: 1.0 for an
//! exclusion backed by a rule, 0.0 otherwise.

use crate::engine::RuleEngine;
use crate::rule::RuleSet;
use crate::symbol::SymbolTable;
use std::path::{Path, PathBuf};

pub const REASON_NOT_FOUND: &str = "Not found in AST (LLM hallucination)";
pub const REASON_NO_RULE: &str = "Found in AST but no rule match (insufficient evidence)";

/// Verification settings, fixed for the duration of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerifierConfig {
    /// Minimum confidence for an identifier to be listed as an exclusion
    pub min_confidence: f64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: 1.0,
        }
    }
}

/// Decision and evidence for one identifier
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierVerdict {
    pub identifier: String,
    pub found_in_ast: bool,
    /// Matched rule ids, in rule declaration order
    pub matched_rule_ids: Vec<String>,
    /// true = safe to exclude
    pub final_decision: bool,
    pub confidence: f64,
    pub reasoning: String,
}

impl IdentifierVerdict {
    pub fn rule_matched(&self) -> bool {
        !self.matched_rule_ids.is_empty()
    }
}

/// Verification outcome for one source file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileVerificationResult {
    pub file: PathBuf,
    pub success: bool,
    pub exclusions: Vec<String>,
    pub total_predictions: usize,
    pub found_in_ast: usize,
    pub rule_matched: usize,
    pub details: Vec<IdentifierVerdict>,
    pub error: Option<String>,
}

impl FileVerificationResult {
    /// A file that could not be verified
    pub fn failed(file: &Path, error: impl std::fmt::Display) -> Self {
        Self {
            file: file.to_path_buf(),
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// Aggregate counts over a list of verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerdictCounts {
    pub total: usize,
    pub found_in_ast: usize,
    pub rule_matched: usize,
    pub excluded: usize,
}

impl VerdictCounts {
    pub fn from_verdicts(verdicts: &[IdentifierVerdict]) -> Self {
        Self {
            total: verdicts.len(),
            found_in_ast: verdicts.iter().filter(|v| v.found_in_ast).count(),
            rule_matched: verdicts.iter().filter(|v| v.rule_matched()).count(),
            excluded: verdicts.iter().filter(|v| v.final_decision).count(),
        }
    }

    /// Predictions absent from the syntax tree over all predictions
    pub fn hallucination_rate(&self) -> f64 {
        ratio(self.total - self.found_in_ast, self.total)
    }

    /// Rule-matched predictions over predictions present in the syntax tree
    pub fn rule_match_rate(&self) -> f64 {
        ratio(self.rule_matched, self.found_in_ast)
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0
pub fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Single-file report with summary rates
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub counts: VerdictCounts,
    pub exclusions: Vec<String>,
    pub details: Vec<IdentifierVerdict>,
}

/// Combines AST presence with rule evidence
#[derive(Debug, Clone, Default)]
pub struct StrictVerifier {
    engine: RuleEngine,
    config: VerifierConfig,
}

impl StrictVerifier {
    pub fn new(rules: RuleSet, config: VerifierConfig) -> Self {
        Self {
            engine: RuleEngine::new(rules),
            config,
        }
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Decide one identifier
    pub fn verify_identifier(&self, identifier: &str, symbols: &SymbolTable) -> IdentifierVerdict {
        if !symbols.contains(identifier) {
            return IdentifierVerdict {
                identifier: identifier.to_string(),
                found_in_ast: false,
                matched_rule_ids: Vec::new(),
                final_decision: false,
                confidence: 0.0,
                reasoning: REASON_NOT_FOUND.to_string(),
            };
        }

        let matched = self.engine.match_all(symbols, identifier);
        let decision = !matched.is_empty();
        let reasoning = if decision {
            format!(
                "Matched {} strict rule(s): {}",
                matched.len(),
                matched.join(", ")
            )
        } else {
            REASON_NO_RULE.to_string()
        };

        IdentifierVerdict {
            identifier: identifier.to_string(),
            found_in_ast: true,
            matched_rule_ids: matched,
            final_decision: decision,
            confidence: if decision { 1.0 } else { 0.0 },
            reasoning,
        }
    }

    /// Decide every identifier, in input order
    pub fn verify<S: AsRef<str>>(&self, identifiers: &[S], symbols: &SymbolTable) -> Vec<IdentifierVerdict> {
        identifiers
            .iter()
            .map(|id| self.verify_identifier(id.as_ref(), symbols))
            .collect()
    }

    /// Identifiers whose exclusion is accepted at the configured confidence
    pub fn exclusions(&self, verdicts: &[IdentifierVerdict]) -> Vec<String> {
        verdicts
            .iter()
            .filter(|v| v.final_decision && v.confidence >= self.config.min_confidence)
            .map(|v| v.identifier.clone())
            .collect()
    }

    /// Verify one file's predictions against its symbols
    pub fn verify_file<S: AsRef<str>>(
        &self,
        file: &Path,
        identifiers: &[S],
        symbols: &SymbolTable,
    ) -> FileVerificationResult {
        let details = self.verify(identifiers, symbols);
        let counts = VerdictCounts::from_verdicts(&details);

        FileVerificationResult {
            file: file.to_path_buf(),
            success: true,
            exclusions: self.exclusions(&details),
            total_predictions: counts.total,
            found_in_ast: counts.found_in_ast,
            rule_matched: counts.rule_matched,
            details,
            error: None,
        }
    }

    /// Build the single-file report
    pub fn file_report(&self, details: Vec<IdentifierVerdict>) -> FileReport {
        FileReport {
            counts: VerdictCounts::from_verdicts(&details),
            exclusions: self.exclusions(&details),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;
    use crate::symbol::{Symbol, SymbolKind};
    use pretty_assertions::assert_eq;

    fn verifier() -> StrictVerifier {
        let rules = RuleSet::new(vec![Rule::with_conditions(
            "SYSTEM_LIFECYCLE_METHODS",
            "M",
            &[
                "M.modifiers contains_any ['override']",
                "M.typeInheritanceChain contains_any ['UIViewController']",
            ],
        )
        .unwrap()])
        .unwrap();
        StrictVerifier::new(rules, VerifierConfig::default())
    }

    fn symbols() -> SymbolTable {
        SymbolTable::new(vec![
            Symbol::new("viewDidLoad", SymbolKind::Method)
                .with_modifier("override")
                .with_ancestor("UIViewController"),
            Symbol::new("customMethod", SymbolKind::Method),
        ])
    }

    #[test]
    fn test_rule_backed_exclusion() {
        let verdict = verifier().verify_identifier("viewDidLoad", &symbols());
        assert!(verdict.found_in_ast);
        assert!(verdict.final_decision);
        assert_eq!(verdict.confidence, 1.0);
        assert_eq!(verdict.matched_rule_ids, vec!["SYSTEM_LIFECYCLE_METHODS"]);
        assert_eq!(verdict.reasoning, "Matched 1 strict rule(s): SYSTEM_LIFECYCLE_METHODS");
    }

    #[test]
    fn test_present_without_rule_is_kept() {
        let verdict = verifier().verify_identifier("customMethod", &symbols());
        assert!(verdict.found_in_ast);
        assert!(!verdict.final_decision);
        assert_eq!(verdict.confidence, 0.0);
        assert!(verdict.matched_rule_ids.is_empty());
        assert_eq!(verdict.reasoning, REASON_NO_RULE);
    }

    #[test]
    fn test_absent_identifier_is_a_hallucination() {
        let verdict = verifier().verify_identifier("nonExistent", &symbols());
        assert!(!verdict.found_in_ast);
        assert!(!verdict.final_decision);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.reasoning, REASON_NOT_FOUND);
    }

    #[test]
    fn test_no_rule_rescues_an_absent_identifier() {
        let verifier = StrictVerifier::new(
            RuleSet::new(vec![Rule::new("EVERYTHING", "S")]).unwrap(),
            VerifierConfig::default(),
        );
        let verdict = verifier.verify_identifier("ghost", &symbols());
        assert!(!verdict.final_decision);
        assert!(verdict.matched_rule_ids.is_empty());
    }

    #[test]
    fn test_confidence_tracks_decision() {
        let verifier = verifier();
        let verdicts = verifier.verify(&["viewDidLoad", "customMethod", "nonExistent"], &symbols());
        for v in &verdicts {
            assert_eq!(v.confidence == 1.0, v.final_decision);
            assert_eq!(v.final_decision, !v.matched_rule_ids.is_empty());
        }
    }

    #[test]
    fn test_verify_file_counts() {
        let ids = vec![
            "viewDidLoad".to_string(),
            "customMethod".to_string(),
            "nonExistent".to_string(),
        ];
        let result = verifier().verify_file(Path::new("ViewController.swift"), &ids, &symbols());
        assert!(result.success);
        assert_eq!(result.total_predictions, 3);
        assert_eq!(result.found_in_ast, 2);
        assert_eq!(result.rule_matched, 1);
        assert_eq!(result.exclusions, vec!["viewDidLoad"]);
        assert_eq!(result.details.len(), 3);
        assert_eq!(result.details[2].identifier, "nonExistent");
        assert!(result.error.is_none());
    }

    #[test]
    fn test_verification_is_idempotent() {
        let verifier = verifier();
        let ids = ["customMethod", "viewDidLoad", "nonExistent", "viewDidLoad"];
        let first = verifier.verify(&ids, &symbols());
        let second = verifier.verify(&ids, &symbols());
        assert_eq!(first, second);
    }

    #[test]
    fn test_min_confidence_filters_exclusions() {
        let strict = verifier();
        let verdicts = strict.verify(&["viewDidLoad"], &symbols());
        assert_eq!(strict.exclusions(&verdicts), vec!["viewDidLoad"]);

        let impossible = StrictVerifier::new(
            strict.engine().rules().clone(),
            VerifierConfig { min_confidence: 1.5 },
        );
        assert!(impossible.exclusions(&verdicts).is_empty());
    }

    #[test]
    fn test_failed_result() {
        let result = FileVerificationResult::failed(Path::new("Broken.swift"), "AST extraction failed");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("AST extraction failed"));
        assert_eq!(result.total_predictions, 0);
    }

    #[test]
    fn test_file_report_rates() {
        let verifier = verifier();
        let verdicts = verifier.verify(&["viewDidLoad", "customMethod", "nonExistent", "ghost"], &symbols());
        let report = verifier.file_report(verdicts);
        assert_eq!(report.counts.total, 4);
        assert_eq!(report.counts.excluded, 1);
        assert_eq!(report.counts.hallucination_rate(), 0.5);
        assert_eq!(report.counts.rule_match_rate(), 0.5);
        assert_eq!(report.exclusions, vec!["viewDidLoad"]);
    }

    #[test]
    fn test_rates_with_zero_denominators() {
        let counts = VerdictCounts::default();
        assert_eq!(counts.hallucination_rate(), 0.0);
        assert_eq!(counts.rule_match_rate(), 0.0);
    }
}
