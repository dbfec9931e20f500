//! Strict Verifier - rule-backed exclusion of predicted identifiers
//!
//! A language model proposes identifiers in a source project that are safe
//! to exclude from obfuscation. Each proposal is accepted only when the
//! identifier exists in the file's extracted syntax tree and at least one
//! declarative rule matches the declaring symbol.
//!
//! # Architecture
//!
//! ```text
//! CLI -> Orchestrator -> SymbolExtractor -> StrictVerifier -> RuleEngine -> ConditionExpression
//! ```
//!
//! # Rule files
//!
//! ```yaml
//! version: "1.0"
//! rules:
//!   - id: SYSTEM_LIFECYCLE_METHODS
//!     description: "UIKit lifecycle overrides"
//!     pattern:
//!       find: { target: M, kinds: [method] }
//!       where:
//!         - "M.modifiers contains_any ['override']"
//!         - "M.typeInheritanceChain contains_any ['UIViewController']"
//! ```

pub mod condition;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod extractor;
pub mod orchestrator;
pub mod output;
pub mod predictions;
pub mod report;
pub mod rule;
pub mod symbol;
pub mod verifier;

// Re-export main types
pub use condition::{evaluate, ConditionError, ConditionExpression, Literal, Operator, SymbolField};
pub use config::{CliOverrides, Config, ConfigError};
pub use discovery::{DiscoveryError, FileDiscovery};
pub use engine::RuleEngine;
pub use extractor::{ExtractionError, ProcessExtractor, SymbolExtractor};
pub use orchestrator::{FileState, Orchestrator, OrchestratorError};
pub use predictions::{PredictionError, Predictions};
pub use report::RunReport;
pub use rule::{Rule, RuleLoadError, RuleSet};
pub use symbol::{AccessLevel, Symbol, SymbolKind, SymbolTable};
pub use verifier::{
    FileReport, FileVerificationResult, IdentifierVerdict, StrictVerifier, VerdictCounts,
    VerifierConfig,
};
