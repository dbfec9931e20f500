//! Rule definition and loading
//!
//! Rule files are YAML (or JSON). Either a bare list of rules or a document
//! with a `rules` key is accepted:
//!
//! ```yaml
//! version: "1.0"
//! rules:
//!   - id: OBJC_ATTRIBUTE
//!     description: Symbols exposed to the Objective-C runtime
//!     pattern:
//!       find:
//!         target: S
//!       where:
//!         - S.attributes contains_any ['@objc', '@objcMembers']
//! ```
//!
//! The step-list form of `pattern` is accepted too:
//!
//! ```yaml
//!     pattern:
//!       - find:
//!           target: M
//!       - where:
//!           - M.name in ['viewDidLoad']
//! ```

use crate::condition::{ConditionError, ConditionExpression};
use crate::symbol::{Symbol, SymbolKind};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error while loading rules; always fatal for the run
#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("Rule #{0} has an empty id")]
    EmptyId(usize),

    #[error("Duplicate rule id '{0}'")]
    DuplicateId(String),

    #[error("Rule '{rule}' has an invalid target '{target}'")]
    InvalidTarget { rule: String, target: String },

    #[error("Rule '{rule}': unknown symbol kind '{kind}'")]
    UnknownKind { rule: String, kind: String },

    #[error("Rule '{rule}': invalid condition '{condition}': {source}")]
    Condition {
        rule: String,
        condition: String,
        source: ConditionError,
    },

    #[error("Rule '{rule}': condition '{condition}' refers to '{found}' but the pattern binds '{expected}'")]
    UnboundVariable {
        rule: String,
        condition: String,
        found: String,
        expected: String,
    },
}

/// Rule file format (for loading from YAML/JSON)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleFile {
    /// File format version
    #[serde(default)]
    pub version: Option<String>,

    /// Rules defined in this file
    pub rules: Vec<RuleDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RuleDocument {
    File(RuleFile),
    List(Vec<RuleDefinition>),
}

/// A rule as written in a rule file, before compilation
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    pub id: String,

    #[serde(default)]
    pub description: String,

    pub pattern: PatternDefinition,
}

/// The `pattern` block, in mapping or step-list form
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PatternDefinition {
    Steps(Vec<PatternStep>),
    Block(PatternStep),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternStep {
    #[serde(default)]
    pub find: Option<FindClause>,

    #[serde(default, rename = "where")]
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FindClause {
    #[serde(default = "default_target")]
    pub target: String,

    /// Restrict candidates to these symbol kinds (empty = every kind)
    #[serde(default)]
    pub kinds: Vec<String>,
}

fn default_target() -> String {
    "S".to_string()
}

impl PatternDefinition {
    /// Flatten into (find clause, conditions in declaration order)
    fn into_parts(self) -> (Option<FindClause>, Vec<String>) {
        match self {
            PatternDefinition::Block(step) => (step.find, step.conditions),
            PatternDefinition::Steps(steps) => {
                let mut find = None;
                let mut conditions = Vec::new();
                for step in steps {
                    if find.is_none() {
                        find = step.find;
                    }
                    conditions.extend(step.conditions);
                }
                (find, conditions)
            }
        }
    }
}

/// A compiled, immutable exclusion rule
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Unique rule identifier (e.g., "OBJC_ATTRIBUTE")
    pub id: String,

    pub description: String,

    /// Pattern variable the conditions are written against
    pub binding_variable: String,

    /// Symbol kinds the rule applies to (empty = all)
    pub kinds: Vec<SymbolKind>,

    /// Conjunction of predicates. An empty list matches every candidate.
    pub conditions: Vec<ConditionExpression>,
}

impl Rule {
    /// Create a rule with no conditions bound to `variable`
    pub fn new(id: &str, variable: &str) -> Self {
        Self {
            id: id.to_string(),
            description: String::new(),
            binding_variable: variable.to_string(),
            kinds: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Parse condition strings into a rule bound to `variable`
    pub fn with_conditions(id: &str, variable: &str, conditions: &[&str]) -> Result<Self, RuleLoadError> {
        let mut rule = Self::new(id, variable);
        for text in conditions {
            rule.push_condition(text)?;
        }
        Ok(rule)
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_kinds(mut self, kinds: &[SymbolKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    /// Compile a rule definition, rejecting anything malformed
    pub fn compile(definition: RuleDefinition) -> Result<Self, RuleLoadError> {
        let (find, conditions) = definition.pattern.into_parts();
        let find = find.unwrap_or(FindClause {
            target: default_target(),
            kinds: Vec::new(),
        });

        let target = find.target.trim();
        if target.is_empty() || !target.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(RuleLoadError::InvalidTarget {
                rule: definition.id,
                target: find.target,
            });
        }

        let mut kinds = Vec::with_capacity(find.kinds.len());
        for kind in &find.kinds {
            let parsed = kind.parse::<SymbolKind>().map_err(|_| RuleLoadError::UnknownKind {
                rule: definition.id.clone(),
                kind: kind.clone(),
            })?;
            kinds.push(parsed);
        }

        let mut rule = Self::new(&definition.id, target)
            .with_description(&definition.description)
            .with_kinds(&kinds);
        for text in &conditions {
            rule.push_condition(text)?;
        }
        Ok(rule)
    }

    fn push_condition(&mut self, text: &str) -> Result<(), RuleLoadError> {
        let condition =
            ConditionExpression::parse(text).map_err(|source| RuleLoadError::Condition {
                rule: self.id.clone(),
                condition: text.to_string(),
                source,
            })?;

        if condition.variable != self.binding_variable {
            return Err(RuleLoadError::UnboundVariable {
                rule: self.id.clone(),
                condition: text.to_string(),
                found: condition.variable,
                expected: self.binding_variable.clone(),
            });
        }

        self.conditions.push(condition);
        Ok(())
    }

    /// Whether the symbol's kind is one this rule applies to
    pub fn admits(&self, symbol: &Symbol) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&symbol.kind)
    }
}

/// Ordered collection of rules with unique ids
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set, rejecting empty or duplicate ids
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleLoadError> {
        let mut seen = HashSet::new();
        for (idx, rule) in rules.iter().enumerate() {
            if rule.id.trim().is_empty() {
                return Err(RuleLoadError::EmptyId(idx + 1));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleLoadError::DuplicateId(rule.id.clone()));
            }
        }
        Ok(Self { rules })
    }

    /// Load rules from a `.yaml`, `.yml` or `.json` file
    pub fn load(path: &Path) -> Result<Self, RuleLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let origin = path.display().to_string();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let rule_set = match ext {
            "yaml" | "yml" => Self::from_yaml_str(&content, &origin)?,
            "json" => Self::from_json_str(&content, &origin)?,
            _ => {
                return Err(RuleLoadError::Parse {
                    file: origin,
                    message: format!("Unknown rule file format: '{}'", ext),
                })
            }
        };

        log::info!("Loaded {} rule(s) from {}", rule_set.len(), origin);
        Ok(rule_set)
    }

    pub fn from_yaml_str(content: &str, origin: &str) -> Result<Self, RuleLoadError> {
        let document: RuleDocument =
            serde_yaml::from_str(content).map_err(|e| RuleLoadError::Parse {
                file: origin.to_string(),
                message: e.to_string(),
            })?;
        Self::from_document(document)
    }

    pub fn from_json_str(content: &str, origin: &str) -> Result<Self, RuleLoadError> {
        let document: RuleDocument =
            serde_json::from_str(content).map_err(|e| RuleLoadError::Parse {
                file: origin.to_string(),
                message: e.to_string(),
            })?;
        Self::from_document(document)
    }

    fn from_document(document: RuleDocument) -> Result<Self, RuleLoadError> {
        let definitions = match document {
            RuleDocument::File(file) => file.rules,
            RuleDocument::List(rules) => rules,
        };

        let rules = definitions
            .into_iter()
            .map(Rule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rules)
    }

    /// Rules in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
