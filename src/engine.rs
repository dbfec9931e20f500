//! Rule evaluation engine
//!
//! For an identifier, every symbol with exactly that name is a candidate.
//! A rule fires for the identifier when it fires for at least one candidate,
//! so a single qualifying overload is enough evidence.

use crate::rule::{Rule, RuleSet};
use crate::symbol::{Symbol, SymbolTable};

/// Evaluates a loaded rule set against symbols
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: RuleSet,
}

impl RuleEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Look up a rule by id
    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.get(id)
    }

    /// Bind `symbol` to the rule's variable and evaluate the conjunction
    ///
    /// A rule with no conditions matches every symbol its kind filter admits.
    pub fn match_rule(rule: &Rule, symbol: &Symbol) -> bool {
        rule.admits(symbol) && rule.conditions.iter().all(|c| c.matches(symbol))
    }

    /// Rules that match one symbol, in declaration order
    pub fn matching_rules<'a>(&'a self, symbol: &Symbol) -> Vec<&'a Rule> {
        self.rules
            .iter()
            .filter(|rule| Self::match_rule(rule, symbol))
            .collect()
    }

    /// Ids of rules matching any symbol named `identifier`, in declaration order
    pub fn match_all(&self, symbols: &SymbolTable, identifier: &str) -> Vec<String> {
        self.rules
            .iter()
            .filter(|rule| {
                symbols
                    .candidates(identifier)
                    .any(|symbol| Self::match_rule(rule, symbol))
            })
            .map(|rule| rule.id.clone())
            .collect()
    }
}
