//! Primitive predicates over a bound symbol
//!
//! Condition strings from rule files are parsed once, at load time, into a
//! [`ConditionExpression`] and evaluated as data afterwards. The grammar is
//!
//! ```text
//! <variable>.<path> <operator> <literal>
//!
//! S.attributes contains_any ['@objc', '@objcMembers']
//! M.name in ['viewDidLoad', 'viewWillAppear']
//! M.kind == 'method'
//! M.parent.name != 'AppDelegate'
//! ```
//!
//! Tokens are separated by whitespace. List literals are bracketed and
//! comma-separated; items and scalars may be single- or double-quoted.

use crate::symbol::Symbol;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Error while parsing a condition string
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("Malformed condition '{0}': expected '<variable>.<path> <operator> <literal>'")]
    Malformed(String),

    #[error("Unknown operator '{0}' (expected contains_any, in, == or !=)")]
    UnknownOperator(String),

    #[error("Unknown symbol path '{0}'")]
    UnknownPath(String),

    #[error("Invalid literal '{literal}': {reason}")]
    InvalidLiteral { literal: String, reason: String },

    #[error("Operator '{operator}' cannot be applied here: {detail}")]
    TypeMismatch { operator: Operator, detail: String },
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    ContainsAny,
    In,
    Eq,
    Ne,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::ContainsAny => "contains_any",
            Operator::In => "in",
            Operator::Eq => "==",
            Operator::Ne => "!=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Operator {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contains_any" => Ok(Operator::ContainsAny),
            "in" => Ok(Operator::In),
            "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            _ => Err(ConditionError::UnknownOperator(s.to_string())),
        }
    }
}

/// Addressable symbol attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolField {
    Name,
    Kind,
    AccessLevel,
    Attributes,
    InheritanceChain,
    Modifiers,
    Conforms,
    ParentName,
}

impl SymbolField {
    /// Parse a path as written after `<variable>.`
    pub fn parse(path: &str) -> Result<Self, ConditionError> {
        match path {
            "name" => Ok(SymbolField::Name),
            "kind" => Ok(SymbolField::Kind),
            "accessLevel" | "access_level" => Ok(SymbolField::AccessLevel),
            "attributes" => Ok(SymbolField::Attributes),
            "typeInheritanceChain" | "inheritanceChain" | "inherits" => {
                Ok(SymbolField::InheritanceChain)
            }
            "modifiers" => Ok(SymbolField::Modifiers),
            "conforms" => Ok(SymbolField::Conforms),
            "parent.name" | "parentType" | "parent_type" => Ok(SymbolField::ParentName),
            _ => Err(ConditionError::UnknownPath(path.to_string())),
        }
    }

    /// Canonical path spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolField::Name => "name",
            SymbolField::Kind => "kind",
            SymbolField::AccessLevel => "accessLevel",
            SymbolField::Attributes => "attributes",
            SymbolField::InheritanceChain => "typeInheritanceChain",
            SymbolField::Modifiers => "modifiers",
            SymbolField::Conforms => "conforms",
            SymbolField::ParentName => "parent.name",
        }
    }

    /// Whether the field holds a list of strings rather than one string
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            SymbolField::Attributes
                | SymbolField::InheritanceChain
                | SymbolField::Modifiers
                | SymbolField::Conforms
        )
    }

    /// Resolve the field on a symbol; `None` when the symbol does not carry it
    pub fn resolve<'a>(&self, symbol: &'a Symbol) -> Option<Operand<'a>> {
        match self {
            SymbolField::Name => Some(Operand::Scalar(&symbol.name)),
            SymbolField::Kind => Some(Operand::Scalar(symbol.kind.as_str())),
            SymbolField::AccessLevel => symbol.access_level.map(|a| Operand::Scalar(a.as_str())),
            SymbolField::ParentName => symbol.parent_type.as_deref().map(Operand::Scalar),
            SymbolField::Attributes => Some(Operand::List(&symbol.attributes)),
            SymbolField::InheritanceChain => Some(Operand::List(&symbol.inheritance_chain)),
            SymbolField::Modifiers => Some(Operand::List(&symbol.modifiers)),
            SymbolField::Conforms => Some(Operand::List(&symbol.conforms)),
        }
    }
}

/// A resolved field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand<'a> {
    Scalar(&'a str),
    List(&'a [String]),
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Scalar(String),
    List(Vec<String>),
}

impl Literal {
    /// Parse a literal token: `'x'`, `x`, or `['a', "b", c]`
    pub fn parse(text: &str) -> Result<Self, ConditionError> {
        let text = text.trim();

        if let Some(inner) = text.strip_prefix('[') {
            let inner = inner.strip_suffix(']').ok_or_else(|| ConditionError::InvalidLiteral {
                literal: text.to_string(),
                reason: "unterminated list".to_string(),
            })?;
            return split_list(inner)
                .map(Literal::List)
                .map_err(|reason| ConditionError::InvalidLiteral {
                    literal: text.to_string(),
                    reason,
                });
        }

        unquote(text)
            .map(|s| Literal::Scalar(s.to_string()))
            .ok_or_else(|| ConditionError::InvalidLiteral {
                literal: text.to_string(),
                reason: "unbalanced quotes".to_string(),
            })
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Scalar(s) => write!(f, "'{}'", s),
            Literal::List(items) => {
                let quoted: Vec<String> = items.iter().map(|i| format!("'{}'", i)).collect();
                write!(f, "[{}]", quoted.join(", "))
            }
        }
    }
}

/// A parsed primitive predicate
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionExpression {
    /// Pattern variable the condition is written against (e.g. `S`)
    pub variable: String,
    pub path: SymbolField,
    pub operator: Operator,
    pub literal: Literal,
}

fn condition_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_]\w*)\.([A-Za-z_][\w.]*)\s+(\S+)\s+(\S.*?)\s*$")
            .expect("condition grammar regex is valid")
    })
}

impl ConditionExpression {
    /// Parse and type-check a condition string
    pub fn parse(text: &str) -> Result<Self, ConditionError> {
        let caps = condition_regex()
            .captures(text)
            .ok_or_else(|| ConditionError::Malformed(text.trim().to_string()))?;

        let variable = caps[1].to_string();
        let path = SymbolField::parse(&caps[2])?;
        let operator: Operator = caps[3].parse()?;
        let literal = Literal::parse(&caps[4])?;

        let condition = Self {
            variable,
            path,
            operator,
            literal,
        };
        condition.check_types()?;
        Ok(condition)
    }

    fn check_types(&self) -> Result<(), ConditionError> {
        let mismatch = |detail: String| ConditionError::TypeMismatch {
            operator: self.operator,
            detail,
        };

        match self.operator {
            Operator::ContainsAny => {
                if !matches!(self.literal, Literal::List(_)) {
                    return Err(mismatch("right-hand side must be a list".to_string()));
                }
            }
            Operator::In => {
                if self.path.is_list() {
                    return Err(mismatch(format!(
                        "'{}' is a list; use contains_any",
                        self.path.as_str()
                    )));
                }
                if !matches!(self.literal, Literal::List(_)) {
                    return Err(mismatch("right-hand side must be a list".to_string()));
                }
            }
            Operator::Eq | Operator::Ne => {
                if self.path.is_list() {
                    return Err(mismatch(format!(
                        "'{}' is a list; use contains_any",
                        self.path.as_str()
                    )));
                }
                if !matches!(self.literal, Literal::Scalar(_)) {
                    return Err(mismatch("right-hand side must be a single value".to_string()));
                }
            }
        }

        Ok(())
    }

    /// Evaluate against the symbol bound to this condition's variable
    ///
    /// An attribute the symbol does not carry never matches, whatever the
    /// operator.
    pub fn matches(&self, symbol: &Symbol) -> bool {
        let Some(operand) = self.path.resolve(symbol) else {
            return false;
        };

        match (self.operator, operand, &self.literal) {
            (Operator::ContainsAny, Operand::List(items), Literal::List(values)) => {
                items.iter().any(|item| values.contains(item))
            }
            (Operator::ContainsAny, Operand::Scalar(value), Literal::List(values))
            | (Operator::In, Operand::Scalar(value), Literal::List(values)) => {
                values.iter().any(|v| v == value)
            }
            (Operator::Eq, Operand::Scalar(value), Literal::Scalar(expected)) => value == expected,
            (Operator::Ne, Operand::Scalar(value), Literal::Scalar(expected)) => value != expected,
            // Rejected by check_types
            _ => false,
        }
    }
}

impl fmt::Display for ConditionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} {} {}",
            self.variable,
            self.path.as_str(),
            self.operator,
            self.literal
        )
    }
}

/// Evaluate one condition against one bound symbol
pub fn evaluate(condition: &ConditionExpression, symbol: &Symbol) -> bool {
    condition.matches(symbol)
}

/// Strip one pair of matching quotes; `None` if quotes are unbalanced
fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    for quote in ['\'', '"'] {
        if let Some(rest) = s.strip_prefix(quote) {
            return rest.strip_suffix(quote);
        }
        if s.ends_with(quote) {
            return None;
        }
    }
    Some(s)
}

/// Split the inside of a list literal on commas outside quotes
fn split_list(inner: &str) -> Result<Vec<String>, String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in inner.chars() {
        match (quote, c) {
            (None, '\'' | '"') => {
                quote = Some(c);
                current.push(c);
            }
            (Some(q), _) if c == q => {
                quote = None;
                current.push(c);
            }
            (None, ',') => {
                push_item(&mut items, &current)?;
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    push_item(&mut items, &current)?;
    Ok(items)
}

fn push_item(items: &mut Vec<String>, raw: &str) -> Result<(), String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(());
    }
    let item = unquote(raw).ok_or_else(|| format!("unbalanced quotes in '{}'", raw))?;
    items.push(item.to_string());
    Ok(())
}
