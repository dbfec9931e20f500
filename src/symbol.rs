//! Symbol records produced by the syntax-tree extractor

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Declaration kind of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    Class,
    Struct,
    Enum,
    Protocol,
    Method,
    Property,
    Variable,
    EnumCase,
    Initializer,
    Deinitializer,
    Subscript,
    Extension,
    /// Any kind the extractor reports that is not listed above
    #[serde(other)]
    Other,
}

impl SymbolKind {
    /// Name as it appears in extractor output and rule literals
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::Protocol => "protocol",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
            SymbolKind::Variable => "variable",
            SymbolKind::EnumCase => "enumCase",
            SymbolKind::Initializer => "initializer",
            SymbolKind::Deinitializer => "deinitializer",
            SymbolKind::Subscript => "subscript",
            SymbolKind::Extension => "extension",
            SymbolKind::Other => "other",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SymbolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "class" => Ok(SymbolKind::Class),
            "struct" => Ok(SymbolKind::Struct),
            "enum" => Ok(SymbolKind::Enum),
            "protocol" => Ok(SymbolKind::Protocol),
            "method" => Ok(SymbolKind::Method),
            "property" => Ok(SymbolKind::Property),
            "variable" => Ok(SymbolKind::Variable),
            "enumCase" => Ok(SymbolKind::EnumCase),
            "initializer" => Ok(SymbolKind::Initializer),
            "deinitializer" => Ok(SymbolKind::Deinitializer),
            "subscript" => Ok(SymbolKind::Subscript),
            "extension" => Ok(SymbolKind::Extension),
            "other" => Ok(SymbolKind::Other),
            _ => Err(format!("Unknown symbol kind: {}", s)),
        }
    }
}

/// Declared access level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Open,
    Public,
    Package,
    Internal,
    Fileprivate,
    Private,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Open => "open",
            AccessLevel::Public => "public",
            AccessLevel::Package => "package",
            AccessLevel::Internal => "internal",
            AccessLevel::Fileprivate => "fileprivate",
            AccessLevel::Private => "private",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(AccessLevel::Open),
            "public" => Ok(AccessLevel::Public),
            "package" => Ok(AccessLevel::Package),
            "internal" => Ok(AccessLevel::Internal),
            "fileprivate" => Ok(AccessLevel::Fileprivate),
            "private" => Ok(AccessLevel::Private),
            _ => Err(format!("Unknown access level: {}", s)),
        }
    }
}

/// Unrecognized access levels read as absent
fn lenient_access_level<'de, D>(deserializer: D) -> Result<Option<AccessLevel>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|level| level.parse().ok()))
}

/// One declaration site from the extracted syntax tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    #[serde(rename = "symbol_name")]
    pub name: String,

    #[serde(rename = "symbol_kind")]
    pub kind: SymbolKind,

    #[serde(default, deserialize_with = "lenient_access_level")]
    pub access_level: Option<AccessLevel>,

    /// Decorators and markers such as `@objc`
    #[serde(default)]
    pub attributes: Vec<String>,

    /// Ancestor and protocol type names, nearest first
    #[serde(rename = "inherits", default)]
    pub inheritance_chain: Vec<String>,

    #[serde(default)]
    pub modifiers: Vec<String>,

    #[serde(default)]
    pub conforms: Vec<String>,

    /// Name of the enclosing type, if any
    #[serde(default)]
    pub parent_type: Option<String>,
}

impl Symbol {
    /// Create a symbol with only the required fields
    pub fn new(name: &str, kind: SymbolKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            access_level: None,
            attributes: Vec::new(),
            inheritance_chain: Vec::new(),
            modifiers: Vec::new(),
            conforms: Vec::new(),
            parent_type: None,
        }
    }

    pub fn with_access(mut self, access: AccessLevel) -> Self {
        self.access_level = Some(access);
        self
    }

    pub fn with_attribute(mut self, attribute: &str) -> Self {
        self.attributes.push(attribute.to_string());
        self
    }

    pub fn with_ancestor(mut self, ancestor: &str) -> Self {
        self.inheritance_chain.push(ancestor.to_string());
        self
    }

    pub fn with_modifier(mut self, modifier: &str) -> Self {
        self.modifiers.push(modifier.to_string());
        self
    }

    pub fn with_conformance(mut self, protocol: &str) -> Self {
        self.conforms.push(protocol.to_string());
        self
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent_type = Some(parent.to_string());
        self
    }
}

/// Symbols of one file, indexed by exact name
///
/// Same-named symbols (overloads, members of different types) are all kept,
/// in extraction order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, Vec<usize>>,
}

impl SymbolTable {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, symbol) in symbols.iter().enumerate() {
            by_name.entry(symbol.name.clone()).or_default().push(idx);
        }
        Self { symbols, by_name }
    }

    /// Every symbol whose name equals `name` exactly
    pub fn candidates<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.symbols[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }
}

impl From<Vec<Symbol>> for SymbolTable {
    fn from(symbols: Vec<Symbol>) -> Self {
        Self::new(symbols)
    }
}
