use std::fmt;

use crate::models::{Symbol, SymbolKind};

/// What to look for in the report
///
/// Matching rules:
/// - Default: case-insensitive substring of the symbol name
/// - Exact: case-sensitive equality
/// - Kinds: comma-separated list, a symbol passes if its kind equals any of
///   them (case-insensitive); an empty list accepts every kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub name: String,
    pub kinds: Vec<SymbolKind>,
    pub exact: bool,
}

impl SearchQuery {
    pub fn new(name: &str, type_filter: Option<&str>, exact: bool) -> Self {
        let kinds = type_filter
            .map(|types| {
                types
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(|t| SymbolKind::from(t.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        Self { name: name.to_string(), kinds, exact }
    }

    pub fn matches(&self, symbol: &Symbol) -> bool {
        self.matches_name(&symbol.name) && self.matches_kind(&symbol.kind)
    }

    fn matches_name(&self, name: &str) -> bool {
        if self.exact {
            name == self.name
        } else {
            name.to_lowercase().contains(&self.name.to_lowercase())
        }
    }

    fn matches_kind(&self, kind: &SymbolKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(kind)
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.kinds.is_empty() {
            let kinds: Vec<&str> = self.kinds.iter().map(SymbolKind::as_str).collect();
            write!(f, " type:{}", kinds.join(","))?;
        }
        if self.exact {
            write!(f, " (exact)")?;
        }
        Ok(())
    }
}

/// Symbols matching `query`, in report order
pub fn search_symbols<'a>(symbols: &'a [Symbol], query: &SearchQuery) -> Vec<&'a Symbol> {
    symbols.iter().filter(|symbol| query.matches(symbol)).collect()
}
