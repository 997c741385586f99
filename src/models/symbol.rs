use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a C symbol as reported by Universal Ctags.
///
/// Unknown kinds are preserved in [`SymbolKind::Other`] rather than dropped, so a
/// caller passing extra `--kinds-C` letters still sees every tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SymbolKind {
    Function,
    Struct,
    Enum,
    Union,
    Typedef,
    Macro,
    Variable,
    Member,
    Enumerator,
    Other(String),
}

impl SymbolKind {
    pub fn as_str(&self) -> &str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::Union => "union",
            SymbolKind::Typedef => "typedef",
            SymbolKind::Macro => "macro",
            SymbolKind::Variable => "variable",
            SymbolKind::Member => "member",
            SymbolKind::Enumerator => "enumerator",
            SymbolKind::Other(s) => s,
        }
    }

    /// Struct/union members and enumerators, which `--no-members` drops
    pub fn is_member_like(&self) -> bool {
        matches!(self, SymbolKind::Member | SymbolKind::Enumerator)
    }
}

impl From<String> for SymbolKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "function" => SymbolKind::Function,
            "struct" => SymbolKind::Struct,
            "enum" => SymbolKind::Enum,
            "union" => SymbolKind::Union,
            "typedef" => SymbolKind::Typedef,
            "macro" => SymbolKind::Macro,
            "variable" => SymbolKind::Variable,
            "member" => SymbolKind::Member,
            "enumerator" => SymbolKind::Enumerator,
            other => SymbolKind::Other(other.to_string()),
        }
    }
}

impl From<SymbolKind> for String {
    fn from(kind: SymbolKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for SymbolKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SymbolKind::from(s.to_string()))
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single symbol definition. Duplicates across files are expected and kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Defining file; absolute when produced by the indexer, workspace-relative
    /// when read back from a report
    pub path: PathBuf,
    pub start_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Symbol {
    /// `start - end` when the end line is known, otherwise just `start`
    pub fn line_range(&self) -> String {
        match self.end_line {
            Some(end) => format!("{} - {}", self.start_line, end),
            None => self.start_line.to_string(),
        }
    }

    /// End line, falling back to the start line
    pub fn last_line(&self) -> u32 {
        self.end_line.unwrap_or(self.start_line)
    }
}
