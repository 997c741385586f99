use serde::{Deserialize, Serialize};

/// A symbol documented by Doxygen, read from its XML output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocSymbol {
    pub id: String,
    pub name: String,
    /// Doxygen kind: function, variable, typedef, enum, struct, define, file, ...
    pub kind: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    /// 0 when Doxygen recorded no body (declarations, `bodyend="-1"`)
    #[serde(default)]
    pub body_start: u32,
    #[serde(default)]
    pub body_end: u32,
    #[serde(default)]
    pub return_type: String,
    #[serde(default)]
    pub params: String,
    #[serde(default)]
    pub brief: String,
    #[serde(default)]
    pub detailed: String,
    /// Names this symbol calls or uses
    #[serde(default)]
    pub references: Vec<String>,
    /// Names that call or use this symbol
    #[serde(default)]
    pub referenced_by: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_compound: bool,
}

impl DocSymbol {
    pub fn has_body(&self) -> bool {
        self.body_start > 0 && self.body_end > 0 && !self.file.is_empty()
    }

    pub fn in_scope(&self, scope: &str) -> bool {
        scope.is_empty() || self.file.starts_with(scope)
    }
}

/// One node of a call-graph traversal.
///
/// Flags describe why a node has no children: `cycle` (already visited in this
/// traversal), `truncated` (depth bound reached), `unresolved` (no definition
/// in the documentation, e.g. calls through function pointers), or a non-empty
/// `candidates` list (several definitions, none chosen).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default)]
    pub calls: Vec<CallNode>,
    #[serde(default)]
    pub callers: Vec<CallNode>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cycle: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unresolved: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
}

impl CallNode {
    pub fn named(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }
}
