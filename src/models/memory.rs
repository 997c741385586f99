use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome record persisted per tool and per workspace.
///
/// `S` is the tool-specific success payload and `E` holds extra tool-specific
/// keys, flattened into the same JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord<S, E = NoExtras> {
    // No `default` here: it would require `S: Default` for deserialization.
    // Missing `Option` fields already read as `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<FailureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success: Option<S>,
    #[serde(default)]
    pub known_issues: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extras: E,
}

impl<S, E: Default> Default for MemoryRecord<S, E> {
    fn default() -> Self {
        Self {
            last_failure: None,
            last_success: None,
            known_issues: BTreeMap::new(),
            extras: E::default(),
        }
    }
}

impl<S, E> MemoryRecord<S, E> {
    /// Record a failure. The previous success, if any, is kept for reference.
    pub fn record_failure(&mut self, failure: FailureRecord) {
        self.last_failure = Some(failure);
    }

    /// Record a success, superseding any earlier failure
    pub fn record_success(&mut self, success: S) {
        self.last_failure = None;
        self.last_success = Some(success);
    }

    /// Add built-in known issues without overwriting user-edited remedies
    pub fn seed_known_issues(&mut self, issues: &[(&str, &str)]) {
        for (pattern, remedy) in issues {
            self.known_issues
                .entry((*pattern).to_string())
                .or_insert_with(|| (*remedy).to_string());
        }
    }

    /// First remedy whose pattern occurs in `error` (case-insensitive)
    pub fn remedy_for(&self, error: &str) -> Option<&str> {
        let error = error.to_lowercase();
        self.known_issues
            .iter()
            .find(|(pattern, _)| !pattern.is_empty() && error.contains(&pattern.to_lowercase()))
            .map(|(_, remedy)| remedy.as_str())
    }
}

/// Placeholder for tools without extra memory keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoExtras {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub error: String,
    pub command: String,
    pub workspace: PathBuf,
}

/// Success payload of the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSuccess {
    pub timestamp: DateTime<Utc>,
    pub files_indexed: usize,
    pub symbols_found: usize,
    pub report: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerExtras {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_ctags_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_search: Option<SearchRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub results: usize,
}

/// Success payload of the documentation generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generated_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub warning_count: usize,
    pub symbol_count: usize,
    pub platform: String,
    pub output_dir: PathBuf,
    pub project_name: String,
    pub language: String,
    pub html: bool,
    pub xml: bool,
    pub graphs: bool,
}

pub type IndexerMemory = MemoryRecord<IndexSuccess, IndexerExtras>;
pub type GeneratorMemory = MemoryRecord<GenerationRecord>;
