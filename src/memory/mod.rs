//! Per-workspace memory of tool outcomes
//!
//! Each tool keeps one JSON document under `<workspace>/.claude/skill-cache/`.
//! It remembers the last failure (with the failing command line), the last
//! success, and a table of known error patterns with remedies that is consulted
//! whenever a run fails. Nothing is retried automatically; the remedy is only
//! printed.

pub mod store;

use std::path::Path;

use chrono::Utc;

use crate::error::category_of;
use crate::models::{FailureRecord, MemoryRecord};

pub use store::{CACHE_DIR, GENERATOR_MEMORY_FILE, INDEXER_MEMORY_FILE, MemoryStore};

/// Build the failure entry for an error raised while running `command`
pub fn failure_record(workspace: &Path, error: &anyhow::Error, command: &str) -> FailureRecord {
    FailureRecord {
        timestamp: Utc::now(),
        category: category_of(error).to_string(),
        error: format!("{:#}", error),
        command: command.to_string(),
        workspace: workspace.to_path_buf(),
    }
}

/// Record a failure in `record` and return the remedy to show, if one matches
pub fn note_failure<S, E>(
    record: &mut MemoryRecord<S, E>,
    workspace: &Path,
    error: &anyhow::Error,
    command: &str,
) -> Option<String> {
    let failure = failure_record(workspace, error, command);
    let remedy = record.remedy_for(&failure.error).map(str::to_string);
    record.record_failure(failure);
    remedy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::models::IndexerMemory;

    #[test]
    fn test_note_failure_records_category_and_remedy() {
        let mut memory = IndexerMemory::default();
        memory.seed_known_issues(&[("not found", "install universal-ctags")]);

        let error = anyhow::Error::new(ToolError::NotFound {
            tool: "ctags".to_string(),
            path: "ctags".into(),
        });
        let remedy = note_failure(&mut memory, Path::new("/ws"), &error, "ctags -f - /ws");

        assert_eq!(remedy.as_deref(), Some("install universal-ctags"));
        let failure = memory.last_failure.unwrap();
        assert_eq!(failure.category, "tool-not-found");
        assert_eq!(failure.command, "ctags -f - /ws");
        assert!(!failure.error.is_empty());
    }
}
