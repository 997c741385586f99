//! Symbol search over the markdown report, regenerating it when stale
//!
//! # Error Handling Strategy
//!
//! - **No match** is a normal result, not an error
//! - **Stale or missing report**: regenerated exactly once before searching;
//!   a failed regeneration is returned as an error (and recorded by the indexer)
//! - **Memory updates** for `last_search` are best-effort and only logged on failure

pub mod format;
pub mod query;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, warn};

use crate::indexer::{DEFAULT_KINDS, IndexOptions, REPORT_FILE, build_index, read_report};
use crate::memory::MemoryStore;
use crate::models::{IndexerMemory, SearchRecord, Symbol};
use crate::utils::{SourceScan, absolutize};

pub use format::{NO_MATCHES, format_json, format_text};
pub use query::{SearchQuery, search_symbols};

/// Source files whose changes make a report stale
pub const SOURCE_PATTERNS: &[&str] = &["*.c", "*.h"];

/// Workspace and report location derived from the search target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    pub workspace: PathBuf,
    pub report: PathBuf,
}

impl SearchTarget {
    /// `target` is either an existing report file (its directory is the
    /// workspace) or a workspace directory, in which case the report is
    /// `indexing` if given, else `<workspace>/indexing.md`
    pub fn resolve(target: &Path, indexing: Option<&Path>) -> Result<Self> {
        let target = absolutize(target)?;
        if target.is_file() {
            let workspace = target
                .parent()
                .map(Path::to_path_buf)
                .context("Report file has no parent directory")?;
            return Ok(Self { workspace, report: target });
        }
        if !target.is_dir() {
            anyhow::bail!("Workspace not found: {}", target.display());
        }

        let report = match indexing {
            Some(path) => absolutize(path)?,
            None => target.join(REPORT_FILE),
        };
        Ok(Self { workspace: target, report })
    }
}

/// Whether any C source under `workspace` is newer than `report` (or the report is missing)
pub fn needs_reindex(workspace: &Path, report: &Path, excluded_dirs: &[String]) -> Result<bool> {
    let report_mtime = match fs::metadata(report).and_then(|m| m.modified()) {
        Ok(mtime) => mtime,
        Err(_) => return Ok(true),
    };
    let scan = SourceScan::new(SOURCE_PATTERNS, excluded_dirs)?;
    Ok(scan.any_newer_than(&[workspace.to_path_buf()], report_mtime))
}

/// Settings for [`search`]
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Used when the report has to be regenerated
    pub index: IndexOptions,
    pub force_index: bool,
}

/// Outcome of [`ensure_report`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportState {
    UpToDate,
    Regenerated,
}

/// Make sure `target.report` reflects the current sources, regenerating it at
/// most once. Regeneration always covers every symbol kind so the report on
/// disk is never a filtered subset.
pub fn ensure_report(target: &SearchTarget, options: &SearchOptions) -> Result<ReportState> {
    let stale = options.force_index
        || needs_reindex(&target.workspace, &target.report, &options.index.ctags.exclude_dirs)?;
    if !stale {
        debug!("Report is up to date: {}", target.report.display());
        return Ok(ReportState::UpToDate);
    }

    if options.force_index {
        debug!("Forcing re-index of {}", target.workspace.display());
    } else {
        debug!("Sources are newer than {}, re-indexing", target.report.display());
    }

    let mut index = options.index.clone();
    index.ctags.kinds = DEFAULT_KINDS.to_string();
    index.output = Some(target.report.clone());
    build_index(&target.workspace, &index)?;
    Ok(ReportState::Regenerated)
}

/// Result of one search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub report_state: ReportState,
    /// Matching rows in report order, paths relative to the workspace
    pub results: Vec<Symbol>,
}

/// Search the report for `query`, regenerating it first if it is stale.
///
/// # Errors
///
/// Returns an error if regeneration fails or the report cannot be read.
/// Finding nothing is not an error.
pub fn search(
    target: &SearchTarget,
    query: &SearchQuery,
    options: &SearchOptions,
) -> Result<SearchOutcome> {
    let report_state = ensure_report(target, options)?;

    let symbols = read_report(&target.report).with_context(|| {
        format!(
            "Cannot search {}; run with --index-only or --force-index to create it",
            target.report.display()
        )
    })?;
    debug!("Parsed {} symbols from {}", symbols.len(), target.report.display());

    let results: Vec<Symbol> = search_symbols(&symbols, query).into_iter().cloned().collect();
    record_search(&target.workspace, query, results.len());

    Ok(SearchOutcome { report_state, results })
}

fn record_search(workspace: &Path, query: &SearchQuery, results: usize) {
    let store = MemoryStore::indexer(workspace);
    let updated = store.update(|memory: &mut IndexerMemory| {
        memory.extras.last_search =
            Some(SearchRecord { timestamp: Utc::now(), query: query.to_string(), results });
    });
    if let Err(e) = updated {
        warn!("Failed to record search in {}: {:#}", store.path().display(), e);
    }
}
