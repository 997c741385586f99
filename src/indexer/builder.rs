//! Index build orchestration: run ctags, write the report, remember the outcome.
//!
//! # Error Handling Strategy
//!
//! - **Tool failures** (missing binary, non-zero exit, timeout, malformed output)
//!   are recorded as `last_failure` in the workspace memory file together with
//!   the exact command line, then propagated so the process exits non-zero
//! - **Known issues**: the failure text is matched against the memory file's
//!   pattern table and the remedy is printed to stderr; nothing is retried
//! - **Memory file problems** never fail an index run; they are logged as warnings
//! - **No partial reports**: the report is only replaced after ctags succeeded
//!   and the table has been rendered in full

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::indexer::ctags::{CtagsOptions, ctags_command, parse_tags};
use crate::indexer::report::{REPORT_FILE, render_report, write_report};
use crate::memory::{MemoryStore, note_failure};
use crate::models::{IndexSuccess, IndexerMemory, Symbol};
use crate::utils::{ToolCommand, find_executable, format_path_with_tilde};

/// Known error patterns and what to do about them, seeded into new memory files
pub const KNOWN_ISSUES: &[(&str, &str)] = &[
    (
        "ctags not found",
        "Install Universal Ctags (brew install universal-ctags, apt install universal-ctags) \
         or pass --ctags-path",
    ),
    (
        "unknown option",
        "The ctags on PATH is not Universal Ctags; install universal-ctags or pass --ctags-path",
    ),
    (
        "output-format",
        "This ctags build lacks JSON output; use a Universal Ctags built with libjansson",
    ),
    (
        "malformed ctags output",
        "Check that --ctags-path points at Universal Ctags with JSON support \
         (ctags --list-features | grep json)",
    ),
    ("timed out", "Exclude generated or vendored directories with --exclude, or raise --timeout"),
];

/// Places ctags is commonly installed when it is not on PATH
const CTAGS_CANDIDATES: &[&str] =
    &["/opt/homebrew/bin/ctags", "/usr/local/bin/ctags", "/usr/bin/ctags", "/snap/bin/ctags"];

/// Everything one index run needs besides the workspace
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Explicit ctags binary; when `None` the remembered suggestion or `ctags` on PATH is used
    pub ctags_path: Option<PathBuf>,
    /// Report destination; defaults to `<workspace>/indexing.md`
    pub output: Option<PathBuf>,
    pub ctags: CtagsOptions,
    pub include_members: bool,
    pub show_stats: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            ctags_path: None,
            output: None,
            ctags: CtagsOptions::default(),
            include_members: true,
            show_stats: true,
        }
    }
}

impl IndexOptions {
    pub fn report_path(&self, workspace: &Path) -> PathBuf {
        self.output.clone().unwrap_or_else(|| workspace.join(REPORT_FILE))
    }
}

/// Result of a successful index run
#[derive(Debug, Clone)]
pub struct IndexSummary {
    pub report: PathBuf,
    pub files: usize,
    /// Symbols as parsed, with absolute paths
    pub symbols: Vec<Symbol>,
}

/// Index `workspace` with ctags and write the markdown report.
///
/// # Errors
///
/// Returns an error if ctags cannot be found or started, exits non-zero, times
/// out, or produces mostly unparseable output, or if the report cannot be
/// written. The failure is recorded in the workspace memory file first.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use code_skills::{IndexOptions, build_index};
///
/// let summary = build_index(Path::new("/src/project"), &IndexOptions::default())?;
/// println!("{} symbols in {} files", summary.symbols.len(), summary.files);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn build_index(workspace: &Path, options: &IndexOptions) -> Result<IndexSummary> {
    let store = MemoryStore::indexer(workspace);
    let mut memory: IndexerMemory = store.load();
    memory.seed_known_issues(KNOWN_ISSUES);

    let ctags = select_ctags(options.ctags_path.as_deref(), &memory);
    let command = ctags_command(&ctags, workspace, &options.ctags);
    let report_path = options.report_path(workspace);

    match run_index(&command, workspace, &report_path, options) {
        Ok(summary) => {
            memory.record_success(IndexSuccess {
                timestamp: Utc::now(),
                files_indexed: summary.files,
                symbols_found: summary.symbols.len(),
                report: summary.report.clone(),
            });
            save_memory(&store, &memory);

            eprintln!(
                "Indexed {} symbols in {} files -> {}",
                summary.symbols.len(),
                summary.files,
                format_path_with_tilde(&summary.report)
            );
            Ok(summary)
        }
        Err(error) => {
            let remedy = note_failure(&mut memory, workspace, &error, &command.display());
            if is_not_found(&error) {
                memory.extras.suggested_ctags_path = probe_ctags(&ctags);
                if let Some(found) = &memory.extras.suggested_ctags_path {
                    eprintln!(
                        "Found ctags at {}; it will be used on the next run",
                        found.display()
                    );
                }
            }
            save_memory(&store, &memory);

            if let Some(remedy) = remedy {
                eprintln!("Suggested remedy: {}", remedy);
            }
            Err(error)
        }
    }
}

/// Reset the indexer memory file of `workspace`
pub fn clear_memory(workspace: &Path) -> Result<()> {
    let store = MemoryStore::indexer(workspace);
    store.clear()?;
    eprintln!("Cleared {}", format_path_with_tilde(store.path()));
    Ok(())
}

fn run_index(
    command: &ToolCommand,
    workspace: &Path,
    report_path: &Path,
    options: &IndexOptions,
) -> Result<IndexSummary> {
    let output = command.run_checked()?;
    debug!(bytes = output.stdout.len(), "ctags finished in {:?}", output.elapsed);

    let mut symbols = parse_tags(&output.stdout)?;
    if !options.include_members {
        symbols.retain(|s| !s.kind.is_member_like());
    }
    let symbols: Vec<Symbol> = symbols
        .into_iter()
        .map(|s| {
            if s.path.is_relative() { Symbol { path: workspace.join(&s.path), ..s } } else { s }
        })
        .collect();

    let files = symbols.iter().map(|s| s.path.as_path()).collect::<BTreeSet<_>>().len();
    let content = render_report(workspace, &symbols, options.show_stats);
    write_report(report_path, &content)
        .with_context(|| format!("Failed to write index report for {}", workspace.display()))?;

    Ok(IndexSummary { report: report_path.to_path_buf(), files, symbols })
}

/// Explicit path first, then a location remembered from an earlier failure, then PATH
fn select_ctags(explicit: Option<&Path>, memory: &IndexerMemory) -> PathBuf {
    let requested = match (explicit, &memory.extras.suggested_ctags_path) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(suggested)) if suggested.is_file() => {
            debug!("Using remembered ctags at {}", suggested.display());
            suggested.clone()
        }
        _ => PathBuf::from("ctags"),
    };
    find_executable(&requested).unwrap_or(requested)
}

fn is_not_found(error: &anyhow::Error) -> bool {
    error.chain().any(|e| matches!(e.downcast_ref::<ToolError>(), Some(ToolError::NotFound { .. })))
}

fn probe_ctags(failed: &Path) -> Option<PathBuf> {
    CTAGS_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate != failed && candidate.is_file())
}

fn save_memory(store: &MemoryStore, memory: &IndexerMemory) {
    if let Err(e) = store.save(memory) {
        warn!("Failed to update {}: {:#}", store.path().display(), e);
    }
}
