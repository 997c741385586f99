//! Symbol indexing with Universal Ctags
//!
//! # Error Handling Strategy
//!
//! - **Line-level problems**: unparseable ctags output lines are skipped with a
//!   warning; more than 50% bad lines rejects the whole run as malformed output
//! - **Run-level failures**: recorded in the workspace memory file with the
//!   command line and a known-issue remedy, then returned to the caller
//! - **Report writes** are atomic, so a failed run leaves the previous report intact

pub mod builder;
pub mod ctags;
pub mod report;

pub use builder::{IndexOptions, IndexSummary, KNOWN_ISSUES, build_index, clear_memory};
pub use ctags::{CtagsOptions, DEFAULT_EXCLUDES, DEFAULT_KINDS};
pub use report::{REPORT_FILE, parse_report, read_report, render_report};
