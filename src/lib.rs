//! code-skills - Symbol indexing, search and Doxygen documentation for C codebases
//!
//! This library wraps two external tools and remembers how they behaved:
//!
//! - Building a markdown symbol report (`indexing.md`) with Universal Ctags
//! - Searching that report, regenerating it when sources changed
//! - Generating Doxygen HTML/XML with bundled or system binaries
//! - Querying the XML for symbols, call graphs and function bodies
//! - Installing a git hook that keeps the documentation current
//!
//! Every tool run records its last failure or success in a per-workspace
//! JSON file under `.claude/skill-cache/`, together with remedies for known
//! error patterns.
//!
//! # Example
//!
//! ```no_run
//! use code_skills::{IndexOptions, build_index};
//! use std::path::PathBuf;
//!
//! let workspace = PathBuf::from("/home/alice/src/project");
//! let summary = build_index(&workspace, &IndexOptions::default())?;
//! println!("Indexed {} symbols", summary.symbols.len());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod docs;
pub mod error;
pub mod hook;
pub mod indexer;
pub mod memory;
pub mod models;
pub mod search;
pub mod utils;

// Re-export commonly used types
pub use docs::{DocIndex, DocQuery, GenerateOptions, generate_docs};
pub use error::ToolError;
pub use indexer::{IndexOptions, build_index};
pub use models::{CallNode, DocSymbol, Symbol, SymbolKind};
pub use search::{SearchQuery, SearchTarget, search};
pub use utils::paths::format_path_with_tilde;
