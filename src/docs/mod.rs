//! Doxygen documentation: generation and querying
//!
//! [`generate_docs`] synthesizes a Doxyfile, runs Doxygen (bundled or from
//! `PATH`) and remembers the outcome in `doxygen-generator.json`.
//! [`DocQuery`] answers symbol, call-graph, body, list and search questions
//! from the generated XML without running anything.
//!
//! # Error Handling Strategy
//!
//! - **Generation failures** are recorded in the memory file before being returned
//! - **Query misses** (unknown symbol, no body, ambiguous name) are messages, not errors
//! - **Broken compound files** are skipped with a warning; a missing `index.xml` is an error
//! - **Symbol cache** problems fall back to parsing the XML again

pub mod cache;
pub mod doxyfile;
pub mod generate;
pub mod index;
pub mod platform;
pub mod query;
pub mod xml;

pub use doxyfile::{DoxyfileSettings, Language, render_doxyfile};
pub use generate::{
    DEFAULT_OUTPUT_DIR, GenerateOptions, GenerateOutcome, KNOWN_ISSUES, generate_docs,
};
pub use index::{Direction, DocIndex};
pub use platform::{Platform, ToolPaths, Toolchain};
pub use query::{DEFAULT_DEPTH, DocQuery, ListFilter, OutputFormat, Page, QueryOptions};
