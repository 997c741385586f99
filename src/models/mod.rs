//! Data models shared by the indexer, the searcher and the documentation tools.
//!
//! - [`Symbol`] / [`SymbolKind`] - one ctags definition, also one report row
//! - [`MemoryRecord`] - per-tool outcome memory stored under `.claude/skill-cache/`
//! - [`DocSymbol`] - one symbol read from Doxygen XML
//! - [`CallNode`] - one node of a call-graph traversal

pub mod doc;
pub mod memory;
pub mod symbol;

pub use doc::{CallNode, DocSymbol};
pub use memory::{
    FailureRecord, GenerationRecord, GeneratorMemory, IndexSuccess, IndexerExtras, IndexerMemory,
    MemoryRecord, NoExtras, SearchRecord,
};
pub use symbol::{Symbol, SymbolKind};
