//! In-memory index over parsed Doxygen symbols, with call-graph traversal.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Result;
use clap::ValueEnum;

use crate::docs::cache::load_cached_symbols;
use crate::models::{CallNode, DocSymbol};

/// Which edges a call-graph traversal follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Direction {
    Calls,
    Callers,
    #[default]
    Both,
}

impl Direction {
    fn follows_calls(self) -> bool {
        matches!(self, Direction::Calls | Direction::Both)
    }

    fn follows_callers(self) -> bool {
        matches!(self, Direction::Callers | Direction::Both)
    }
}

/// Symbol lookup by name over one Doxygen XML output
#[derive(Debug, Clone, Default)]
pub struct DocIndex {
    symbols: Vec<DocSymbol>,
    by_name: HashMap<String, Vec<usize>>,
}

impl DocIndex {
    pub fn new(symbols: Vec<DocSymbol>) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, symbol) in symbols.iter().enumerate() {
            by_name.entry(symbol.name.clone()).or_default().push(i);
        }
        Self { symbols, by_name }
    }

    /// Build the index for an XML directory, via `symbols.json` when allowed
    pub fn load(xml_dir: &Path, use_cache: bool) -> Result<Self> {
        Ok(Self::new(load_cached_symbols(xml_dir, use_cache)?))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Every symbol (compounds and members) named exactly `name` within `scope`
    pub fn find_symbol(&self, name: &str, scope: &str) -> Vec<&DocSymbol> {
        let Some(ids) = self.by_name.get(name) else {
            return Vec::new();
        };
        ids.iter().map(|&i| &self.symbols[i]).filter(|s| s.in_scope(scope)).collect()
    }

    /// Member symbols (no files, structs or other compounds) within `scope`
    pub fn members<'a>(&'a self, scope: &'a str) -> impl Iterator<Item = &'a DocSymbol> + 'a {
        self.symbols.iter().filter(move |s| !s.is_compound && s.in_scope(scope))
    }

    /// Distinct definitions a reference to `name` could mean.
    ///
    /// Functions are preferred; other members are only considered when no
    /// function has that name. Entries at the same file and line are one definition.
    pub fn definitions(&self, name: &str, scope: &str) -> Vec<&DocSymbol> {
        let members: Vec<&DocSymbol> =
            self.find_symbol(name, scope).into_iter().filter(|s| !s.is_compound).collect();
        let functions: Vec<&DocSymbol> =
            members.iter().copied().filter(|s| s.kind == "function").collect();
        let candidates = if functions.is_empty() { members } else { functions };

        let mut seen = HashSet::new();
        candidates.into_iter().filter(|s| seen.insert((s.file.as_str(), s.line))).collect()
    }

    /// Call graph rooted at `name`, `depth` levels deep.
    ///
    /// One visited set is shared by the whole traversal: a name seen before is
    /// emitted as a `cycle` leaf instead of being expanded again. Names without
    /// a definition are `unresolved`, names with several definitions list their
    /// `candidates` and are not expanded, and nodes whose edges were cut off by
    /// the depth bound are `truncated`.
    pub fn callgraph(
        &self,
        name: &str,
        depth: usize,
        direction: Direction,
        scope: &str,
    ) -> CallNode {
        let mut visited = HashSet::new();
        self.traverse(name, depth, direction, scope, &mut visited)
    }

    fn traverse(
        &self,
        name: &str,
        depth: usize,
        direction: Direction,
        scope: &str,
        visited: &mut HashSet<String>,
    ) -> CallNode {
        let mut node = CallNode::named(name);

        let definitions = self.definitions(name, scope);
        let symbol = match definitions.as_slice() {
            [] => {
                node.unresolved = true;
                return node;
            }
            [only] => *only,
            many => {
                node.candidates = many.iter().map(|s| format!("{}:{}", s.file, s.line)).collect();
                return node;
            }
        };
        node.kind = Some(symbol.kind.clone());
        node.file = Some(symbol.file.clone()).filter(|f| !f.is_empty());
        node.line = Some(symbol.line).filter(|l| *l > 0);

        let calls: &[String] = if direction.follows_calls() { &symbol.references } else { &[] };
        let callers: &[String] =
            if direction.follows_callers() { &symbol.referenced_by } else { &[] };

        if depth == 0 {
            node.truncated = !calls.is_empty() || !callers.is_empty();
            return node;
        }
        visited.insert(name.to_string());

        for callee in calls {
            let child = self.child(callee, depth, direction, scope, visited);
            node.calls.push(child);
        }
        for caller in callers {
            let child = self.child(caller, depth, direction, scope, visited);
            node.callers.push(child);
        }
        node
    }

    fn child(
        &self,
        name: &str,
        depth: usize,
        direction: Direction,
        scope: &str,
        visited: &mut HashSet<String>,
    ) -> CallNode {
        if visited.contains(name) {
            CallNode { cycle: true, ..CallNode::named(name) }
        } else {
            self.traverse(name, depth - 1, direction, scope, visited)
        }
    }
}
