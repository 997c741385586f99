//! Read-only queries over generated Doxygen XML.
//!
//! Every command returns the text to print. "Not found", "no body" and
//! ambiguity are answers, not errors: they come back as a message (or a JSON
//! object with an `error` key) and the process still exits 0.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::json;

use crate::docs::generate::DEFAULT_OUTPUT_DIR;
use crate::docs::index::{DocIndex, Direction};
use crate::models::{CallNode, DocSymbol};
use crate::utils::absolutize;

pub const DEFAULT_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Where to find the XML and how to read it
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub output_dir: PathBuf,
    /// Overrides `<workspace>/<output_dir>/xml`
    pub xml_dir: Option<PathBuf>,
    pub use_cache: bool,
    /// Path prefix results must live under; empty for no limit
    pub scope: String,
    pub format: OutputFormat,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            xml_dir: None,
            use_cache: true,
            scope: String::new(),
            format: OutputFormat::Text,
        }
    }
}

impl QueryOptions {
    pub fn xml_dir(&self, workspace: &Path) -> Result<PathBuf> {
        match &self.xml_dir {
            Some(dir) => absolutize(dir),
            None => Ok(workspace.join(&self.output_dir).join("xml")),
        }
    }
}

/// Offset/limit window over a sorted result list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Page {
    pub fn is_full(&self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }

    fn apply<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset.min(items.len());
        let end = match self.limit {
            Some(limit) => start.saturating_add(limit).min(items.len()),
            None => items.len(),
        };
        &items[start..end]
    }
}

/// Filters for [`DocQuery::list`]
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Exact Doxygen kind (`function`, `variable`, `define`, ...)
    pub kind: Option<String>,
    /// Substring of the symbol's file path
    pub file: Option<String>,
    pub page: Page,
}

#[derive(Debug, Serialize)]
struct BodyExtract<'a> {
    name: &'a str,
    file: &'a str,
    start_line: u32,
    end_line: u32,
    body: String,
}

/// A loaded documentation index plus the settings every command shares
pub struct DocQuery {
    index: DocIndex,
    workspace: PathBuf,
    scope: String,
    format: OutputFormat,
}

impl DocQuery {
    /// Load the XML output for `workspace`.
    ///
    /// # Errors
    ///
    /// Returns an error if the XML directory does not exist or `index.xml`
    /// cannot be read.
    pub fn open(workspace: &Path, options: &QueryOptions) -> Result<Self> {
        let xml_dir = options.xml_dir(workspace)?;
        if !xml_dir.is_dir() {
            anyhow::bail!(
                "XML directory not found: {}\nRun `code-skills docs generate {}` first",
                xml_dir.display(),
                workspace.display()
            );
        }
        let index = DocIndex::load(&xml_dir, options.use_cache)
            .with_context(|| format!("Failed to load documentation from {}", xml_dir.display()))?;
        Ok(Self::new(index, workspace, options))
    }

    pub fn new(index: DocIndex, workspace: &Path, options: &QueryOptions) -> Self {
        Self {
            index,
            workspace: workspace.to_path_buf(),
            scope: options.scope.clone(),
            format: options.format,
        }
    }

    pub fn symbol(&self, name: &str) -> Result<String> {
        let symbols = self.index.find_symbol(name, &self.scope);
        if symbols.is_empty() {
            return Ok(self.message(&format!("Symbol not found: {}", name)));
        }
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&symbols)?),
            OutputFormat::Text => Ok(symbols
                .iter()
                .map(|s| format_symbol_text(s))
                .collect::<Vec<_>>()
                .join("\n\n---\n\n")),
        }
    }

    pub fn callgraph(&self, name: &str, depth: usize, direction: Direction) -> Result<String> {
        let graph = self.index.callgraph(name, depth, direction, &self.scope);
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&graph)?),
            OutputFormat::Text => Ok(format_callgraph_text(&graph, direction)),
        }
    }

    /// Source text of a function, read from the file Doxygen recorded.
    ///
    /// The extract starts at the earlier of the declaration line and the body
    /// start so multi-line signatures are included.
    pub fn body(&self, name: &str) -> Result<String> {
        let definitions = self.index.definitions(name, &self.scope);
        if definitions.is_empty() {
            return Ok(self.message(&format!("Symbol not found: {}", name)));
        }

        let with_body: Vec<&DocSymbol> =
            definitions.iter().copied().filter(|s| s.has_body()).collect();
        let symbol = match with_body.as_slice() {
            [] => {
                let message = format!("No body information available for: {}", name);
                return Ok(match self.format {
                    OutputFormat::Json => serde_json::to_string_pretty(
                        &json!({ "error": message, "symbol": definitions[0] }),
                    )?,
                    OutputFormat::Text => message,
                });
            }
            [only] => *only,
            many => {
                let candidates: Vec<String> =
                    many.iter().map(|s| format!("{}:{}", s.file, s.line)).collect();
                let message = format!(
                    "Ambiguous symbol: {} has {} definitions ({}); narrow it with --scope",
                    name,
                    many.len(),
                    candidates.join(", ")
                );
                return Ok(match self.format {
                    OutputFormat::Json => serde_json::to_string_pretty(
                        &json!({ "error": message, "candidates": candidates }),
                    )?,
                    OutputFormat::Text => message,
                });
            }
        };

        let source = self.source_path(&symbol.file);
        if !source.is_file() {
            return Ok(self.message(&format!("Source file not found: {}", source.display())));
        }
        let content = match fs::read_to_string(&source) {
            Ok(content) => content,
            Err(e) => return Ok(self.message(&format!("Error reading source file: {}", e))),
        };

        let start_line = if symbol.line > 0 {
            symbol.line.min(symbol.body_start)
        } else {
            symbol.body_start
        };
        let lines: Vec<&str> = content.lines().collect();
        let start = (start_line as usize).saturating_sub(1).min(lines.len());
        let end = (symbol.body_end as usize).min(lines.len()).max(start);
        let body_lines = &lines[start..end];

        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&BodyExtract {
                name: &symbol.name,
                file: &symbol.file,
                start_line,
                end_line: symbol.body_end,
                body: body_lines.join("\n"),
            })?),
            OutputFormat::Text => {
                let mut out = format!("// {}:{}-{}", symbol.file, start_line, symbol.body_end);
                for (number, line) in (start_line as usize..).zip(body_lines) {
                    out.push_str(&format!("\n{:>6}  {}", number, line));
                }
                Ok(out)
            }
        }
    }

    /// Members sorted by file and line, optionally filtered and paginated
    pub fn list(&self, filter: &ListFilter) -> Result<String> {
        let mut symbols: Vec<&DocSymbol> = self
            .index
            .members(&self.scope)
            .filter(|s| filter.kind.as_deref().is_none_or(|kind| s.kind == kind))
            .filter(|s| filter.file.as_deref().is_none_or(|file| s.file.contains(file)))
            .collect();
        sort_by_location(&mut symbols);
        self.render_list(&symbols, filter.page, "No symbols found.")
    }

    /// Members whose name matches `pattern`.
    ///
    /// With `regex` the pattern is a case-insensitive regular expression.
    /// Otherwise a pattern containing `*` or `?` is an anchored glob and
    /// anything else a case-insensitive substring.
    pub fn search(&self, pattern: &str, regex: bool, page: Page) -> Result<String> {
        let matcher = if regex {
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(re) => NameMatcher::Regex(re),
                Err(e) => return Ok(self.message(&format!("Invalid regex: {}", e))),
            }
        } else {
            NameMatcher::from_glob(pattern)?
        };

        let mut matches: Vec<&DocSymbol> =
            self.index.members(&self.scope).filter(|s| matcher.matches(&s.name)).collect();
        sort_by_location(&mut matches);
        self.render_list(&matches, page, &format!("No symbols matching: {}", pattern))
    }

    fn render_list(&self, symbols: &[&DocSymbol], page: Page, empty: &str) -> Result<String> {
        let shown = page.apply(symbols);
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(shown)?),
            OutputFormat::Text if symbols.is_empty() => Ok(empty.to_string()),
            OutputFormat::Text => Ok(format_list_text(shown, symbols.len(), page)),
        }
    }

    fn source_path(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() { path.to_path_buf() } else { self.workspace.join(path) }
    }

    fn message(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => json!({ "error": message }).to_string(),
            OutputFormat::Text => message.to_string(),
        }
    }
}

enum NameMatcher {
    Regex(Regex),
    Substring(String),
}

impl NameMatcher {
    fn from_glob(pattern: &str) -> Result<Self> {
        if !pattern.contains(['*', '?']) {
            return Ok(NameMatcher::Substring(pattern.to_lowercase()));
        }
        let mut source = String::from("^");
        for c in pattern.chars() {
            match c {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                c => source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');
        let re = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?;
        Ok(NameMatcher::Regex(re))
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            NameMatcher::Regex(re) => re.is_match(name),
            NameMatcher::Substring(needle) => name.to_lowercase().contains(needle),
        }
    }
}

fn sort_by_location(symbols: &mut [&DocSymbol]) {
    symbols.sort_by(|a, b| (&a.file, a.line, &a.name).cmp(&(&b.file, b.line, &b.name)));
}

pub fn format_symbol_text(symbol: &DocSymbol) -> String {
    let mut lines = vec![
        format!("Name:         {}", symbol.name),
        format!("Kind:         {}", symbol.kind),
        format!("File:         {}", symbol.file),
        format!("Line:         {}", symbol.line),
    ];
    if !symbol.return_type.is_empty() {
        lines.push(format!("Return type:  {}", symbol.return_type));
    }
    if !symbol.params.is_empty() {
        lines.push(format!("Parameters:   {}", symbol.params));
    }
    if !symbol.brief.is_empty() {
        lines.push(format!("Brief:        {}", symbol.brief));
    }
    if symbol.body_start > 0 && symbol.body_end > 0 {
        lines.push(format!("Body:         lines {}-{}", symbol.body_start, symbol.body_end));
    }
    if !symbol.references.is_empty() {
        lines.push(format!("Calls:        {}", symbol.references.join(", ")));
    }
    if !symbol.referenced_by.is_empty() {
        lines.push(format!("Called by:    {}", symbol.referenced_by.join(", ")));
    }
    lines.join("\n")
}

/// Indented tree, two spaces per level, with the reason a node was not expanded
pub fn format_callgraph_text(graph: &CallNode, direction: Direction) -> String {
    let mut lines = Vec::new();
    push_callgraph_lines(graph, 0, direction, &mut lines);
    lines.join("\n")
}

fn push_callgraph_lines(
    node: &CallNode,
    indent: usize,
    direction: Direction,
    out: &mut Vec<String>,
) {
    let prefix = "  ".repeat(indent);
    let mut line = format!("{}{}", prefix, node.name);
    if let Some(kind) = &node.kind {
        line.push_str(&format!(" [{}]", kind));
    }
    if node.cycle {
        line.push_str(" (cycle)");
    }
    if node.truncated {
        line.push_str(" (truncated)");
    }
    if node.unresolved {
        line.push_str(" (unresolved)");
    }
    if !node.candidates.is_empty() {
        line.push_str(&format!(" (ambiguous: {})", node.candidates.join(", ")));
    }
    out.push(line);

    if direction != Direction::Callers && !node.calls.is_empty() {
        out.push(format!("{}  Calls:", prefix));
        for child in &node.calls {
            push_callgraph_lines(child, indent + 2, Direction::Calls, out);
        }
    }
    if direction != Direction::Calls && !node.callers.is_empty() {
        out.push(format!("{}  Called by:", prefix));
        for child in &node.callers {
            push_callgraph_lines(child, indent + 2, Direction::Callers, out);
        }
    }
}

/// Aligned `Name  Kind  File  Line` table of `shown`, out of `total` matches
pub fn format_list_text(shown: &[&DocSymbol], total: usize, page: Page) -> String {
    let basename = |s: &DocSymbol| -> String {
        Path::new(&s.file)
            .file_name()
            .map_or_else(|| s.file.clone(), |n| n.to_string_lossy().into_owned())
    };
    let files: Vec<String> = shown.iter().map(|s| basename(s)).collect();

    let name_width = shown.iter().map(|s| s.name.chars().count()).max().unwrap_or(0).max(4);
    let kind_width = shown.iter().map(|s| s.kind.chars().count()).max().unwrap_or(0).max(4);
    let file_width = files.iter().map(|f| f.chars().count()).max().unwrap_or(0).max(4);

    let header = format!(
        "{:<nw$}  {:<kw$}  {:<fw$}  Line",
        "Name",
        "Kind",
        "File",
        nw = name_width,
        kw = kind_width,
        fw = file_width
    );
    let separator = "-".repeat(header.chars().count());
    let mut lines = vec![header, separator];
    for (symbol, file) in shown.iter().zip(&files) {
        lines.push(format!(
            "{:<nw$}  {:<kw$}  {:<fw$}  {}",
            symbol.name,
            symbol.kind,
            file,
            symbol.line,
            nw = name_width,
            kw = kind_width,
            fw = file_width
        ));
    }

    let mut footer = format!("\nTotal: {} symbols", total);
    if !page.is_full() {
        if shown.is_empty() {
            footer.push_str(" (none in requested range)");
        } else {
            let first = page.offset + 1;
            footer.push_str(&format!(" (showing {}-{})", first, page.offset + shown.len()));
        }
    }
    lines.push(footer);
    lines.join("\n")
}
