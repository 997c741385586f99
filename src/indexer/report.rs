//! The `indexing.md` markdown report: rendering and reading it back.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::models::{Symbol, SymbolKind};
use crate::utils::relative_to;

/// Default report file name inside the workspace
pub const REPORT_FILE: &str = "indexing.md";

const TABLE_HEADER: &str = "| Name | File | Type | Lines | Detail |";
const TABLE_SEPARATOR: &str = "|------|------|------|-------|--------|";

/// Reports larger than this are refused when reading
const MAX_REPORT_BYTES: u64 = 64 * 1024 * 1024;

/// Symbol counts per kind, most frequent first, ties by kind name
pub fn kind_counts(symbols: &[Symbol]) -> Vec<(&str, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for symbol in symbols {
        *counts.entry(symbol.kind.as_str()).or_default() += 1;
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    counts
}

/// Sort symbols into report order: case-insensitive name, then name, file, line
pub fn sort_symbols(symbols: &mut [Symbol]) {
    symbols.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.start_line.cmp(&b.start_line))
    });
}

/// Render the report for `symbols` found under `root`, stamped with the current time
pub fn render_report(root: &Path, symbols: &[Symbol], show_stats: bool) -> String {
    render_report_at(root, symbols, show_stats, Local::now())
}

/// Render the report with an explicit generation time.
///
/// Symbol paths are written relative to `root`. The output depends only on its
/// inputs, so two runs over the same tags produce identical tables.
pub fn render_report_at(
    root: &Path,
    symbols: &[Symbol],
    show_stats: bool,
    generated: DateTime<Local>,
) -> String {
    let mut rows: Vec<Symbol> = symbols
        .iter()
        .map(|s| Symbol { path: relative_to(&s.path, root), ..s.clone() })
        .collect();
    sort_symbols(&mut rows);

    let mut out = String::from("# Code Index\n\n");

    if show_stats {
        let files: BTreeSet<&Path> = rows.iter().map(|s| s.path.as_path()).collect();
        out.push_str(&format!(
            "> **Generated**: {} | **Files**: {} | **Symbols**: {}\n",
            generated.format("%Y-%m-%d %H:%M"),
            files.len(),
            rows.len()
        ));
        out.push_str("> **Tool**: Universal Ctags\n\n");

        let counts = kind_counts(&rows);
        if !counts.is_empty() {
            let line = counts
                .iter()
                .map(|(kind, n)| format!("{}: {}", kind, n))
                .collect::<Vec<_>>()
                .join(" | ");
            out.push_str(&format!("> {}\n\n", line));
        }
    }

    out.push_str("---\n\n");
    out.push_str(TABLE_HEADER);
    out.push('\n');
    out.push_str(TABLE_SEPARATOR);
    out.push('\n');

    for symbol in &rows {
        out.push_str(&format!(
            "| `{}` | `{}` | {} | {} | {} |\n",
            escape_cell(&symbol.name),
            escape_cell(&symbol.path.to_string_lossy()),
            escape_cell(symbol.kind.as_str()),
            symbol.line_range(),
            escape_cell(symbol.detail.as_deref().unwrap_or(""))
        ));
    }

    out
}

/// Write the report atomically so a failed run never leaves a partial file
pub fn write_report(path: &Path, content: &str) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;
    }
    let temp = path.with_extension("md.tmp");
    fs::write(&temp, content)
        .with_context(|| format!("Failed to write report: {}", temp.display()))?;
    fs::rename(&temp, path)
        .with_context(|| format!("Failed to move report into place: {}", path.display()))?;
    Ok(())
}

/// Read and parse a report file
pub fn read_report(path: &Path) -> Result<Vec<Symbol>> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open report: {}", path.display()))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    if size > MAX_REPORT_BYTES {
        anyhow::bail!("Report too large: {} ({} bytes)", path.display(), size);
    }
    let mut content = String::new();
    file.read_to_string(&mut content)
        .with_context(|| format!("Failed to read report: {}", path.display()))?;
    Ok(parse_report(&content))
}

/// Parse the symbol table of a report.
///
/// Everything before the `| Name | File | ...` header is ignored, as are rows
/// with too few cells or an unparseable line range. Paths stay exactly as
/// written (workspace-relative).
pub fn parse_report(content: &str) -> Vec<Symbol> {
    content
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("| Name |"))
        .skip(1)
        .filter(|line| !line.trim_start().starts_with("|--"))
        .filter_map(parse_row)
        .collect()
}

fn parse_row(line: &str) -> Option<Symbol> {
    let cells = split_row(line)?;
    if cells.len() < 4 {
        return None;
    }
    let (start_line, end_line) = parse_line_range(&cells[3])?;
    let name = strip_backticks(&cells[0]);
    if name.is_empty() {
        return None;
    }

    Some(Symbol {
        name: name.to_string(),
        kind: SymbolKind::from(cells[2].clone()),
        path: PathBuf::from(strip_backticks(&cells[1])),
        start_line,
        end_line,
        detail: cells.get(4).filter(|d| !d.is_empty()).cloned(),
        signature: None,
        scope: None,
    })
}

/// Split `| a | b\|c | d |` into unescaped, trimmed cells
fn split_row(line: &str) -> Option<Vec<String>> {
    let inner = line.trim().strip_prefix('|')?;
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    // Text after the final pipe is not a cell
    Some(cells)
}

fn strip_backticks(cell: &str) -> &str {
    cell.strip_prefix('`').and_then(|c| c.strip_suffix('`')).unwrap_or(cell)
}

/// Accepts `10 - 20`, `10-20` and `10`
fn parse_line_range(cell: &str) -> Option<(u32, Option<u32>)> {
    match cell.split_once('-') {
        Some((start, end)) => Some((start.trim().parse().ok()?, Some(end.trim().parse().ok()?))),
        None => Some((cell.trim().parse().ok()?, None)),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
