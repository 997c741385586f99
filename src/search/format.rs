use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::models::Symbol;

pub const NO_MATCHES: &str = "No matching symbols found.";

/// Human-readable listing grouped by file, then by kind.
///
/// Only the first match of each kind in a file is listed unless `show_all` is
/// set; the header always counts every match.
pub fn format_text(results: &[&Symbol], show_all: bool) -> String {
    if results.is_empty() {
        return NO_MATCHES.to_string();
    }

    let mut by_file: BTreeMap<String, BTreeMap<&str, Vec<&Symbol>>> = BTreeMap::new();
    for symbol in results {
        by_file
            .entry(symbol.path.to_string_lossy().into_owned())
            .or_default()
            .entry(symbol.kind.as_str())
            .or_default()
            .push(symbol);
    }

    let mut out = format!("Found {} matching symbol(s):\n", results.len());
    for (file, kinds) in &by_file {
        out.push_str(&format!("\n📄 {}\n", file));
        for (kind, symbols) in kinds {
            let shown = if show_all { symbols.len() } else { 1 };
            for symbol in symbols.iter().take(shown) {
                out.push_str(&format!(
                    "   • `{}` ({}) - Lines {}-{}\n",
                    symbol.name,
                    kind,
                    symbol.start_line,
                    symbol.last_line()
                ));
            }
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// Every matched row as a pretty-printed JSON array (`[]` when empty)
pub fn format_json(results: &[&Symbol]) -> Result<String> {
    serde_json::to_string_pretty(results).context("Failed to serialize search results")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::models::SymbolKind;

    fn create_symbol(
        name: &str,
        kind: SymbolKind,
        path: &str,
        start: u32,
        end: Option<u32>,
    ) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind,
            path: PathBuf::from(path),
            start_line: start,
            end_line: end,
            detail: None,
            signature: None,
            scope: None,
        }
    }

    #[test]
    fn test_no_results() {
        assert_eq!(format_text(&[], false), "No matching symbols found.");
        assert_eq!(format_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_first_match_per_kind() {
        let a = create_symbol("list_add", SymbolKind::Function, "src/list.c", 10, Some(20));
        let b = create_symbol("list_del", SymbolKind::Function, "src/list.c", 22, Some(30));
        let c = create_symbol("list", SymbolKind::Struct, "src/list.h", 3, Some(7));
        let d = create_symbol("LIST_MAX", SymbolKind::Macro, "src/list.c", 1, None);

        let text = format_text(&[&a, &b, &c, &d], false);
        let expected = "Found 4 matching symbol(s):\n\
            \n📄 src/list.c\n\
            \x20  • `list_add` (function) - Lines 10-20\n\
            \x20  • `LIST_MAX` (macro) - Lines 1-1\n\
            \n📄 src/list.h\n\
            \x20  • `list` (struct) - Lines 3-7";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_show_all_lists_every_match() {
        let a = create_symbol("list_add", SymbolKind::Function, "src/list.c", 10, Some(20));
        let b = create_symbol("list_del", SymbolKind::Function, "src/list.c", 22, Some(30));
        let text = format_text(&[&a, &b], true);
        assert!(text.contains("`list_add`"));
        assert!(text.contains("`list_del` (function) - Lines 22-30"));
    }

    #[test]
    fn test_json_rows() {
        let a = create_symbol("main", SymbolKind::Function, "main.c", 3, Some(9));
        let json = format_json(&[&a]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "main");
        assert_eq!(value[0]["kind"], "function");
        assert_eq!(value[0]["path"], "main.c");
        assert_eq!(value[0]["end_line"], 9);
    }
}
