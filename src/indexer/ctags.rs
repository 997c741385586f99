//! Universal Ctags command line and JSON output parsing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::ToolError;
use crate::models::{Symbol, SymbolKind};
use crate::utils::ToolCommand;

/// Ctags C kind letters requested by default: macros, functions, enumerators,
/// enums, members, structs, typedefs, unions, variables
pub const DEFAULT_KINDS: &str = "dfegmstuv";

/// Directory names never worth indexing
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "build",
    "dist",
    "node_modules",
    "__pycache__",
    ".venv",
    "vendor",
    "target",
    "out",
    "bin",
    "obj",
    "CMakeFiles",
    ".cache",
];

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const TOOL_NAME: &str = "ctags";

/// Settings for one ctags run
#[derive(Debug, Clone)]
pub struct CtagsOptions {
    pub kinds: String,
    pub exclude_dirs: Vec<String>,
    pub include_headers: bool,
    pub extra_args: Vec<String>,
    pub timeout: Duration,
}

impl Default for CtagsOptions {
    fn default() -> Self {
        Self {
            kinds: DEFAULT_KINDS.to_string(),
            exclude_dirs: DEFAULT_EXCLUDES.iter().map(|d| d.to_string()).collect(),
            include_headers: true,
            extra_args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Build the ctags invocation for `workspace`.
///
/// Output goes to stdout as JSON Lines with line, end line, long kind names,
/// signature and scope fields; sorting is left to the report renderer.
pub fn ctags_command(ctags: &Path, workspace: &Path, options: &CtagsOptions) -> ToolCommand {
    let langmap = if options.include_headers { "--langmap=C:.c.h" } else { "--langmap=C:.c" };

    ToolCommand::new(TOOL_NAME, ctags, options.timeout)
        .args([
            "--languages=C".to_string(),
            format!("--kinds-C={}", options.kinds),
            "--fields=+neKSZ".to_string(),
            "--fields-C=+{macrodef}".to_string(),
            "--output-format=json".to_string(),
            "--sort=no".to_string(),
            "-f".to_string(),
            "-".to_string(),
            "--recurse".to_string(),
            langmap.to_string(),
        ])
        .args(options.exclude_dirs.iter().map(|d| format!("--exclude={}", d)))
        .args(options.extra_args.iter().cloned())
        .arg(workspace.as_os_str())
}

/// One JSON line of ctags output. Pseudo-tags share the shape with `_type: "ptag"`.
#[derive(Debug, Deserialize)]
struct CtagsEntry {
    #[serde(rename = "_type")]
    entry_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    end: Option<u32>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    typeref: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Parse ctags JSON Lines output into symbols.
///
/// Blank lines and pseudo-tags are ignored. Unparseable lines are skipped with
/// a warning, but output where more than half the lines are unparseable is
/// rejected as malformed. Tags without a name and compiler-generated `__anon`
/// names are dropped.
pub fn parse_tags(stdout: &str) -> Result<Vec<Symbol>, ToolError> {
    let mut symbols = Vec::new();
    let mut total_lines = 0usize;
    let mut malformed = 0usize;
    let mut first_error = None;

    for (line_num, line) in stdout.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        total_lines += 1;

        let entry: CtagsEntry = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unparseable ctags output line {}: {}", line_num + 1, e);
                malformed += 1;
                first_error.get_or_insert_with(|| format!("line {}: {}", line_num + 1, e));
                continue;
            }
        };

        if entry.entry_type != "tag" {
            continue;
        }
        if let Some(symbol) = entry_to_symbol(entry) {
            symbols.push(symbol);
        }
    }

    if total_lines > 0 && malformed * 2 > total_lines {
        return Err(ToolError::MalformedOutput {
            tool: TOOL_NAME.to_string(),
            detail: format!(
                "{} of {} lines are not valid JSON (first: {})",
                malformed,
                total_lines,
                first_error.unwrap_or_default()
            ),
        });
    }

    Ok(symbols)
}

fn entry_to_symbol(entry: CtagsEntry) -> Option<Symbol> {
    if entry.name.is_empty() || entry.name.starts_with("__anon") {
        return None;
    }
    let kind = SymbolKind::from(entry.kind.unwrap_or_else(|| "unknown".to_string()));
    let detail = detail_for(&kind, entry.typeref.as_deref());

    Some(Symbol {
        name: entry.name,
        kind,
        path: PathBuf::from(entry.path),
        start_line: entry.line,
        end_line: entry.end,
        detail,
        signature: entry.signature.filter(|s| !s.is_empty()),
        scope: entry.scope.filter(|s| !s.is_empty()),
    })
}

/// Short text for the report's Detail column, taken from ctags' `typeref`
/// (`typename:int` becomes `int`): the return type of functions and the
/// underlying type of typedefs, variables and members
fn detail_for(kind: &SymbolKind, typeref: Option<&str>) -> Option<String> {
    let (_, value) = typeref?.split_once(':')?;
    match kind {
        SymbolKind::Function => Some(value.to_string()),
        SymbolKind::Typedef | SymbolKind::Variable | SymbolKind::Member
            if !value.starts_with("__anon") =>
        {
            Some(value.to_string())
        }
        _ => None,
    }
    .filter(|v| !v.is_empty())
}
