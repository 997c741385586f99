//! Git hook that regenerates documentation in the background.
//!
//! The hook lives inside a marker-delimited block so it can share a hook file
//! with other tooling. Installing appends the block; removing it restores the
//! file byte for byte, deleting it when nothing but a shebang would be left.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

pub const BEGIN_MARKER: &str = "# BEGIN code-skills-doc-hook";
pub const END_MARKER: &str = "# END code-skills-doc-hook";
pub const DEFAULT_HOOK_TYPE: &str = "pre-push";

const SHEBANG: &str = "#!/bin/sh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The block was all that was left, so the hook file was deleted
    FileDeleted,
    NotInstalled,
    NoHookFile,
}

/// Path of the `hook_type` hook for the repository at `workspace`.
///
/// When `.git` is a `gitdir:` file (worktrees, submodules) the hooks of the
/// directory it points to are used.
pub fn hook_path(workspace: &Path, hook_type: &str) -> Result<PathBuf> {
    let mut git_dir = workspace.join(".git");
    if git_dir.is_file() {
        let content = fs::read_to_string(&git_dir)
            .with_context(|| format!("Failed to read {}", git_dir.display()))?;
        if let Some(target) = content.trim().strip_prefix("gitdir:") {
            let target = PathBuf::from(target.trim());
            git_dir = if target.is_absolute() { target } else { workspace.join(target) };
            debug!("Following gitdir link to {}", git_dir.display());
        }
    }
    Ok(git_dir.join("hooks").join(hook_type))
}

/// The delimited block: regenerate documentation for `workspace` with `exe`,
/// detached so the push is not held up
pub fn hook_block(exe: &Path, workspace: &Path) -> String {
    format!(
        "{}\n# Regenerate Doxygen documentation on push\n\"{}\" docs generate \"{}\" --force &\n{}",
        BEGIN_MARKER,
        escape_double_quoted(&exe.display().to_string()),
        escape_double_quoted(&workspace.display().to_string()),
        END_MARKER
    )
}

/// Escape the characters `sh` still interprets inside double quotes
fn escape_double_quoted(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Hook content with `block` added, or `None` when a block is already present
pub fn insert_block(existing: Option<&str>, block: &str) -> Option<String> {
    match existing {
        None | Some("") => Some(format!("{}\n\n{}\n", SHEBANG, block)),
        Some(content) if contains_marker(content) => None,
        // "X\n" gains a blank separator line, "X" only the missing line break
        Some(content) => Some(format!("{}\n{}\n", content, block)),
    }
}

/// Hook content with the block and the line break before it removed, or
/// `None` when there is no block
pub fn remove_block(content: &str) -> Option<String> {
    let mut offset = 0;
    let mut begin = None;
    let mut end = None;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if begin.is_none() && trimmed == BEGIN_MARKER {
            begin = Some((offset, line.len()));
        } else if begin.is_some() && trimmed == END_MARKER {
            end = Some(offset + line.len());
            break;
        }
        offset += line.len();
    }

    let (begin, begin_len) = begin?;
    let Some(end) = end else {
        // Without an END marker only the BEGIN line goes; what follows belongs to the user
        warn!("{} has no matching {}; removing only the marker line", BEGIN_MARKER, END_MARKER);
        return Some(format!("{}{}", &content[..begin], &content[begin + begin_len..]));
    };
    let start = if content[..begin].ends_with('\n') { begin - 1 } else { begin };
    Some(format!("{}{}", &content[..start], &content[end..]))
}

/// Whether nothing meaningful is left in a hook file
fn is_effectively_empty(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed.is_empty() || (trimmed.starts_with("#!") && !trimmed.contains('\n'))
}

fn contains_marker(content: &str) -> bool {
    content.lines().any(|line| line.trim() == BEGIN_MARKER)
}

pub fn is_installed(hook_path: &Path) -> bool {
    fs::read_to_string(hook_path)
        .map(|content| {
            contains_marker(&content) && content.lines().any(|l| l.trim() == END_MARKER)
        })
        .unwrap_or(false)
}

/// Add the block to the hook file, creating it if needed, and make it executable
pub fn install(hook_path: &Path, block: &str) -> Result<InstallOutcome> {
    let existing = if hook_path.exists() {
        Some(
            fs::read_to_string(hook_path)
                .with_context(|| format!("Failed to read hook: {}", hook_path.display()))?,
        )
    } else {
        None
    };

    let Some(content) = insert_block(existing.as_deref(), block) else {
        return Ok(InstallOutcome::AlreadyInstalled);
    };

    if let Some(parent) = hook_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create hooks directory: {}", parent.display()))?;
    }
    fs::write(hook_path, content)
        .with_context(|| format!("Failed to write hook: {}", hook_path.display()))?;
    make_executable(hook_path)?;
    Ok(InstallOutcome::Installed)
}

pub fn remove(hook_path: &Path) -> Result<RemoveOutcome> {
    if !hook_path.exists() {
        return Ok(RemoveOutcome::NoHookFile);
    }
    let content = fs::read_to_string(hook_path)
        .with_context(|| format!("Failed to read hook: {}", hook_path.display()))?;
    let Some(remaining) = remove_block(&content) else {
        return Ok(RemoveOutcome::NotInstalled);
    };

    if is_effectively_empty(&remaining) {
        fs::remove_file(hook_path)
            .with_context(|| format!("Failed to delete hook: {}", hook_path.display()))?;
        return Ok(RemoveOutcome::FileDeleted);
    }
    fs::write(hook_path, remaining)
        .with_context(|| format!("Failed to write hook: {}", hook_path.display()))?;
    Ok(RemoveOutcome::Removed)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("Failed to make {} executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
