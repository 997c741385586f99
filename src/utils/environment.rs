use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Locate an executable.
///
/// Anything containing a path separator is taken as a path and returned as is
/// (existence is checked when the tool is spawned); a bare name is looked up on
/// `PATH`. Returns `None` when a bare name is not on `PATH`.
pub fn find_executable(name_or_path: &Path) -> Option<PathBuf> {
    if name_or_path.components().count() > 1 || name_or_path.is_absolute() {
        return Some(name_or_path.to_path_buf());
    }
    which::which(name_or_path).ok()
}

/// Path of the running binary, used when writing commands that call back into it
pub fn current_exe() -> Result<PathBuf> {
    env::current_exe().context("Failed to determine the path of the running executable")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_paths_are_returned_unchanged() {
        let path = Path::new("/opt/tools/bin/ctags");
        assert_eq!(find_executable(path), Some(path.to_path_buf()));

        let relative = Path::new("./bin/ctags");
        assert_eq!(find_executable(relative), Some(relative.to_path_buf()));
    }

    #[test]
    fn test_unknown_bare_name_is_none() {
        assert_eq!(find_executable(Path::new("no-such-tool-code-skills-test")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_bare_name_found_on_path() {
        let found = find_executable(Path::new("sh")).expect("sh should be on PATH");
        assert!(found.is_absolute());
    }
}
