//! Source-file discovery for staleness checks.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

/// Walks source trees looking for files whose names match a set of globs,
/// skipping excluded directory names at any depth
#[derive(Debug, Clone)]
pub struct SourceScan {
    patterns: GlobSet,
    excluded_dirs: HashSet<String>,
}

impl SourceScan {
    /// `patterns` are file-name globs such as `*.c`
    pub fn new<P, E>(patterns: &[P], excluded_dirs: &[E]) -> Result<Self>
    where
        P: AsRef<str>,
        E: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            builder.add(
                Glob::new(pattern).with_context(|| format!("Invalid file pattern: {}", pattern))?,
            );
        }
        Ok(Self {
            patterns: builder.build().context("Failed to compile file patterns")?,
            excluded_dirs: excluded_dirs.iter().map(|d| d.as_ref().to_string()).collect(),
        })
    }

    /// Newest modification time among matching files, `None` if there are none
    pub fn newest_mtime(&self, roots: &[PathBuf]) -> Option<SystemTime> {
        self.matching_mtimes(roots).max()
    }

    /// True as soon as one matching file is newer than `reference`
    pub fn any_newer_than(&self, roots: &[PathBuf], reference: SystemTime) -> bool {
        self.matching_mtimes(roots).any(|mtime| mtime > reference)
    }

    fn matching_mtimes<'a>(
        &'a self,
        roots: &'a [PathBuf],
    ) -> impl Iterator<Item = SystemTime> + 'a {
        roots
            .iter()
            .filter(|root| root.exists())
            .flat_map(move |root| {
                WalkDir::new(root).into_iter().filter_entry(move |e| !self.is_excluded(e))
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file() && self.patterns.is_match(entry.file_name())
            })
            .filter_map(|entry| entry.metadata().ok()?.modified().ok())
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self.excluded_dirs.contains(entry.file_name().to_string_lossy().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use super::*;

    fn set_mtime(path: &std::path::Path, time: SystemTime) {
        fs::File::options().write(true).open(path).unwrap().set_modified(time).unwrap();
    }

    #[test]
    fn test_newest_mtime_ignores_other_extensions_and_excluded_dirs() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("build")).unwrap();

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        fs::write(root.join("src/a.c"), "int a;").unwrap();
        set_mtime(&root.join("src/a.c"), base);
        fs::write(root.join("notes.txt"), "x").unwrap();
        set_mtime(&root.join("notes.txt"), base + Duration::from_secs(500));
        fs::write(root.join("build/gen.c"), "int g;").unwrap();
        set_mtime(&root.join("build/gen.c"), base + Duration::from_secs(900));

        let scan = SourceScan::new(&["*.c", "*.h"], &["build"]).unwrap();
        assert_eq!(scan.newest_mtime(&[root.to_path_buf()]), Some(base));
        assert!(!scan.any_newer_than(&[root.to_path_buf()], base));
        assert!(scan.any_newer_than(&[root.to_path_buf()], base - Duration::from_secs(1)));
    }

    #[test]
    fn test_no_matches_and_missing_roots() {
        let temp = tempfile::TempDir::new().unwrap();
        let scan = SourceScan::new(&["*.c"], &[] as &[&str]).unwrap();
        assert_eq!(scan.newest_mtime(&[temp.path().to_path_buf()]), None);
        assert_eq!(scan.newest_mtime(&[temp.path().join("missing")]), None);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(SourceScan::new(&["[unclosed"], &[] as &[&str]).is_err());
    }
}
