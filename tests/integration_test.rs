/// End-to-end integration tests for code-skills
///
/// These tests verify complete workflows: indexing → searching, and
/// generating → querying documentation, with shell scripts standing in for
/// ctags and Doxygen
mod common;

use std::fs;

use code_skills::docs::{Direction, DocIndex, DocQuery, ListFilter, OutputFormat, QueryOptions};
use code_skills::hook::{self, DEFAULT_HOOK_TYPE, InstallOutcome, RemoveOutcome};
use code_skills::indexer::{parse_report, read_report};
use common::{WorkspaceBuilder, documented_workspace};

#[cfg(unix)]
mod indexing {
    use std::path::Path;

    use code_skills::indexer::{IndexOptions, build_index, read_report};
    use code_skills::search::{ReportState, SearchOptions, SearchQuery, SearchTarget, search};

    use super::common::{
        ctags_calls, fake_ctags, hours_ago, sample_c_workspace, sample_tags, set_mtime,
    };

    fn options(ctags: &Path) -> SearchOptions {
        SearchOptions {
            index: IndexOptions { ctags_path: Some(ctags.to_path_buf()), ..Default::default() },
            force_index: false,
        }
    }

    #[test]
    fn test_e2e_index_three_files() {
        let workspace = sample_c_workspace().build();
        let tools = tempfile::TempDir::new().unwrap();
        let ctags = fake_ctags(tools.path(), &sample_tags());

        let summary = build_index(
            workspace.path(),
            &IndexOptions { ctags_path: Some(ctags.clone()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(summary.files, 3);
        assert_eq!(summary.symbols.len(), 7);

        let report = std::fs::read_to_string(workspace.path().join("indexing.md")).unwrap();
        assert!(report.starts_with("# Code Index\n"));
        assert!(report.contains("**Files**: 3 | **Symbols**: 7"));
        assert!(report.contains("> function: 5 | struct: 2\n"));

        let rows: Vec<&str> = report.lines().filter(|l| l.starts_with("| `")).collect();
        assert_eq!(rows.len(), 7, "One row per symbol");
        let names: Vec<&str> = rows.iter().map(|r| r.split('`').nth(1).unwrap()).collect();
        let mut sorted = names.clone();
        sorted.sort_by_key(|n| n.to_lowercase());
        assert_eq!(names, sorted, "Rows sorted by name");
        assert!(report.contains("| `run` | `src/main.c` | function | 8 - 11 |"));

        let target = SearchTarget::resolve(workspace.path(), None).unwrap();
        let query = SearchQuery::new("run", None, true);
        let outcome = search(&target, &query, &options(&ctags)).unwrap();
        assert_eq!(outcome.report_state, ReportState::UpToDate);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(ctags_calls(tools.path()), 1, "Search on a fresh report must not re-index");
    }

    #[test]
    fn test_stale_report_is_regenerated_exactly_once() {
        let workspace = sample_c_workspace().build();
        let tools = tempfile::TempDir::new().unwrap();
        let ctags = fake_ctags(tools.path(), &sample_tags());
        let target = SearchTarget::resolve(workspace.path(), None).unwrap();
        let query = SearchQuery::new("list", None, false);

        // Missing report: built before searching
        let outcome = search(&target, &query, &options(&ctags)).unwrap();
        assert_eq!(outcome.report_state, ReportState::Regenerated);
        assert_eq!(ctags_calls(tools.path()), 1);

        for file in ["src/main.c", "src/list.c", "src/list.h"] {
            set_mtime(&workspace.path().join(file), hours_ago(2));
        }
        set_mtime(&target.report, hours_ago(1));
        let outcome = search(&target, &query, &options(&ctags)).unwrap();
        assert_eq!(outcome.report_state, ReportState::UpToDate);
        assert_eq!(ctags_calls(tools.path()), 1);

        set_mtime(&workspace.path().join("src/list.c"), std::time::SystemTime::now());
        let outcome = search(&target, &query, &options(&ctags)).unwrap();
        assert_eq!(outcome.report_state, ReportState::Regenerated);
        assert_eq!(ctags_calls(tools.path()), 2, "Exactly one regeneration");

        let outcome = search(&target, &query, &options(&ctags)).unwrap();
        assert_eq!(outcome.report_state, ReportState::UpToDate);
        assert_eq!(ctags_calls(tools.path()), 2);
        // list_push, list_pop, list_free and struct list
        assert_eq!(outcome.results.len(), 4);
    }

    #[test]
    fn test_excluded_dirs_do_not_make_report_stale() {
        let workspace = sample_c_workspace()
            .with_file("build/generated.c", "int generated;\n")
            .build();
        let tools = tempfile::TempDir::new().unwrap();
        let ctags = fake_ctags(tools.path(), &sample_tags());
        let target = SearchTarget::resolve(workspace.path(), None).unwrap();
        let query = SearchQuery::new("main", None, true);

        search(&target, &query, &options(&ctags)).unwrap();
        for file in ["src/main.c", "src/list.c", "src/list.h"] {
            set_mtime(&workspace.path().join(file), hours_ago(2));
        }
        set_mtime(&target.report, hours_ago(1));

        let outcome = search(&target, &query, &options(&ctags)).unwrap();
        assert_eq!(outcome.report_state, ReportState::UpToDate);
        assert_eq!(ctags_calls(tools.path()), 1);
    }

    #[test]
    fn test_type_filter_does_not_shrink_report() {
        let workspace = sample_c_workspace().build();
        let tools = tempfile::TempDir::new().unwrap();
        let ctags = fake_ctags(tools.path(), &sample_tags());
        let target = SearchTarget::resolve(workspace.path(), None).unwrap();

        let query = SearchQuery::new("list", Some("struct"), false);
        let outcome = search(&target, &query, &options(&ctags)).unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(read_report(&target.report).unwrap().len(), 7);
    }
}

#[test]
fn test_report_round_trips_through_parser() {
    let report = "# Code Index\n\n---\n\n| Name | File | Type | Lines | Detail |\n\
                  |------|------|------|-------|--------|\n\
                  | `cmp` | src/a.c | function | 3 - 9 | int |\n\
                  | `Flags` | src/a.h | typedef | 12 | unsigned \\| int |\n";
    let symbols = parse_report(report);
    assert_eq!(symbols.len(), 2);
    assert_eq!(symbols[0].end_line, Some(9));
    assert_eq!(symbols[1].detail.as_deref(), Some("unsigned | int"));
}

#[test]
fn test_read_missing_report_fails() {
    let workspace = WorkspaceBuilder::new().build();
    assert!(read_report(&workspace.path().join("indexing.md")).is_err());
}

fn query(workspace: &std::path::Path, format: OutputFormat) -> DocQuery {
    let options = QueryOptions { format, ..Default::default() };
    DocQuery::open(workspace, &options).unwrap()
}

#[test]
fn test_callgraph_marks_recursion_as_cycles() {
    let workspace = documented_workspace();
    let index = DocIndex::load(&workspace.path().join(".doxygen/xml"), true).unwrap();

    let fact = index.callgraph("fact", 5, Direction::Both, "");
    assert!(fact.calls.iter().any(|c| c.name == "fact" && c.cycle));

    let ping = index.callgraph("ping", 10, Direction::Calls, "");
    let pong = &ping.calls[0];
    assert_eq!(pong.name, "pong");
    assert!(!pong.cycle);
    assert!(pong.calls[0].cycle, "Returning to ping is a cycle");

    let main = index.callgraph("main", 3, Direction::Calls, "");
    let printf = main.calls.iter().find(|c| c.name == "printf").unwrap();
    assert!(printf.unresolved, "Library calls have no definition");
}

#[test]
fn test_query_commands_on_generated_xml() {
    let workspace = documented_workspace();
    let text = query(workspace.path(), OutputFormat::Text);

    let symbol = text.symbol("fact").unwrap();
    assert!(symbol.contains("Parameters:   int n"));
    assert!(symbol.contains("Called by:    fact, main"));

    let body = text.body("fact").unwrap();
    assert!(body.starts_with("// src/main.c:10-14\n"));
    assert!(body.contains("    13      return n <= 1 ? 1 : n * fact(n - 1);"));

    let list = text.list(&ListFilter::default()).unwrap();
    assert!(list.ends_with("Total: 5 symbols"));

    let json = query(workspace.path(), OutputFormat::Json);
    let found: Vec<serde_json::Value> =
        serde_json::from_str(&json.search("p?ng", false, Default::default()).unwrap()).unwrap();
    assert_eq!(found.len(), 2);

    assert!(workspace.path().join(".doxygen/symbols.json").is_file(), "Cache written");
}

#[test]
fn test_query_body_without_body_info() {
    let workspace = documented_workspace();
    let out = query(workspace.path(), OutputFormat::Text).body("x").unwrap();
    assert_eq!(out, "No body information available for: x");
}

#[test]
fn test_hook_install_is_idempotent_and_remove_restores() {
    let workspace = WorkspaceBuilder::new().with_git().build();
    let hook_path = hook::hook_path(workspace.path(), DEFAULT_HOOK_TYPE).unwrap();
    let original = "#!/bin/sh\n# run the linters\nmake lint || exit 1";
    fs::write(&hook_path, original).unwrap();

    let block = hook::hook_block(std::path::Path::new("/opt/code-skills"), workspace.path());
    assert_eq!(hook::install(&hook_path, &block).unwrap(), InstallOutcome::Installed);
    let installed = fs::read_to_string(&hook_path).unwrap();
    assert_eq!(hook::install(&hook_path, &block).unwrap(), InstallOutcome::AlreadyInstalled);
    assert_eq!(fs::read_to_string(&hook_path).unwrap(), installed, "Second install is a no-op");
    assert!(installed.starts_with(original));

    assert_eq!(hook::remove(&hook_path).unwrap(), RemoveOutcome::Removed);
    assert_eq!(fs::read_to_string(&hook_path).unwrap(), original);
}

#[test]
fn test_hook_file_created_and_deleted() {
    let workspace = WorkspaceBuilder::new().with_git().build();
    let hook_path = hook::hook_path(workspace.path(), "post-merge").unwrap();
    let block = hook::hook_block(std::path::Path::new("/opt/code-skills"), workspace.path());

    hook::install(&hook_path, &block).unwrap();
    assert!(hook::is_installed(&hook_path));
    assert_eq!(hook::remove(&hook_path).unwrap(), RemoveOutcome::FileDeleted);
    assert!(!hook_path.exists());
}
