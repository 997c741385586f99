//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

/// Builder for throwaway C workspaces
pub struct WorkspaceBuilder {
    temp_dir: TempDir,
}

impl WorkspaceBuilder {
    /// Create a new builder with an empty workspace directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    /// Get the path to the workspace
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Add a file at `relative`, creating parent directories
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write workspace file");
        self
    }

    /// Add an empty `.git/hooks` directory so the workspace looks like a repository
    pub fn with_git(self) -> Self {
        fs::create_dir_all(self.temp_dir.path().join(".git/hooks")).expect("Failed to create .git");
        self
    }

    /// Build and return the temp directory (consumes self)
    pub fn build(self) -> TempDir {
        self.temp_dir
    }
}

impl Default for WorkspaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Three C files with five functions and two structs
pub fn sample_c_workspace() -> WorkspaceBuilder {
    WorkspaceBuilder::new()
        .with_file(
            "src/main.c",
            "#include \"list.h\"\n\nint main(void)\n{\n    return run();\n}\n\nint run(void)\n{\n    return 0;\n}\n",
        )
        .with_file(
            "src/list.c",
            "#include \"list.h\"\n\nvoid list_push(struct list *l) { }\nvoid list_pop(struct list *l) { }\nvoid list_free(struct list *l) { }\n",
        )
        .with_file("src/list.h", "struct node { int v; };\nstruct list { struct node *head; };\n")
}

/// One ctags JSON line
pub fn tag_line(name: &str, path: &str, line: u32, end: u32, kind: &str) -> String {
    format!(
        r#"{{"_type": "tag", "name": "{}", "path": "{}", "pattern": "/^x$/", "line": {}, "end": {}, "kind": "{}", "typeref": "typename:int"}}"#,
        name, path, line, end, kind
    )
}

/// ctags output matching [`sample_c_workspace`]
pub fn sample_tags() -> String {
    let mut lines = vec![
        r#"{"_type": "ptag", "name": "JSON_OUTPUT_VERSION", "path": "0.0", "pattern": "in development"}"#
            .to_string(),
    ];
    lines.push(tag_line("main", "src/main.c", 3, 6, "function"));
    lines.push(tag_line("run", "src/main.c", 8, 11, "function"));
    lines.push(tag_line("list_push", "src/list.c", 3, 3, "function"));
    lines.push(tag_line("list_pop", "src/list.c", 4, 4, "function"));
    lines.push(tag_line("list_free", "src/list.c", 5, 5, "function"));
    lines.push(tag_line("node", "src/list.h", 1, 1, "struct"));
    lines.push(tag_line("list", "src/list.h", 2, 2, "struct"));
    lines.join("\n") + "\n"
}

/// Write an executable shell script
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).expect("Failed to create script dir");
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
    let mut permissions = fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("Failed to chmod script");
    path
}

/// A stand-in for ctags that prints `tags` and appends one line to
/// `<dir>/ctags-calls` per invocation
#[cfg(unix)]
pub fn fake_ctags(dir: &Path, tags: &str) -> PathBuf {
    let tags_file = dir.join("tags.json");
    fs::create_dir_all(dir).expect("Failed to create tool dir");
    fs::write(&tags_file, tags).expect("Failed to write tags");
    write_script(
        dir,
        "ctags",
        &format!(
            "echo run >> \"{}\"\ncat \"{}\"",
            dir.join("ctags-calls").display(),
            tags_file.display()
        ),
    )
}

/// A tool that prints `stderr` and exits with `code`
#[cfg(unix)]
pub fn failing_tool(dir: &Path, name: &str, stderr: &str, code: i32) -> PathBuf {
    write_script(dir, name, &format!("echo '{}' >&2\nexit {}", stderr, code))
}

/// Number of times a [`fake_ctags`] in `dir` ran
pub fn ctags_calls(dir: &Path) -> usize {
    fs::read_to_string(dir.join("ctags-calls")).map(|s| s.lines().count()).unwrap_or(0)
}

/// A stand-in for Doxygen that copies [`write_xml_fixtures`] output into
/// `<workspace>/.doxygen/xml`, writes an HTML index and reports two warnings
#[cfg(unix)]
pub fn fake_doxygen(dir: &Path, workspace: &Path) -> PathBuf {
    let fixtures = dir.join("xml-fixtures");
    write_xml_fixtures(&fixtures);
    let out = workspace.join(".doxygen");
    write_script(
        dir,
        "doxygen",
        &format!(
            "test -f \"$1\" || exit 2\n\
             mkdir -p \"{out}/xml\" \"{out}/html\"\n\
             cp \"{fixtures}\"/*.xml \"{out}/xml/\"\n\
             echo '<html></html>' > \"{out}/html/index.html\"\n\
             echo 'src/main.c:3: warning: undocumented' >&2\n\
             echo 'src/main.c:8: Warning: also undocumented' >&2",
            out = out.display(),
            fixtures = fixtures.display()
        ),
    )
}

/// Set a file's modification time
pub fn set_mtime(path: &Path, time: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .expect("Failed to open file")
        .set_modified(time)
        .expect("Failed to set mtime");
}

pub fn hours_ago(hours: u64) -> SystemTime {
    SystemTime::now() - Duration::from_secs(hours * 3600)
}

pub const INDEX_XML: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='no'?>
<doxygenindex version="1.12.0">
  <compound refid="main_8c" kind="file"><name>main.c</name>
    <member refid="main_8c_1main" kind="function"><name>main</name></member>
    <member refid="main_8c_1fact" kind="function"><name>fact</name></member>
    <member refid="main_8c_1ping" kind="function"><name>ping</name></member>
    <member refid="main_8c_1pong" kind="function"><name>pong</name></member>
  </compound>
  <compound refid="structpoint" kind="struct"><name>point</name>
    <member refid="structpoint_1x" kind="variable"><name>x</name></member>
  </compound>
</doxygenindex>
"#;

pub const MAIN_C_XML: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='no'?>
<doxygen version="1.12.0">
  <compounddef id="main_8c" kind="file" language="C++">
    <compoundname>main.c</compoundname>
    <sectiondef kind="func">
      <memberdef kind="function" id="main_8c_1main" prot="public" static="no">
        <type>int</type>
        <name>main</name>
        <param><type>void</type></param>
        <briefdescription><para>Entry point.</para></briefdescription>
        <references refid="main_8c_1fact">fact</references>
        <references refid="main_8c_1ping">ping</references>
        <references>printf</references>
        <location file="src/main.c" line="3" bodyfile="src/main.c" bodystart="4" bodyend="8"/>
      </memberdef>
      <memberdef kind="function" id="main_8c_1fact" prot="public" static="no">
        <type>int</type>
        <name>fact</name>
        <param><type>int</type><declname>n</declname></param>
        <references refid="main_8c_1fact">fact</references>
        <referencedby refid="main_8c_1fact">fact</referencedby>
        <referencedby refid="main_8c_1main">main</referencedby>
        <location file="src/main.c" line="10" bodyfile="src/main.c" bodystart="11" bodyend="14"/>
      </memberdef>
      <memberdef kind="function" id="main_8c_1ping" prot="public" static="no">
        <type>void</type>
        <name>ping</name>
        <param><type>int</type><declname>n</declname></param>
        <references refid="main_8c_1pong">pong</references>
        <referencedby refid="main_8c_1main">main</referencedby>
        <referencedby refid="main_8c_1pong">pong</referencedby>
        <location file="src/main.c" line="15" bodyfile="src/main.c" bodystart="15" bodyend="15"/>
      </memberdef>
      <memberdef kind="function" id="main_8c_1pong" prot="public" static="no">
        <type>void</type>
        <name>pong</name>
        <param><type>int</type><declname>n</declname></param>
        <references refid="main_8c_1ping">ping</references>
        <referencedby refid="main_8c_1ping">ping</referencedby>
        <location file="src/main.c" line="16" bodyfile="src/main.c" bodystart="16" bodyend="16"/>
      </memberdef>
    </sectiondef>
    <location file="src/main.c"/>
  </compounddef>
</doxygen>
"#;

pub const POINT_XML: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='no'?>
<doxygen version="1.12.0">
  <compounddef id="structpoint" kind="struct" language="C++">
    <compoundname>point</compoundname>
    <sectiondef kind="public-attrib">
      <memberdef kind="variable" id="structpoint_1x" prot="public" static="no">
        <type>int</type>
        <name>x</name>
        <location file="src/point.h" line="2" bodyfile="src/point.h" bodystart="2" bodyend="-1"/>
      </memberdef>
    </sectiondef>
    <briefdescription><para>A point.</para></briefdescription>
    <location file="src/point.h" line="1" bodyfile="src/point.h" bodystart="1" bodyend="3"/>
  </compounddef>
</doxygen>
"#;

/// Source matching the line numbers in [`MAIN_C_XML`]
pub const MAIN_C_SOURCE: &str = "#include <stdio.h>\n\nint\nmain(void)\n{\n    printf(\"%d\\n\", fact(5));\n    ping(3);\n}\n\nint\nfact(int n)\n{\n    return n <= 1 ? 1 : n * fact(n - 1);\n}\nvoid ping(int n) { if (n) pong(n - 1); }\nvoid pong(int n) { if (n) ping(n - 1); }\n";

/// Write `index.xml` and the compound files into `xml_dir`
pub fn write_xml_fixtures(xml_dir: &Path) {
    fs::create_dir_all(xml_dir).expect("Failed to create xml dir");
    fs::write(xml_dir.join("index.xml"), INDEX_XML).expect("Failed to write index.xml");
    fs::write(xml_dir.join("main_8c.xml"), MAIN_C_XML).expect("Failed to write main_8c.xml");
    fs::write(xml_dir.join("structpoint.xml"), POINT_XML).expect("Failed to write point xml");
}

/// Workspace with `src/main.c` and generated XML under `.doxygen/xml`
pub fn documented_workspace() -> TempDir {
    let workspace = WorkspaceBuilder::new().with_file("src/main.c", MAIN_C_SOURCE).build();
    write_xml_fixtures(&workspace.path().join(".doxygen/xml"));
    workspace
}
