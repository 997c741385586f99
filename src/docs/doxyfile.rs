//! Doxyfile synthesis.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// Source language, which picks the default file patterns and output tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Language {
    #[default]
    C,
    #[value(name = "c++")]
    Cpp,
    Java,
    Python,
    Auto,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "c++",
            Language::Java => "java",
            Language::Python => "python",
            Language::Auto => "auto",
        }
    }

    /// Space-separated glob patterns for this language's source files
    pub fn file_patterns(&self) -> &'static str {
        match self {
            Language::C => "*.c *.h",
            Language::Cpp => "*.cpp *.cc *.cxx *.hpp *.hh *.hxx *.h *.c",
            Language::Java => "*.java",
            Language::Python => "*.py",
            Language::Auto => {
                "*.c *.h *.cpp *.cc *.cxx *.hpp *.hh *.hxx *.java *.py *.cs *.m *.mm *.go"
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for [`render_doxyfile`]
#[derive(Debug, Clone)]
pub struct DoxyfileSettings {
    pub project_name: String,
    pub workspace: PathBuf,
    pub input_dirs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub file_patterns: String,
    pub exclude_dirs: Vec<String>,
    pub language: Language,
    pub html: bool,
    pub xml: bool,
    /// Directory holding `dot`; call and caller graphs are only enabled with one
    pub dot_dir: Option<PathBuf>,
}

/// Render a complete Doxyfile.
///
/// Paths in the generated XML are made workspace-relative (`STRIP_FROM_PATH`)
/// so query results and `--scope` prefixes read the same on every machine.
/// The output directory itself is always excluded from the input.
pub fn render_doxyfile(settings: &DoxyfileSettings) -> String {
    let graphs = settings.dot_dir.is_some();

    let mut exclude_patterns: Vec<String> =
        settings.exclude_dirs.iter().map(|d| format!("*/{}/*", d)).collect();
    if let Some(name) = settings.output_dir.file_name() {
        let pattern = format!("*/{}/*", name.to_string_lossy());
        if !exclude_patterns.contains(&pattern) {
            exclude_patterns.push(pattern);
        }
    }

    let mut entries: Vec<(&str, String)> = vec![
        ("PROJECT_NAME", quote(&settings.project_name)),
        ("OUTPUT_DIRECTORY", quote_path(&settings.output_dir)),
        ("STRIP_FROM_PATH", quote_path(&settings.workspace)),
        ("INPUT", settings.input_dirs.iter().map(|d| quote_path(d)).collect::<Vec<_>>().join(" ")),
        ("FILE_PATTERNS", settings.file_patterns.clone()),
        ("RECURSIVE", yes_no(true)),
        ("EXCLUDE_PATTERNS", exclude_patterns.join(" ")),
        ("EXTRACT_ALL", yes_no(true)),
        ("EXTRACT_PRIVATE", yes_no(true)),
        ("EXTRACT_STATIC", yes_no(true)),
        ("EXTRACT_LOCAL_CLASSES", yes_no(true)),
        ("SOURCE_BROWSER", yes_no(true)),
        ("REFERENCED_BY_RELATION", yes_no(true)),
        ("REFERENCES_RELATION", yes_no(true)),
        ("GENERATE_HTML", yes_no(settings.html)),
        ("GENERATE_XML", yes_no(settings.xml)),
        ("XML_PROGRAMLISTING", yes_no(false)),
        ("GENERATE_LATEX", yes_no(false)),
        ("HAVE_DOT", yes_no(graphs)),
        ("CALL_GRAPH", yes_no(graphs)),
        ("CALLER_GRAPH", yes_no(graphs)),
        ("QUIET", yes_no(true)),
        ("WARNINGS", yes_no(true)),
        ("WARN_IF_UNDOCUMENTED", yes_no(false)),
    ];
    if let Some(dot_dir) = &settings.dot_dir {
        entries.push(("DOT_PATH", quote_path(dot_dir)));
    }
    match settings.language {
        Language::C => entries.push(("OPTIMIZE_OUTPUT_FOR_C", yes_no(true))),
        Language::Java | Language::Python => {
            entries.push(("OPTIMIZE_OUTPUT_JAVA", yes_no(true)))
        }
        Language::Cpp | Language::Auto => {}
    }

    let mut out = String::from("# Doxyfile generated by code-skills\n\n");
    for (key, value) in entries {
        out.push_str(&format!("{:<23}= {}\n", key, value));
    }
    out
}

fn yes_no(value: bool) -> String {
    if value { "YES" } else { "NO" }.to_string()
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}
