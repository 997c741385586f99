//! Doxygen generation wrapper.
//!
//! # Error Handling Strategy
//!
//! - **Up to date** output is not an error: generation is skipped with a notice
//! - **Doxygen failures** (missing binary, non-zero exit, timeout) are recorded
//!   as `last_failure` in `doxygen-generator.json` with the command line and the
//!   first 2000 characters of stderr, then returned to the caller
//! - **macOS Gatekeeper** refusals are recognised and reported with the
//!   `xattr -cr` remedy for the bundled binaries
//! - **Missing Graphviz** only disables graphs, with a warning

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, warn};

use crate::docs::doxyfile::{DoxyfileSettings, Language, render_doxyfile};
use crate::docs::platform::{Platform, ToolPaths, ToolSource, Toolchain, ensure_executable};
use crate::docs::xml::count_index_members;
use crate::error::ToolError;
use crate::indexer::DEFAULT_EXCLUDES;
use crate::memory::{MemoryStore, note_failure};
use crate::models::{GenerationRecord, GeneratorMemory};
use crate::utils::{SourceScan, ToolCommand, absolutize, format_path_with_tilde};

pub const DEFAULT_OUTPUT_DIR: &str = ".doxygen";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

const TOOL_NAME: &str = "doxygen";
const MAX_RECORDED_STDERR: usize = 2000;

pub const KNOWN_ISSUES: &[(&str, &str)] = &[
    (
        "doxygen not found",
        "Install Doxygen (brew install doxygen, apt install doxygen), pass --doxygen-path, \
         or unpack a bundled copy under <bin-dir>/<platform>/doxygen-<version>/",
    ),
    (
        "quarantine",
        "macOS Gatekeeper is blocking the bundled binaries; run xattr -cr on the bin directory",
    ),
    ("timed out", "Narrow --input-dirs, add --exclude entries, disable graphs, or raise --timeout"),
    ("unsupported platform", "Pass --doxygen-path to a Doxygen installed for this system"),
];

const GATEKEEPER_INDICATORS: &[&str] = &[
    "cannot be opened because the developer cannot be verified",
    "not opened because it is from an unidentified developer",
    "quarantine",
];

/// Settings for [`generate_docs`]
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub project_name: Option<String>,
    /// Relative paths are taken relative to the workspace
    pub output_dir: PathBuf,
    /// Defaults to the workspace root when empty
    pub input_dirs: Vec<PathBuf>,
    pub language: Language,
    /// Space-separated globs overriding the language default
    pub file_patterns: Option<String>,
    pub exclude_dirs: Vec<String>,
    /// Use this Doxyfile instead of synthesizing one
    pub doxyfile: Option<PathBuf>,
    pub html: bool,
    pub xml: bool,
    pub graphs: bool,
    pub force: bool,
    pub clear_cache: bool,
    pub timeout: Duration,
    pub tools: ToolPaths,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            project_name: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            input_dirs: Vec::new(),
            language: Language::default(),
            file_patterns: None,
            exclude_dirs: Vec::new(),
            doxyfile: None,
            html: true,
            xml: true,
            graphs: true,
            force: false,
            clear_cache: false,
            timeout: DEFAULT_TIMEOUT,
            tools: ToolPaths::default(),
        }
    }
}

impl GenerateOptions {
    pub fn output_dir(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.output_dir)
    }

    pub fn file_patterns(&self) -> String {
        self.file_patterns.clone().unwrap_or_else(|| self.language.file_patterns().to_string())
    }

    fn input_dirs(&self, workspace: &Path) -> Result<Vec<PathBuf>> {
        if self.input_dirs.is_empty() {
            return Ok(vec![workspace.to_path_buf()]);
        }
        self.input_dirs.iter().map(|d| absolutize(d)).collect()
    }

    /// Exclude entries may themselves hold several space-separated names
    fn exclude_dirs(&self) -> Vec<String> {
        self.exclude_dirs.iter().flat_map(|e| e.split_whitespace()).map(str::to_string).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerateOutcome {
    UpToDate,
    Generated(GenerationRecord),
}

/// Run Doxygen over `workspace` unless its documentation is already current.
///
/// # Errors
///
/// Returns an error if the platform is unsupported, a custom Doxyfile is
/// missing, or Doxygen cannot be run, fails, or times out. Failures after the
/// memory file was loaded are recorded in it first.
pub fn generate_docs(workspace: &Path, options: &GenerateOptions) -> Result<GenerateOutcome> {
    let store = MemoryStore::generator(workspace);
    if options.clear_cache {
        store.clear()?;
    }
    let mut memory: GeneratorMemory = store.load();
    memory.seed_known_issues(KNOWN_ISSUES);

    let output_dir = options.output_dir(workspace);
    let input_dirs = options.input_dirs(workspace)?;

    if !options.force && !is_stale(&output_dir, &input_dirs, options, &memory)? {
        println!("Documentation is up-to-date. Use --force to regenerate.");
        return Ok(GenerateOutcome::UpToDate);
    }

    let mut run = GenerationRun::new(workspace, output_dir, input_dirs, options);
    match run.execute() {
        Ok(record) => {
            memory.record_success(record.clone());
            save_memory(&store, &memory);
            print_summary(&record);
            Ok(GenerateOutcome::Generated(record))
        }
        Err(error) => {
            let remedy = note_failure(&mut memory, workspace, &error, &run.command_line);
            if let Some(failure) = memory.last_failure.as_mut() {
                failure.error = truncate_chars(&failure.error, MAX_RECORDED_STDERR);
            }
            save_memory(&store, &memory);

            if run.on_macos() && is_gatekeeper_error(&format!("{:#}", error)) {
                eprintln!("macOS Gatekeeper is blocking the binary.");
                if let Some(dir) = run.bundle_dir() {
                    eprintln!("Run: xattr -cr {}", dir.display());
                }
            } else if let Some(remedy) = remedy {
                eprintln!("Suggested remedy: {}", remedy);
            }
            Err(error)
        }
    }
}

/// Whether documentation must be regenerated: no output yet, no recorded
/// success, or a source file changed after the last successful generation
pub fn is_stale(
    output_dir: &Path,
    input_dirs: &[PathBuf],
    options: &GenerateOptions,
    memory: &GeneratorMemory,
) -> Result<bool> {
    let html_index = output_dir.join("html").join("index.html");
    let xml_index = output_dir.join("xml").join("index.xml");
    if !html_index.exists() && !xml_index.exists() {
        debug!("No generated output in {}", output_dir.display());
        return Ok(true);
    }

    let Some(success) = &memory.last_success else {
        return Ok(true);
    };
    let generated_at = SystemTime::from(success.generated_at);

    let patterns: Vec<String> =
        options.file_patterns().split_whitespace().map(str::to_string).collect();
    let mut excluded = options.exclude_dirs();
    if let Some(name) = output_dir.file_name() {
        excluded.push(name.to_string_lossy().into_owned());
    }
    let scan = SourceScan::new(&patterns, &excluded)?;
    Ok(scan.any_newer_than(input_dirs, generated_at))
}

/// State of one Doxygen invocation, kept so failures can be recorded with
/// whatever was resolved before things went wrong
struct GenerationRun<'a> {
    workspace: &'a Path,
    output_dir: PathBuf,
    input_dirs: Vec<PathBuf>,
    options: &'a GenerateOptions,
    toolchain: Option<Toolchain>,
    command_line: String,
}

impl<'a> GenerationRun<'a> {
    fn new(
        workspace: &'a Path,
        output_dir: PathBuf,
        input_dirs: Vec<PathBuf>,
        options: &'a GenerateOptions,
    ) -> Self {
        Self {
            workspace,
            output_dir,
            input_dirs,
            options,
            toolchain: None,
            command_line: TOOL_NAME.to_string(),
        }
    }

    fn bundle_dir(&self) -> Option<&Path> {
        self.toolchain.as_ref()?.platform_dir.as_deref()
    }

    fn on_macos(&self) -> bool {
        self.toolchain.as_ref().is_some_and(|t| t.platform.is_macos())
    }

    fn execute(&mut self) -> Result<GenerationRecord> {
        let options = self.options;
        let platform = Platform::detect()?;
        let toolchain = Toolchain::resolve(platform, &options.tools);
        self.toolchain = Some(toolchain.clone());

        let doxygen = toolchain.doxygen.clone().ok_or_else(|| ToolError::NotFound {
            tool: TOOL_NAME.to_string(),
            path: PathBuf::from(TOOL_NAME),
        })?;
        if doxygen.source == ToolSource::Bundled {
            ensure_executable(&doxygen.path)?;
        }

        let graphs = options.graphs && toolchain.dot.is_some();
        if let Some(dot) = toolchain.dot.as_ref().filter(|_| graphs)
            && dot.source == ToolSource::Bundled
        {
            ensure_executable(&dot.path)?;
        }
        if options.graphs && !graphs {
            warn!("dot (Graphviz) not found; call and caller graphs are disabled");
        }

        let doxyfile = self.prepare_doxyfile(&toolchain, graphs)?;
        self.remove_old_output()?;

        let command = ToolCommand::new(TOOL_NAME, &doxygen.path, options.timeout)
            .arg(&doxyfile)
            .current_dir(self.workspace);
        let command = toolchain.child_env().into_iter().fold(command, |c, (k, v)| c.env(k, v));
        self.command_line = command.display();

        // Taken before the run so sources edited while Doxygen works count as newer
        let generated_at = Utc::now();
        let started = Instant::now();
        let output = command.run()?;
        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            };
            return Err(ToolError::Failed {
                tool: TOOL_NAME.to_string(),
                status,
                stderr: truncate_chars(output.stderr.trim(), MAX_RECORDED_STDERR),
            }
            .into());
        }
        let elapsed = started.elapsed();

        let warning_count = count_warnings(&output.stderr);
        if warning_count > 0 {
            debug!("Doxygen reported {} warnings", warning_count);
        }

        let html = options.html && self.output_dir.join("html").join("index.html").exists();
        let xml = options.xml && self.output_dir.join("xml").join("index.xml").exists();
        if options.html && !html {
            warn!("HTML output not found (html/index.html)");
        }
        if options.xml && !xml {
            warn!("XML output not found (xml/index.xml)");
        }
        let symbol_count = if xml {
            count_index_members(&self.output_dir.join("xml")).unwrap_or_else(|e| {
                warn!("Failed to count documented symbols: {:#}", e);
                0
            })
        } else {
            0
        };

        Ok(GenerationRecord {
            generated_at,
            elapsed_secs: elapsed.as_secs_f64(),
            warning_count,
            symbol_count,
            platform: platform.tag().to_string(),
            output_dir: self.output_dir.clone(),
            project_name: self.project_name(),
            language: options.language.as_str().to_string(),
            html,
            xml,
            graphs,
        })
    }

    fn project_name(&self) -> String {
        self.options.project_name.clone().unwrap_or_else(|| {
            self.workspace
                .file_name()
                .map_or_else(|| "project".to_string(), |n| n.to_string_lossy().into_owned())
        })
    }

    fn prepare_doxyfile(&self, toolchain: &Toolchain, graphs: bool) -> Result<PathBuf> {
        if let Some(custom) = &self.options.doxyfile {
            let custom = absolutize(custom)?;
            if !custom.is_file() {
                anyhow::bail!("Custom Doxyfile not found: {}", custom.display());
            }
            return Ok(custom);
        }

        let settings = DoxyfileSettings {
            project_name: self.project_name(),
            workspace: self.workspace.to_path_buf(),
            input_dirs: self.input_dirs.clone(),
            output_dir: self.output_dir.clone(),
            file_patterns: self.options.file_patterns(),
            exclude_dirs: self.options.exclude_dirs(),
            language: self.options.language,
            html: self.options.html,
            xml: self.options.xml,
            dot_dir: if graphs { toolchain.dot_dir() } else { None },
        };

        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", self.output_dir.display())
        })?;
        let path = self.output_dir.join("Doxyfile");
        fs::write(&path, render_doxyfile(&settings))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Doxyfile written to {}", path.display());
        Ok(path)
    }

    /// Stale pages from an earlier run must not survive into the new output
    fn remove_old_output(&self) -> Result<()> {
        for subdir in ["html", "xml"] {
            let dir = self.output_dir.join(subdir);
            if dir.is_dir() {
                debug!("Removing old output {}", dir.display());
                fs::remove_dir_all(&dir)
                    .with_context(|| format!("Failed to remove {}", dir.display()))?;
            }
        }
        Ok(())
    }
}

/// Lines of Doxygen stderr that are warnings
pub fn count_warnings(stderr: &str) -> usize {
    stderr.lines().filter(|line| line.to_lowercase().contains("warning:")).count()
}

pub fn is_gatekeeper_error(text: &str) -> bool {
    let text = text.to_lowercase();
    GATEKEEPER_INDICATORS.iter().any(|indicator| text.contains(indicator))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

fn print_summary(record: &GenerationRecord) {
    println!("Documentation generated successfully.");
    println!("  Project:  {}", record.project_name);
    println!("  Language: {}", record.language);
    let shown = |rel: &str| format_path_with_tilde(&record.output_dir.join(rel));
    if record.html {
        println!("  HTML:     {}", shown("html/index.html"));
    }
    if record.xml {
        println!("  XML:      {}", shown("xml/index.xml"));
        println!("  Symbols:  {}", record.symbol_count);
    }
    println!("  Graphs:   {}", if record.graphs { "enabled" } else { "disabled" });
    println!("  Warnings: {}", record.warning_count);
    println!("  Time:     {:.1}s", record.elapsed_secs);
}

fn save_memory(store: &MemoryStore, memory: &GeneratorMemory) {
    if let Err(e) = store.save(memory) {
        warn!("Failed to update {}: {:#}", store.path().display(), e);
    }
}
