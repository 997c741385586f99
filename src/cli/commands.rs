use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};

use crate::docs::{
    DEFAULT_DEPTH, DEFAULT_OUTPUT_DIR, Direction, DocQuery, GenerateOptions, Language, ListFilter,
    OutputFormat, Page, Platform, QueryOptions, ToolPaths, Toolchain, generate_docs,
};
use crate::hook::{self, DEFAULT_HOOK_TYPE, InstallOutcome, RemoveOutcome};
use crate::indexer::{
    CtagsOptions, DEFAULT_EXCLUDES, DEFAULT_KINDS, IndexOptions, build_index, clear_memory,
};
use crate::models::Symbol;
use crate::search::{
    SearchOptions, SearchQuery, SearchTarget, ensure_report, format_json, format_text, search,
};
use crate::utils::{current_exe, format_path_with_tilde, logging, resolve_workspace};

#[derive(Parser)]
#[command(name = "code-skills")]
#[command(version)]
#[command(
    about = "Index, search and document C codebases with ctags and Doxygen",
    long_about = None
)]
pub struct Cli {
    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the markdown symbol report (indexing.md) with Universal Ctags
    Index(IndexArgs),
    /// Search the symbol report, regenerating it first when sources changed
    Search(SearchArgs),
    /// Generate and query Doxygen documentation
    Docs {
        #[command(subcommand)]
        command: DocsCommand,
    },
    /// Manage the git hook that regenerates documentation on push
    Hook(HookArgs),
}

#[derive(Args)]
pub struct CtagsArgs {
    /// ctags executable (default: a remembered suggestion, then `ctags` on PATH)
    #[arg(long, env = "CODE_SKILLS_CTAGS")]
    pub ctags_path: Option<PathBuf>,

    /// Comma-separated directory names to skip (replaces the default list)
    #[arg(long, value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// ctags timeout in seconds
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,
}

impl CtagsArgs {
    fn exclude_dirs(&self) -> Vec<String> {
        match &self.exclude {
            Some(dirs) => {
                dirs.iter().map(|d| d.trim().to_string()).filter(|d| !d.is_empty()).collect()
            }
            None => DEFAULT_EXCLUDES.iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[derive(Args)]
pub struct IndexArgs {
    /// Root directory to scan
    pub workspace: PathBuf,

    /// Report file (default: <workspace>/indexing.md)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub ctags: CtagsArgs,

    /// Skip .h files
    #[arg(long)]
    pub no_headers: bool,

    /// ctags C kind letters to include
    #[arg(long, default_value = DEFAULT_KINDS)]
    pub kinds: String,

    /// Omit the generated/count lines from the report header
    #[arg(long)]
    pub no_stats: bool,

    /// Exclude struct/union members and enumerators
    #[arg(long)]
    pub no_members: bool,

    /// Extra arguments passed to ctags, whitespace separated
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub ctags_args: String,

    /// Clear the memory of past runs and exit
    #[arg(long)]
    pub clear_memory: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Path to indexing.md or to the workspace directory
    pub target: PathBuf,

    /// Symbol name to search for (required unless --index-only)
    pub name: Option<String>,

    /// Comma-separated kinds to keep (function, struct, macro, ...)
    #[arg(long = "type")]
    pub kind: Option<String>,

    /// Exact, case-sensitive name match
    #[arg(long)]
    pub exact_match: bool,

    /// Show every match, not just the first per kind and file
    #[arg(long)]
    pub show_all: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Regenerate the report even if it is up to date
    #[arg(long)]
    pub force_index: bool,

    /// Regenerate the report without searching
    #[arg(long)]
    pub index_only: bool,

    /// Report path when the target is a workspace
    #[arg(long)]
    pub indexing: Option<PathBuf>,

    #[command(flatten)]
    pub ctags: CtagsArgs,
}

#[derive(Args, Clone)]
pub struct ToolArgs {
    /// Doxygen executable
    #[arg(long, env = "CODE_SKILLS_DOXYGEN")]
    pub doxygen_path: Option<PathBuf>,

    /// Graphviz dot executable
    #[arg(long, env = "CODE_SKILLS_DOT")]
    pub dot_path: Option<PathBuf>,

    /// Directory holding bundled tools per platform (default: <exe dir>/bin)
    #[arg(long, env = "CODE_SKILLS_BIN_DIR")]
    pub bin_dir: Option<PathBuf>,
}

impl From<&ToolArgs> for ToolPaths {
    fn from(args: &ToolArgs) -> Self {
        ToolPaths {
            doxygen: args.doxygen_path.clone(),
            dot: args.dot_path.clone(),
            bin_dir: args.bin_dir.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum DocsCommand {
    /// Run Doxygen over the workspace unless its documentation is current
    Generate(GenerateArgs),
    /// Answer questions from the generated XML
    Query(QueryArgs),
    /// Show the detected platform and which Doxygen and dot would be used
    Platform(ToolArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    pub workspace: PathBuf,

    /// Project name (default: workspace directory name)
    #[arg(long)]
    pub project_name: Option<String>,

    /// Output directory relative to the workspace
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Directories to scan (default: the workspace)
    #[arg(long, num_args = 1..)]
    pub input_dirs: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = Language::C)]
    pub language: Language,

    /// Space-separated file patterns, overriding the language default
    #[arg(long)]
    pub file_patterns: Option<String>,

    /// Directory names to exclude
    #[arg(long, num_args = 1..)]
    pub exclude: Vec<String>,

    /// Use this Doxyfile instead of generating one
    #[arg(long)]
    pub doxyfile: Option<PathBuf>,

    #[arg(long)]
    pub no_html: bool,

    #[arg(long)]
    pub no_xml: bool,

    /// Disable call and caller graphs
    #[arg(long)]
    pub no_graphs: bool,

    /// Regenerate even if the output is up to date
    #[arg(long)]
    pub force: bool,

    /// Clear the remembered state before generating
    #[arg(long)]
    pub clear_cache: bool,

    /// Doxygen timeout in seconds
    #[arg(long, default_value_t = 600)]
    pub timeout: u64,

    #[command(flatten)]
    pub tools: ToolArgs,
}

impl GenerateArgs {
    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            project_name: self.project_name.clone(),
            output_dir: self.output_dir.clone(),
            input_dirs: self.input_dirs.clone(),
            language: self.language,
            file_patterns: self.file_patterns.clone(),
            exclude_dirs: self.exclude.clone(),
            doxyfile: self.doxyfile.clone(),
            html: !self.no_html,
            xml: !self.no_xml,
            graphs: !self.no_graphs,
            force: self.force,
            clear_cache: self.clear_cache,
            timeout: Duration::from_secs(self.timeout),
            tools: ToolPaths::from(&self.tools),
        }
    }
}

#[derive(Args)]
pub struct QueryArgs {
    pub workspace: PathBuf,

    /// Doxygen output directory relative to the workspace
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, global = true)]
    pub output_dir: PathBuf,

    /// XML directory (default: <output-dir>/xml)
    #[arg(long, global = true)]
    pub xml_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Only report symbols in files under this path prefix
    #[arg(long, default_value = "", global = true)]
    pub scope: String,

    /// Parse the XML directly instead of using symbols.json
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: QueryCommand,
}

#[derive(Args, Clone, Copy)]
pub struct PageArgs {
    /// Skip this many results
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Show at most this many results
    #[arg(long)]
    pub limit: Option<usize>,
}

impl From<PageArgs> for Page {
    fn from(args: PageArgs) -> Self {
        Page { offset: args.offset, limit: args.limit }
    }
}

#[derive(Subcommand)]
pub enum QueryCommand {
    /// Everything known about a symbol
    Symbol { name: String },
    /// Functions a function calls and/or is called by
    Callgraph {
        func: String,
        #[arg(long, default_value_t = DEFAULT_DEPTH)]
        depth: usize,
        #[arg(long, value_enum, default_value_t = Direction::Both)]
        direction: Direction,
    },
    /// Source text of a function
    Body { func: String },
    /// All documented members, sorted by file and line
    List {
        /// Doxygen kind (function, variable, define, ...)
        #[arg(long)]
        kind: Option<String>,
        /// Substring of the file path
        #[arg(long)]
        file: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Members whose name matches a substring, glob or regex
    Search {
        pattern: String,
        /// Treat the pattern as a regular expression
        #[arg(long)]
        regex: bool,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Args)]
pub struct HookArgs {
    pub workspace: PathBuf,

    #[command(subcommand)]
    pub action: HookAction,

    /// Git hook to manage
    #[arg(long, default_value = DEFAULT_HOOK_TYPE, global = true)]
    pub hook_type: String,
}

#[derive(Subcommand)]
pub enum HookAction {
    /// Add the regeneration block to the hook
    Install {
        /// Binary the hook should call (default: this executable)
        #[arg(long)]
        exe: Option<PathBuf>,
    },
    /// Remove the regeneration block, restoring the hook
    Remove,
    /// Report whether the block is installed
    Status,
    /// Regenerate documentation now, as the hook would
    Run(ToolArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match &cli.command {
        Some(Commands::Index(args)) => run_index(args),
        Some(Commands::Search(args)) => run_search(args),
        Some(Commands::Docs { command }) => run_docs(command),
        Some(Commands::Hook(args)) => run_hook(args),
        None => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn run_index(args: &IndexArgs) -> Result<()> {
    let workspace = resolve_workspace(&args.workspace)?;
    if args.clear_memory {
        return clear_memory(&workspace);
    }

    let options = IndexOptions {
        ctags_path: args.ctags.ctags_path.clone(),
        output: args.output.clone(),
        ctags: CtagsOptions {
            kinds: args.kinds.clone(),
            exclude_dirs: args.ctags.exclude_dirs(),
            include_headers: !args.no_headers,
            extra_args: args.ctags_args.split_whitespace().map(str::to_string).collect(),
            timeout: Duration::from_secs(args.ctags.timeout),
        },
        include_members: !args.no_members,
        show_stats: !args.no_stats,
    };
    build_index(&workspace, &options)?;
    Ok(())
}

fn run_search(args: &SearchArgs) -> Result<()> {
    let target = SearchTarget::resolve(&args.target, args.indexing.as_deref())?;
    let mut options = SearchOptions {
        index: IndexOptions {
            ctags_path: args.ctags.ctags_path.clone(),
            ctags: CtagsOptions {
                exclude_dirs: args.ctags.exclude_dirs(),
                timeout: Duration::from_secs(args.ctags.timeout),
                ..Default::default()
            },
            ..Default::default()
        },
        force_index: args.force_index,
    };

    if args.index_only {
        options.force_index = true;
        ensure_report(&target, &options)?;
        return Ok(());
    }

    let Some(name) = args.name.as_deref() else {
        bail!("A symbol name is required unless --index-only is given");
    };
    let query = SearchQuery::new(name, args.kind.as_deref(), args.exact_match);
    let outcome = search(&target, &query, &options)?;

    let results: Vec<&Symbol> = outcome.results.iter().collect();
    match args.format {
        OutputFormat::Json => println!("{}", format_json(&results)?),
        OutputFormat::Text => println!("{}", format_text(&results, args.show_all)),
    }
    Ok(())
}

fn run_docs(command: &DocsCommand) -> Result<()> {
    match command {
        DocsCommand::Generate(args) => {
            let workspace = resolve_workspace(&args.workspace)?;
            generate_docs(&workspace, &args.options())?;
            Ok(())
        }
        DocsCommand::Query(args) => run_query(args),
        DocsCommand::Platform(tools) => {
            let toolchain = Toolchain::resolve(Platform::detect()?, &ToolPaths::from(tools));
            println!("{}", toolchain.diagnostics());
            Ok(())
        }
    }
}

fn run_query(args: &QueryArgs) -> Result<()> {
    let workspace = resolve_workspace(&args.workspace)?;
    let options = QueryOptions {
        output_dir: args.output_dir.clone(),
        xml_dir: args.xml_dir.clone(),
        use_cache: !args.no_cache,
        scope: args.scope.clone(),
        format: args.format,
    };
    let query = DocQuery::open(&workspace, &options)?;

    let output = match &args.command {
        QueryCommand::Symbol { name } => query.symbol(name)?,
        QueryCommand::Callgraph { func, depth, direction } => {
            query.callgraph(func, *depth, *direction)?
        }
        QueryCommand::Body { func } => query.body(func)?,
        QueryCommand::List { kind, file, page } => query.list(&ListFilter {
            kind: kind.clone(),
            file: file.clone(),
            page: Page::from(*page),
        })?,
        QueryCommand::Search { pattern, regex, page } => {
            query.search(pattern, *regex, Page::from(*page))?
        }
    };
    println!("{}", output);
    Ok(())
}

fn run_hook(args: &HookArgs) -> Result<()> {
    let workspace = resolve_workspace(&args.workspace)?;
    let hook_path = hook::hook_path(&workspace, &args.hook_type)?;
    let shown = format_path_with_tilde(&hook_path);

    match &args.action {
        HookAction::Install { exe } => {
            let exe = match exe {
                Some(exe) => exe.clone(),
                None => current_exe()?,
            };
            match hook::install(&hook_path, &hook::hook_block(&exe, &workspace))? {
                InstallOutcome::Installed => println!("Hook installed: {}", shown),
                InstallOutcome::AlreadyInstalled => {
                    println!("Hook already installed in {}", shown);
                }
            }
        }
        HookAction::Remove => match hook::remove(&hook_path)? {
            RemoveOutcome::Removed => println!("Hook removed from: {}", shown),
            RemoveOutcome::FileDeleted => {
                println!("Hook removed from: {} (file deleted, nothing else was left)", shown);
            }
            RemoveOutcome::NotInstalled => println!("Hook marker not found. Nothing to remove."),
            RemoveOutcome::NoHookFile => println!("Hook file does not exist: {}", shown),
        },
        HookAction::Status => print_hook_status(&hook_path),
        HookAction::Run(tools) => {
            let options = GenerateOptions {
                force: true,
                tools: ToolPaths::from(tools),
                ..Default::default()
            };
            generate_docs(&workspace, &options)?;
        }
    }
    Ok(())
}

fn print_hook_status(hook_path: &Path) {
    let shown = format_path_with_tilde(hook_path);
    if !hook_path.exists() {
        println!("Hook file does not exist: {}", shown);
        println!("Status: NOT installed");
        return;
    }
    println!("Hook file: {}", shown);
    if hook::is_installed(hook_path) {
        println!("Status: INSTALLED");
    } else {
        println!("Status: NOT installed");
    }
}
