//! Platform detection and Doxygen/Graphviz binary resolution.
//!
//! Bundled binaries use the same layout on every platform:
//!
//! ```text
//! <bin-dir>/<platform>/doxygen-<ver>/bin/doxygen[.exe]
//! <bin-dir>/<platform>/graphviz-<ver>/bin/dot[.exe]
//! <bin-dir>/<platform>/graphviz-<ver>/lib/            shared libraries (Windows: bin/)
//! <bin-dir>/<platform>/graphviz-<ver>/lib/graphviz/   plugins (Windows: bin/)
//! ```

use std::cmp::Ordering;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::debug;

use crate::utils::{current_exe, find_executable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Win64,
    LinuxX64,
    MacosArm64,
    MacosX64,
}

impl Platform {
    /// Platform this binary is running on
    pub fn detect() -> Result<Self> {
        Self::from_parts(env::consts::OS, env::consts::ARCH)
    }

    pub fn from_parts(os: &str, arch: &str) -> Result<Self> {
        match (os, arch) {
            ("windows", _) => Ok(Platform::Win64),
            ("linux", _) => Ok(Platform::LinuxX64),
            ("macos", "aarch64") => Ok(Platform::MacosArm64),
            ("macos", _) => Ok(Platform::MacosX64),
            _ => bail!("Unsupported platform: {}/{}", os, arch),
        }
    }

    /// Name of the per-platform directory under the bundled bin dir
    pub fn tag(&self) -> &'static str {
        match self {
            Platform::Win64 => "win64",
            Platform::LinuxX64 => "linux-x64",
            Platform::MacosArm64 => "macos-arm64",
            Platform::MacosX64 => "macos-x64",
        }
    }

    pub fn is_macos(&self) -> bool {
        matches!(self, Platform::MacosArm64 | Platform::MacosX64)
    }

    fn exe_name(&self, name: &str) -> String {
        match self {
            Platform::Win64 => format!("{}.exe", name),
            _ => name.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Where a resolved binary came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    Explicit,
    Bundled,
    SystemPath,
}

impl fmt::Display for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToolSource::Explicit => "explicit",
            ToolSource::Bundled => "bundled",
            ToolSource::SystemPath => "PATH",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub path: PathBuf,
    pub source: ToolSource,
}

/// User-supplied locations (flags or `CODE_SKILLS_*` environment variables)
#[derive(Debug, Clone, Default)]
pub struct ToolPaths {
    pub doxygen: Option<PathBuf>,
    pub dot: Option<PathBuf>,
    pub bin_dir: Option<PathBuf>,
}

/// Resolved Doxygen and Graphviz binaries for one platform
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub platform: Platform,
    /// `<bin-dir>/<platform>`, whether or not it exists
    pub platform_dir: Option<PathBuf>,
    pub doxygen_dir: Option<PathBuf>,
    pub graphviz_dir: Option<PathBuf>,
    /// `None` when no Doxygen could be found anywhere
    pub doxygen: Option<ResolvedTool>,
    pub dot: Option<ResolvedTool>,
}

impl Toolchain {
    /// Resolve each binary: explicit path, then bundled copy, then `PATH`
    pub fn resolve(platform: Platform, paths: &ToolPaths) -> Self {
        let platform_dir =
            paths.bin_dir.clone().or_else(default_bin_dir).map(|d| d.join(platform.tag()));
        let doxygen_dir = platform_dir.as_deref().and_then(|d| find_versioned_dir(d, "doxygen-"));
        let graphviz_dir = platform_dir.as_deref().and_then(|d| find_versioned_dir(d, "graphviz-"));

        let doxygen = resolve_tool(
            paths.doxygen.as_deref(),
            doxygen_dir.as_ref().map(|d| d.join("bin").join(platform.exe_name("doxygen"))),
            "doxygen",
        );
        let dot = resolve_tool(
            paths.dot.as_deref(),
            graphviz_dir.as_ref().map(|d| d.join("bin").join(platform.exe_name("dot"))),
            "dot",
        );
        debug!(?doxygen, ?dot, "resolved documentation toolchain for {}", platform);

        Self { platform, platform_dir, doxygen_dir, graphviz_dir, doxygen, dot }
    }

    /// Directory holding Graphviz shared libraries
    pub fn lib_dir(&self) -> Option<PathBuf> {
        let dir = self.graphviz_dir.as_ref()?;
        Some(match self.platform {
            Platform::Win64 => dir.join("bin"),
            _ => dir.join("lib"),
        })
    }

    /// Directory holding Graphviz plugins and their config file
    pub fn plugin_dir(&self) -> Option<PathBuf> {
        let dir = self.graphviz_dir.as_ref()?;
        Some(match self.platform {
            Platform::Win64 => dir.join("bin"),
            _ => dir.join("lib").join("graphviz"),
        })
    }

    /// Extra environment for Doxygen so a bundled `dot` finds its libraries
    /// and plugins. Empty unless the bundled Graphviz is in use.
    pub fn child_env(&self) -> Vec<(OsString, OsString)> {
        let bundled_dot =
            matches!(&self.dot, Some(ResolvedTool { source: ToolSource::Bundled, .. }));
        let (Some(lib_dir), Some(plugin_dir)) = (self.lib_dir(), self.plugin_dir()) else {
            return Vec::new();
        };
        if !bundled_dot {
            return Vec::new();
        }

        let (var, separator, dirs) = match self.platform {
            Platform::LinuxX64 => ("LD_LIBRARY_PATH", ":", vec![lib_dir, plugin_dir.clone()]),
            Platform::MacosArm64 | Platform::MacosX64 => {
                ("DYLD_LIBRARY_PATH", ":", vec![lib_dir, plugin_dir.clone()])
            }
            Platform::Win64 => ("PATH", ";", vec![lib_dir]),
        };

        let mut parts: Vec<OsString> = dirs.into_iter().map(PathBuf::into_os_string).collect();
        if let Some(existing) = env::var_os(var).filter(|v| !v.is_empty()) {
            parts.push(existing);
        }
        let mut value = OsString::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                value.push(separator);
            }
            value.push(part);
        }

        vec![(var.into(), value), ("GVBINDIR".into(), plugin_dir.into_os_string())]
    }

    /// Directory containing `dot`, for the Doxyfile's `DOT_PATH`
    pub fn dot_dir(&self) -> Option<PathBuf> {
        self.dot.as_ref().and_then(|d| d.path.parent().map(Path::to_path_buf))
    }

    /// Human-readable resolution summary
    pub fn diagnostics(&self) -> String {
        fn show(path: &Option<PathBuf>) -> String {
            path.as_ref().map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
        }
        fn show_tool(tool: &Option<ResolvedTool>) -> String {
            match tool {
                Some(t) => format!("{} ({})", t.path.display(), t.source),
                None => "(not found)".to_string(),
            }
        }
        fn exists(tool: &Option<ResolvedTool>) -> bool {
            tool.as_ref().is_some_and(|t| t.path.is_file())
        }

        [
            format!("Platform:        {}", self.platform),
            format!("Bundle dir:      {}", show(&self.platform_dir)),
            format!("Doxygen dir:     {}", show(&self.doxygen_dir)),
            format!("Doxygen path:    {}", show_tool(&self.doxygen)),
            format!("Doxygen exists:  {}", exists(&self.doxygen)),
            format!("Graphviz dir:    {}", show(&self.graphviz_dir)),
            format!("Dot path:        {}", show_tool(&self.dot)),
            format!("Dot exists:      {}", exists(&self.dot)),
            format!("Dot dir:         {}", show(&self.dot_dir())),
            format!("Lib dir:         {}", show(&self.lib_dir())),
            format!("Plugin dir:      {}", show(&self.plugin_dir())),
        ]
        .join("\n")
    }
}

/// `bin/` next to the running executable
fn default_bin_dir() -> Option<PathBuf> {
    let exe = current_exe().ok()?;
    let dir = exe.parent()?.join("bin");
    dir.is_dir().then_some(dir)
}

fn resolve_tool(
    explicit: Option<&Path>,
    bundled: Option<PathBuf>,
    name: &str,
) -> Option<ResolvedTool> {
    if let Some(path) = explicit {
        let path = find_executable(path).unwrap_or_else(|| path.to_path_buf());
        return Some(ResolvedTool { path, source: ToolSource::Explicit });
    }
    if let Some(path) = bundled.filter(|p| p.is_file()) {
        return Some(ResolvedTool { path, source: ToolSource::Bundled });
    }
    find_executable(Path::new(name))
        .map(|path| ResolvedTool { path, source: ToolSource::SystemPath })
}

/// Newest `<prefix><version>` directory under `base`, comparing versions numerically
pub fn find_versioned_dir(base: &Path, prefix: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(base).ok()?;
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            let version = name.strip_prefix(prefix)?.to_string();
            Some((version, e.path()))
        })
        .max_by(|(a, _), (b, _)| compare_versions(a, b))
        .map(|(_, path)| path)
}

/// Compare dotted versions component-wise, numerically where both sides are numbers
fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-', '_']);
    let mut right = b.split(['.', '-', '_']);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Add execute permission to a bundled binary; unpacked archives often lose it
#[cfg(unix)]
pub fn ensure_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    use anyhow::Context;

    if !path.is_file() {
        return Ok(());
    }
    let mut permissions = fs::metadata(path)
        .with_context(|| format!("Failed to read permissions of {}", path.display()))?
        .permissions();
    let mode = permissions.mode();
    if mode & 0o111 != 0o111 {
        permissions.set_mode(mode | 0o111);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn ensure_executable(_path: &Path) -> Result<()> {
    Ok(())
}
