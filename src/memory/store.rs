//! Memory file persistence: tolerant load, atomic save

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::utils::validate_file_size;

/// Directory, relative to the workspace, holding every tool's memory file
pub const CACHE_DIR: &str = ".claude/skill-cache";

/// Memory file of the indexer and searcher
pub const INDEXER_MEMORY_FILE: &str = "code-indexer.json";

/// Memory file of the documentation generator
pub const GENERATOR_MEMORY_FILE: &str = "doxygen-generator.json";

/// Handle on one JSON memory file inside a workspace
#[derive(Debug, Clone)]
pub struct MemoryStore {
    path: PathBuf,
}

impl MemoryStore {
    pub fn new(workspace: &Path, file_name: &str) -> Self {
        Self { path: workspace.join(CACHE_DIR).join(file_name) }
    }

    pub fn indexer(workspace: &Path) -> Self {
        Self::new(workspace, INDEXER_MEMORY_FILE)
    }

    pub fn generator(workspace: &Path) -> Self {
        Self::new(workspace, GENERATOR_MEMORY_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, or a default one when the file is missing.
    ///
    /// A file that cannot be read or parsed is treated as empty (it will be
    /// overwritten by the next save) rather than failing the tool run.
    pub fn load<T: DeserializeOwned + Default>(&self) -> T {
        if !self.path.exists() {
            return T::default();
        }
        match self.read() {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring unreadable memory file {}: {:#}", self.path.display(), e);
                T::default()
            }
        }
    }

    fn read<T: DeserializeOwned>(&self) -> Result<T> {
        let mut file = File::open(&self.path)
            .with_context(|| format!("Failed to open memory file: {}", self.path.display()))?;
        validate_file_size(&file, &self.path)?;

        let mut json = String::new();
        file.read_to_string(&mut json).context("Failed to read memory file")?;
        serde_json::from_str(&json).context("Failed to parse memory JSON")
    }

    /// Write the record atomically (temp file + rename)
    pub fn save<T: Serialize>(&self, record: &T) -> Result<()> {
        let dir = self.path.parent().context("Memory file has no parent directory")?;
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;

        let json = serde_json::to_string_pretty(record).context("Failed to serialize memory")?;
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, json).context("Failed to write memory temp file")?;
        fs::rename(&temp, &self.path).context("Failed to rename memory temp file")?;
        Ok(())
    }

    /// Load, apply `update`, save
    pub fn update<T, F>(&self, update: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T),
    {
        let mut record: T = self.load();
        update(&mut record);
        self.save(&record)?;
        Ok(record)
    }

    /// Reset the memory file to an empty record
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::write(&self.path, "{}\n").context("Failed to clear memory file")?;
        }
        Ok(())
    }
}
