//! `symbols.json`: parsed Doxygen symbols cached next to the XML output.
//!
//! The cache is reused while no XML file is newer than it. It is purely an
//! accelerator; any problem reading it falls back to parsing the XML again.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::docs::xml::load_symbols;
use crate::models::DocSymbol;
use crate::utils::SourceScan;

pub const CACHE_FILE: &str = "symbols.json";

/// Bumped whenever the cached layout or parsing rules change
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SymbolCache {
    version: u32,
    symbols: Vec<DocSymbol>,
}

/// Cache location for an XML directory: `<output-dir>/symbols.json`
pub fn cache_path(xml_dir: &Path) -> PathBuf {
    xml_dir.parent().unwrap_or(xml_dir).join(CACHE_FILE)
}

/// Load symbols for `xml_dir`, through the cache unless `use_cache` is false
pub fn load_cached_symbols(xml_dir: &Path, use_cache: bool) -> Result<Vec<DocSymbol>> {
    if !use_cache {
        return load_symbols(xml_dir);
    }

    let path = cache_path(xml_dir);
    if is_fresh(&path, xml_dir)? {
        match read_cache(&path) {
            Ok(symbols) => {
                debug!("Using symbol cache {}", path.display());
                return Ok(symbols);
            }
            Err(e) => warn!("Rebuilding unreadable symbol cache {}: {:#}", path.display(), e),
        }
    }

    let symbols = load_symbols(xml_dir)?;
    if let Err(e) = write_cache(&path, &symbols) {
        warn!("Failed to write symbol cache {}: {:#}", path.display(), e);
    }
    Ok(symbols)
}

fn is_fresh(cache: &Path, xml_dir: &Path) -> Result<bool> {
    let cache_mtime = match fs::metadata(cache).and_then(|m| m.modified()) {
        Ok(mtime) => mtime,
        Err(_) => return Ok(false),
    };
    let scan = SourceScan::new(&["*.xml"], &[] as &[&str])?;
    Ok(!scan.any_newer_than(&[xml_dir.to_path_buf()], cache_mtime))
}

fn read_cache(path: &Path) -> Result<Vec<DocSymbol>> {
    let file = File::open(path).context("Failed to open symbol cache")?;
    let cache: SymbolCache =
        serde_json::from_reader(BufReader::new(file)).context("Failed to parse symbol cache")?;
    if cache.version != CACHE_VERSION {
        anyhow::bail!("cache version {} does not match {}", cache.version, CACHE_VERSION);
    }
    Ok(cache.symbols)
}

fn write_cache(path: &Path, symbols: &[DocSymbol]) -> Result<()> {
    let temp = path.with_extension("json.tmp");
    {
        let file = File::create(&temp).context("Failed to create symbol cache temp file")?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(
            &mut writer,
            &SymbolCache { version: CACHE_VERSION, symbols: symbols.to_vec() },
        )
        .context("Failed to serialize symbol cache")?;
        writer.flush().context("Failed to flush symbol cache")?;
    }
    fs::rename(&temp, path).context("Failed to move symbol cache into place")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    const INDEX: &str = r#"<doxygenindex>
  <compound refid="a_8c" kind="file"><name>a.c</name>
    <member refid="a_8c_1f" kind="function"><name>run</name></member>
  </compound>
</doxygenindex>"#;

    const A_C: &str = r#"<doxygen><compounddef id="a_8c" kind="file">
  <sectiondef kind="func">
    <memberdef kind="function" id="a_8c_1f"><type>void</type><name>run</name>
      <location file="a.c" line="1" bodystart="1" bodyend="3"/></memberdef>
  </sectiondef>
  <location file="a.c"/>
</compounddef></doxygen>"#;

    fn write_xml(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("index.xml"), INDEX).unwrap();
        fs::write(dir.join("a_8c.xml"), A_C).unwrap();
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options().write(true).open(path).unwrap().set_modified(time).unwrap();
    }

    #[test]
    fn test_cache_is_written_and_reused() {
        let temp = tempfile::TempDir::new().unwrap();
        let xml_dir = temp.path().join(".doxygen/xml");
        write_xml(&xml_dir);

        let symbols = load_cached_symbols(&xml_dir, true).unwrap();
        assert_eq!(symbols.len(), 2);
        let cache = cache_path(&xml_dir);
        assert_eq!(cache, temp.path().join(".doxygen/symbols.json"));
        assert!(cache.exists());

        // Served from the cache even with the XML gone
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&xml_dir.join("index.xml"), base);
        set_mtime(&xml_dir.join("a_8c.xml"), base);
        set_mtime(&cache, base + Duration::from_secs(10));
        fs::write(xml_dir.join("a_8c.xml"), "<broken").unwrap();
        set_mtime(&xml_dir.join("a_8c.xml"), base);

        let cached = load_cached_symbols(&xml_dir, true).unwrap();
        assert_eq!(cached, symbols);
    }

    #[test]
    fn test_newer_xml_invalidates_cache() {
        let temp = tempfile::TempDir::new().unwrap();
        let xml_dir = temp.path().join("xml");
        write_xml(&xml_dir);
        let cache = cache_path(&xml_dir);
        fs::write(&cache, r#"{"version": 1, "symbols": []}"#).unwrap();

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&cache, base);
        set_mtime(&xml_dir.join("index.xml"), base + Duration::from_secs(10));
        set_mtime(&xml_dir.join("a_8c.xml"), base);

        assert_eq!(load_cached_symbols(&xml_dir, true).unwrap().len(), 2);
    }

    #[test]
    fn test_wrong_version_or_garbage_is_rebuilt() {
        let temp = tempfile::TempDir::new().unwrap();
        let xml_dir = temp.path().join("xml");
        write_xml(&xml_dir);
        let cache = cache_path(&xml_dir);

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&xml_dir.join("index.xml"), base);
        set_mtime(&xml_dir.join("a_8c.xml"), base);

        for content in [r#"{"version": 99, "symbols": []}"#, "not json"] {
            fs::write(&cache, content).unwrap();
            set_mtime(&cache, base + Duration::from_secs(10));
            assert_eq!(load_cached_symbols(&xml_dir, true).unwrap().len(), 2);
        }
    }

    #[test]
    fn test_no_cache_skips_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let xml_dir = temp.path().join("xml");
        write_xml(&xml_dir);
        assert_eq!(load_cached_symbols(&xml_dir, false).unwrap().len(), 2);
        assert!(!cache_path(&xml_dir).exists());
    }
}
