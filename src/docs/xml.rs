//! Doxygen XML reading.
//!
//! `index.xml` lists every compound (file, struct, namespace, ...) and the
//! members it contains; each compound's own `<refid>.xml` holds the full
//! `<memberdef>` records with locations, signatures and cross references.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;
use roxmltree::{Document, Node};
use tracing::{debug, warn};

use crate::models::DocSymbol;

pub const INDEX_FILE: &str = "index.xml";

/// One `<compound>` entry of `index.xml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundEntry {
    pub refid: String,
    pub kind: String,
    pub name: String,
    pub member_count: usize,
}

/// Read the compound list from `index.xml`
pub fn read_index(xml_dir: &Path) -> Result<Vec<CompoundEntry>> {
    let index_path = xml_dir.join(INDEX_FILE);
    if !index_path.is_file() {
        anyhow::bail!("index.xml not found at: {}", index_path.display());
    }
    let content = fs::read_to_string(&index_path)
        .with_context(|| format!("Failed to read {}", index_path.display()))?;
    parse_index(&content).with_context(|| format!("Failed to parse {}", index_path.display()))
}

pub fn parse_index(content: &str) -> Result<Vec<CompoundEntry>> {
    let doc = Document::parse(content)?;
    Ok(doc
        .root_element()
        .children()
        .filter(|n| n.has_tag_name("compound"))
        .map(|compound| CompoundEntry {
            refid: compound.attribute("refid").unwrap_or_default().to_string(),
            kind: compound.attribute("kind").unwrap_or_default().to_string(),
            name: child_text(compound, "name"),
            member_count: compound.children().filter(|n| n.has_tag_name("member")).count(),
        })
        .collect())
}

/// Number of `<member>` entries in `index.xml`
pub fn count_index_members(xml_dir: &Path) -> Result<usize> {
    Ok(read_index(xml_dir)?.iter().map(|c| c.member_count).sum())
}

/// Parse every symbol in the XML output: one entry per named compound plus
/// one per distinct member id.
///
/// Compound files are parsed in parallel. A compound file that is missing or
/// unparseable is skipped with a warning, dropping its symbols.
pub fn load_symbols(xml_dir: &Path) -> Result<Vec<DocSymbol>> {
    let compounds = read_index(xml_dir)?;

    let parsed: Vec<Vec<DocSymbol>> = compounds
        .par_iter()
        .filter(|c| !c.refid.is_empty())
        .map(|compound| {
            let path = xml_dir.join(format!("{}.xml", compound.refid));
            match read_compound(&path, compound) {
                Ok(symbols) => symbols,
                Err(e) => {
                    warn!("Skipping compound {}: {:#}", compound.refid, e);
                    Vec::new()
                }
            }
        })
        .collect();

    let mut seen = HashSet::new();
    let symbols: Vec<DocSymbol> = parsed
        .into_iter()
        .flatten()
        .filter(|symbol| !symbol.id.is_empty() && seen.insert(symbol.id.clone()))
        .collect();
    debug!("Loaded {} symbols from {} compounds", symbols.len(), compounds.len());
    Ok(symbols)
}

fn read_compound(path: &Path, entry: &CompoundEntry) -> Result<Vec<DocSymbol>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_compound(&content, entry).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Symbols of one compound file: the compound itself (when it has a name in
/// the index) followed by all of its `<memberdef>` elements
pub fn parse_compound(content: &str, entry: &CompoundEntry) -> Result<Vec<DocSymbol>> {
    let doc = Document::parse(content)?;
    let mut symbols = Vec::new();

    for compounddef in doc.descendants().filter(|n| n.has_tag_name("compounddef")) {
        if compounddef.attribute("id") == Some(entry.refid.as_str()) && !entry.name.is_empty() {
            let mut symbol = DocSymbol {
                id: entry.refid.clone(),
                name: entry.name.clone(),
                kind: entry.kind.clone(),
                brief: child_text(compounddef, "briefdescription"),
                is_compound: true,
                ..Default::default()
            };
            if let Some(location) = child(compounddef, "location") {
                symbol.file = location.attribute("file").unwrap_or_default().to_string();
                symbol.line = number_attr(location, "line");
            }
            symbols.push(symbol);
        }

        symbols.extend(
            compounddef.descendants().filter(|n| n.has_tag_name("memberdef")).map(parse_memberdef),
        );
    }

    Ok(symbols)
}

fn parse_memberdef(memberdef: Node) -> DocSymbol {
    let mut symbol = DocSymbol {
        id: memberdef.attribute("id").unwrap_or_default().to_string(),
        name: child_text(memberdef, "name"),
        kind: memberdef.attribute("kind").unwrap_or_default().to_string(),
        return_type: child_text(memberdef, "type"),
        brief: child_text(memberdef, "briefdescription"),
        detailed: child_text(memberdef, "detaileddescription"),
        ..Default::default()
    };

    if let Some(location) = child(memberdef, "location") {
        symbol.file = location.attribute("file").unwrap_or_default().to_string();
        symbol.line = number_attr(location, "line");
        symbol.body_start = number_attr(location, "bodystart");
        symbol.body_end = number_attr(location, "bodyend");
    }

    symbol.params = memberdef
        .children()
        .filter(|n| n.has_tag_name("param"))
        .filter_map(|param| {
            let ptype = child_text(param, "type");
            let pname = child_text(param, "declname");
            let joined = format!("{} {}", ptype, pname).trim().to_string();
            (!joined.is_empty()).then_some(joined)
        })
        .collect::<Vec<_>>()
        .join(", ");

    symbol.references = texts_of(memberdef, "references");
    symbol.referenced_by = texts_of(memberdef, "referencedby");
    symbol
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn child_text(node: Node, tag: &str) -> String {
    child(node, tag).map(all_text).unwrap_or_default()
}

fn texts_of(node: Node, tag: &str) -> Vec<String> {
    node.children()
        .filter(|n| n.has_tag_name(tag))
        .map(all_text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Concatenated text of a node and all its descendants, trimmed
fn all_text(node: Node) -> String {
    let text: String =
        node.descendants().filter(|n| n.is_text()).filter_map(|n| n.text()).collect();
    text.trim().to_string()
}

/// Positive integer attribute; missing, malformed and `-1` ("unknown") read as 0
fn number_attr(node: Node, name: &str) -> u32 {
    node.attribute(name)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map_or(0, |v| u32::try_from(v).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='no'?>
<doxygenindex version="1.12.0">
  <compound refid="main_8c" kind="file"><name>main.c</name>
    <member refid="main_8c_1a0" kind="function"><name>main</name></member>
    <member refid="main_8c_1a1" kind="function"><name>helper</name></member>
  </compound>
  <compound refid="structpoint" kind="struct"><name>point</name>
    <member refid="structpoint_1x" kind="variable"><name>x</name></member>
  </compound>
</doxygenindex>
"#;

    const MAIN_C: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='no'?>
<doxygen version="1.12.0">
  <compounddef id="main_8c" kind="file" language="C++">
    <compoundname>main.c</compoundname>
    <sectiondef kind="func">
      <memberdef kind="function" id="main_8c_1a0" prot="public" static="no">
        <type>int</type>
        <definition>int main</definition>
        <argsstring>(int argc, char **argv)</argsstring>
        <name>main</name>
        <param><type>int</type><declname>argc</declname></param>
        <param><type>char **</type><declname>argv</declname></param>
        <briefdescription><para>Entry point.</para></briefdescription>
        <detaileddescription></detaileddescription>
        <references refid="main_8c_1a1" compoundref="main_8c" startline="3" endline="5">helper</references>
        <location file="src/main.c" line="7" column="5" bodyfile="src/main.c" bodystart="8" bodyend="12"/>
      </memberdef>
      <memberdef kind="function" id="main_8c_1a1" prot="public" static="yes">
        <type>static void</type>
        <name>helper</name>
        <param><type>void</type></param>
        <referencedby refid="main_8c_1a0" compoundref="main_8c" startline="7" endline="12">main</referencedby>
        <location file="src/main.c" line="3" column="13" bodyfile="src/main.c" bodystart="3" bodyend="-1"/>
      </memberdef>
    </sectiondef>
    <briefdescription><para>The program.</para></briefdescription>
    <location file="src/main.c"/>
  </compounddef>
</doxygen>
"#;

    fn main_entry() -> CompoundEntry {
        parse_index(INDEX).unwrap().remove(0)
    }

    #[test]
    fn test_parse_index() {
        let compounds = parse_index(INDEX).unwrap();
        assert_eq!(compounds.len(), 2);
        assert_eq!(compounds[0].refid, "main_8c");
        assert_eq!(compounds[0].name, "main.c");
        assert_eq!(compounds[0].member_count, 2);
        assert_eq!(compounds[1].kind, "struct");
    }

    #[test]
    fn test_parse_compound() {
        let symbols = parse_compound(MAIN_C, &main_entry()).unwrap();
        assert_eq!(symbols.len(), 3);

        let file = &symbols[0];
        assert!(file.is_compound);
        assert_eq!(file.kind, "file");
        assert_eq!(file.file, "src/main.c");
        assert_eq!(file.brief, "The program.");

        let main = &symbols[1];
        assert_eq!(main.name, "main");
        assert_eq!(main.return_type, "int");
        assert_eq!(main.params, "int argc, char ** argv");
        assert_eq!(main.brief, "Entry point.");
        assert_eq!((main.line, main.body_start, main.body_end), (7, 8, 12));
        assert_eq!(main.references, vec!["helper"]);

        let helper = &symbols[2];
        assert_eq!(helper.params, "void");
        assert_eq!(helper.body_end, 0, "bodyend=-1 means unknown");
        assert_eq!(helper.referenced_by, vec!["main"]);
        assert!(!helper.has_body());
    }

    #[test]
    fn test_load_symbols_skips_missing_compounds() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join("index.xml"), INDEX).unwrap();
        fs::write(temp.path().join("main_8c.xml"), MAIN_C).unwrap();

        let symbols = load_symbols(temp.path()).unwrap();
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["main.c", "main", "helper"]);
        assert_eq!(count_index_members(temp.path()).unwrap(), 3);
    }

    #[test]
    fn test_missing_index_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = load_symbols(temp.path()).unwrap_err();
        assert!(err.to_string().contains("index.xml not found"));
    }
}
