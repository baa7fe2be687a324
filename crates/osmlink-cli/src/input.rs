//! Reading element streams from disk.
//!
//! Two formats are accepted:
//! - `.json`: a versioned document `{ "version": "1.0.0", "elements": [...] }`,
//!   loaded whole and replayed from memory;
//! - `.jsonl` / `.ndjson`: one element per line, streamed lazily and reset by
//!   seeking back to the start of the file.

use anyhow::{Context, Result};
use osmlink_core::element::Element;
use osmlink_core::error::SourceError;
use osmlink_core::source::{ElementSource, MemorySource};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::{Path, PathBuf};

/// Document format version written and accepted by this tool.
pub const DOCUMENT_VERSION: &str = "1.0.0";

/// A whole element set in one JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub version: String,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Document {
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            elements,
        }
    }
}

/// Load and version-check a `.json` document.
pub fn load_document(path: &Path) -> Result<Document> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document: Document = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    if document.version != DOCUMENT_VERSION {
        anyhow::bail!(
            "{} has document version {}, expected {}",
            path.display(),
            document.version,
            DOCUMENT_VERSION
        );
    }
    Ok(document)
}

/// Newline-delimited JSON elements read lazily from a file.
///
/// Blank lines are skipped. Records are counted from 1 and include blank lines,
/// so a parse error's `record` is the line number in the file.
pub struct JsonLinesSource {
    path: PathBuf,
    reader: BufReader<File>,
    line: String,
    record: usize,
}

impl JsonLinesSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            line: String::new(),
            record: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ElementSource for JsonLinesSource {
    fn next_element(&mut self) -> Result<Option<Element>, SourceError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.record += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|e| SourceError::Parse {
                    record: self.record,
                    message: e.to_string(),
                });
        }
    }

    fn reset(&mut self) -> Result<(), SourceError> {
        self.reader.rewind()?;
        self.record = 0;
        Ok(())
    }
}

/// Open `path` as an element source, choosing the format by extension.
pub fn open_source(path: &Path) -> Result<Box<dyn ElementSource>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jsonl" | "ndjson") => {
            let source = JsonLinesSource::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Box::new(source))
        }
        Some("json") => {
            let document = load_document(path)?;
            tracing::debug!(
                elements = document.elements.len(),
                "loaded {}",
                path.display()
            );
            Ok(Box::new(MemorySource::new(document.elements)))
        }
        _ => anyhow::bail!(
            "unsupported input {}: expected a .json, .jsonl or .ndjson file",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmlink_core::element::PointElement;
    use std::io::Write;

    #[test]
    fn test_lines_source_skips_blank_lines_and_resets() {
        let mut file = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();
        writeln!(file, r#"{{"type":"point","id":1,"lat":1.0,"lon":2.0}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"type":"polyline","id":5,"points":[1,1]}}"#).unwrap();
        file.flush().unwrap();

        let mut source = JsonLinesSource::open(file.path()).unwrap();
        let first = source.next_element().unwrap().unwrap();
        assert_eq!(first, Element::from(PointElement::new(1, 1.0, 2.0)));
        assert_eq!(source.next_element().unwrap().unwrap().id(), 5);
        assert!(source.next_element().unwrap().is_none());

        source.reset().unwrap();
        assert_eq!(source.next_element().unwrap().unwrap().id(), 1);
    }

    #[test]
    fn test_lines_source_reports_record_number() {
        let mut file = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();
        writeln!(file, r#"{{"type":"point","id":1,"lat":1.0,"lon":2.0}}"#).unwrap();
        writeln!(file, r#"{{"type":"point","id":"#).unwrap();
        file.flush().unwrap();

        let mut source = JsonLinesSource::open(file.path()).unwrap();
        source.next_element().unwrap();
        let err = source.next_element().unwrap_err();
        assert!(matches!(err, SourceError::Parse { record: 2, .. }));
    }

    #[test]
    fn test_document_version_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");
        std::fs::write(&path, r#"{"version":"0.9.0","elements":[]}"#).unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(err.to_string().contains("expected 1.0.0"));
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let err = open_source(Path::new("network.osm")).err().unwrap();
        assert!(err.to_string().contains("unsupported input"));
    }
}
