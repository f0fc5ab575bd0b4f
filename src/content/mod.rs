//! Asset content parsing.
//!
//! Asset files are either JSON documents (Aseprite sprite sheets, path
//! definitions, Tiled JSON exports) or XML documents (Tiled `.tmx` maps and
//! `.tsx` tilesets). Parsing never fails: JSON is tried first, XML second, and
//! anything else is carried along without a value so the classifier can fall
//! back to path-based decisions.

pub mod markup;

use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A file read from disk, owned by the task that read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl RawFile {
    /// Read a file into memory.
    pub fn read(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self { path: path.to_path_buf(), bytes })
    }
}

/// Structured view of a file's contents.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedContent {
    pub path: PathBuf,
    /// `None` when the bytes were neither JSON nor XML
    pub value: Option<Value>,
}

/// Format the content was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Json,
    Xml,
}

/// Dual-format content parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentParser;

impl ContentParser {
    /// Parse raw bytes into a structured value, JSON first, XML second.
    pub fn parse(bytes: &[u8]) -> Option<Value> {
        Self::parse_with_format(bytes).map(|(value, _)| value)
    }

    /// Like [`ContentParser::parse`], also reporting which format matched.
    pub fn parse_with_format(bytes: &[u8]) -> Option<(Value, ContentFormat)> {
        if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
            return Some((value, ContentFormat::Json));
        }
        markup::parse_xml(bytes).ok().map(|value| (value, ContentFormat::Xml))
    }

    /// Parse a file that has already been read.
    pub fn parse_file(file: RawFile) -> ParsedContent {
        let value = match Self::parse_with_format(&file.bytes) {
            Some((value, format)) => {
                log::trace!("{}: parsed as {:?}", file.path.display(), format);
                Some(value)
            }
            None => {
                log::debug!("{}: content is neither JSON nor XML", file.path.display());
                None
            }
        };
        ParsedContent { path: file.path, value }
    }
}
