//! Section model built from a Markdown disclosure
//!
//! The Markdown source is split on numbered bold headings into an ordered
//! section tree. The tree is serialized to JSON by `parse` and read back by
//! `generate`.

use crate::error::ConversionError;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod completeness;
mod parser;

pub use completeness::{check_completeness, Completeness};
pub use parser::{extract_title, parse_str};

/// A numbered section or subsection of the disclosure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Hierarchical id ("4" or "4.2")
    pub number: String,

    pub title: String,

    /// Body text with surrounding blank lines trimmed
    pub content: String,

    /// 2 for top-level sections, 3 for subsections
    pub level: u8,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<Section>,
}

impl Section {
    pub fn new(number: impl Into<String>, title: impl Into<String>, level: u8) -> Self {
        Self {
            number: number.into(),
            title: title.into(),
            content: String::new(),
            level,
            subsections: Vec::new(),
        }
    }
}

/// Summary counts for the parsed tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub total_sections: usize,
    pub has_subsections: bool,
    /// RFC 3339 local time, set when parsed from a file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsing_timestamp: Option<String>,
}

/// Parser output: title, section tree, summary and completeness report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDisclosure {
    pub title: String,

    pub sections: Vec<Section>,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub validation: Completeness,
}

impl ParsedDisclosure {
    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Parse a Markdown file into the section model
///
/// # Parameters
/// * `path` - Path to the Markdown disclosure
///
/// # Returns
/// * `Ok(ParsedDisclosure)` - The parsed section tree
/// * `Err(ConversionError::MarkdownParse)` - The file is missing or unreadable
pub fn parse_file(path: &Path) -> Result<ParsedDisclosure, ConversionError> {
    if !path.exists() {
        return Err(ConversionError::MarkdownParse {
            path: path.to_path_buf(),
            reason: "file does not exist".to_string(),
        });
    }

    let text = std::fs::read_to_string(path).map_err(|e| ConversionError::MarkdownParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    log::info!("Parsing disclosure {}", path.display());
    let mut parsed = parse_str(&text);
    parsed.metadata.parsing_timestamp = Some(chrono::Local::now().to_rfc3339());
    Ok(parsed)
}

/// Load a previously written section model
pub fn load_json(path: &Path) -> Result<ParsedDisclosure, ConversionError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConversionError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| ConversionError::json(path, e))
}
