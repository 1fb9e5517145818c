//! Error kinds surfaced at the command boundary
//!
//! Every variant carries enough context for the user to fix the problem
//! (missing file path, install guide, install command).

use crate::config::ConfigError;
use crate::docx::DocxError;
use std::path::PathBuf;
use thiserror::Error;

/// Install hint printed when the Mermaid CLI cannot be found
pub const MERMAID_INSTALL_HINT: &str = "Install mermaid-cli with: npm install -g @mermaid-js/mermaid-cli";

/// Hint printed when neither the Markdown nor the description file holds diagrams
pub const NO_DIAGRAMS_HINT: &str =
    "No diagram blocks found; make sure the diagrams were generated into the disclosure or the description file";

/// Errors that abort a conversion command
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The DOCX template does not exist
    #[error("Template file not found: {}", path.display())]
    TemplateNotFound { path: PathBuf },

    /// A required font is not installed on this machine
    #[error("Required font is not installed: {font}\n{install_guide}")]
    FontNotFound { font: String, install_guide: String },

    /// The Markdown source could not be read
    #[error("Failed to parse markdown {}: {reason}", path.display())]
    MarkdownParse { path: PathBuf, reason: String },

    /// The blank template could not be written
    #[error("Failed to write template {}: {reason}", path.display())]
    TemplateWrite { path: PathBuf, reason: String },

    /// The document to validate does not exist
    #[error("Document to validate not found: {}", path.display())]
    ValidationTargetMissing { path: PathBuf },

    /// The document receiving diagrams does not exist
    #[error("Document to insert diagrams into not found: {}", path.display())]
    TargetDocumentMissing { path: PathBuf },

    /// The diagram rendering tool is not installed
    #[error("Diagram renderer '{command}' is not available\n{hint}")]
    RendererNotFound { command: String, hint: String },

    /// No diagrams were found in any source
    #[error("No diagrams found\n{hint}")]
    NoDiagramsFound { hint: String },

    /// Reading or writing the DOCX package failed
    #[error(transparent)]
    Docx(#[from] DocxError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// JSON input or output failed
    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Other file I/O failures
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a JSON error with the path it happened on
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
