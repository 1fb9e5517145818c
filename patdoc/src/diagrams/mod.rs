//! Diagram extraction, rendering and placement
//!
//! Diagrams are Mermaid blocks in the disclosure Markdown (or, failing that,
//! in the separate diagram description file). Each one is rendered to PNG
//! by an external tool and inserted next to the paragraph chosen by its
//! placement rule.

pub mod extract;
pub mod inserter;
pub mod mapping;
pub mod render;
pub mod resolver;

pub use inserter::{insert_all, InsertOptions, InsertionReport};
pub use render::MermaidCli;

use serde::Serialize;

/// Processing state of one diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramStatus {
    Pending,
    Success,
    Failed,
}

/// A diagram found in the disclosure
#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    /// Figure number such as `图3`
    pub number: String,
    pub name: String,
    /// Mermaid source without the fences
    pub source: String,
    pub description: String,
}

impl Diagram {
    pub fn new(
        number: impl Into<String>,
        name: impl Into<String>,
        source: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            source: source.into(),
            description: description.into(),
        }
    }

    /// File name of the rendered image: `<number>_<name>.png` with path-hostile
    /// characters replaced
    pub fn image_file_name(&self) -> String {
        format!("{}_{}.png", self.number, safe_name(&self.name))
    }
}

/// Replace characters that are not allowed in file names with `_`
pub fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_file_name_is_safe() {
        let diagram = Diagram::new("图2", "软件/硬件: 架构?", "graph TD", "");
        assert_eq!(diagram.image_file_name(), "图2_软件_硬件_ 架构_.png");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&DiagramStatus::Failed).unwrap(), "\"failed\"");
    }
}
