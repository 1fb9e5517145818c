//! Line-oriented Markdown → section tree parser

use super::completeness::check_completeness;
use super::{Metadata, ParsedDisclosure, Section};
use crate::disclosure::{DEFAULT_TITLE, PARENT_OF_SUBSECTIONS};
use regex::Regex;
use std::sync::OnceLock;

fn section_heading() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^##\s*\*\*(\d+)\.\s*(.+?)\*\*").ok())
        .as_ref()
}

fn subsection_heading() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^###\s*\*\*（(\d+)）(.+?)\*\*").ok())
        .as_ref()
}

/// Captured (number, title) of a heading line
fn match_heading(regex: Option<&Regex>, line: &str) -> Option<(u32, String)> {
    let caps = regex?.captures(line)?;
    let number = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let title = caps.get(2)?.as_str().trim().to_string();
    Some((number, title))
}

/// Where body lines currently go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Before the first top-level heading; lines are dropped
    Preamble,
    Section(usize),
    Subsection(usize, usize),
}

/// Extract the document title from the first `#` line
pub fn extract_title(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| line.trim())
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim())
        .filter(|title| !title.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}

struct Builder {
    sections: Vec<Section>,
    target: Target,
    body: Vec<String>,
}

impl Builder {
    fn flush(&mut self) {
        let content = self.body.join("\n").trim().to_string();
        self.body.clear();
        let section = match self.target {
            Target::Preamble => return,
            Target::Section(i) => self.sections.get_mut(i),
            Target::Subsection(i, j) => self
                .sections
                .get_mut(i)
                .and_then(|s| s.subsections.get_mut(j)),
        };
        if let Some(section) = section {
            section.content = content;
        }
    }

    /// Index of the section that may take a sub-heading right now
    fn subsection_parent(&self) -> Option<usize> {
        let i = match self.target {
            Target::Section(i) | Target::Subsection(i, _) => i,
            Target::Preamble => return None,
        };
        (self.sections.get(i)?.number == PARENT_OF_SUBSECTIONS).then_some(i)
    }

    fn push_body(&mut self, line: &str) {
        if self.target != Target::Preamble {
            self.body.push(line.to_string());
        }
    }

    fn start_section(&mut self, number: u32, title: String, line: &str) {
        let number = number.to_string();
        if self.sections.iter().any(|s| s.number == number) {
            log::warn!("Duplicate section heading {} treated as body text", number);
            self.push_body(line);
            return;
        }
        self.flush();
        self.sections.push(Section::new(number, title, 2));
        self.target = Target::Section(self.sections.len() - 1);
    }

    fn start_subsection(&mut self, parent: usize, ordinal: u32, title: String, line: &str) {
        let number = format!("{}.{}", PARENT_OF_SUBSECTIONS, ordinal);
        let duplicate = self
            .sections
            .get(parent)
            .is_some_and(|s| s.subsections.iter().any(|sub| sub.number == number));
        if duplicate {
            log::warn!("Duplicate subsection heading {} treated as body text", number);
            self.push_body(line);
            return;
        }
        self.flush();
        if let Some(section) = self.sections.get_mut(parent) {
            section.subsections.push(Section::new(number, title, 3));
            self.target = Target::Subsection(parent, section.subsections.len() - 1);
        }
    }
}

/// Parse Markdown text into the section model; never fails
pub fn parse_str(text: &str) -> ParsedDisclosure {
    let lines: Vec<&str> = text.lines().collect();
    let title = extract_title(&lines);

    let mut builder = Builder {
        sections: Vec::new(),
        target: Target::Preamble,
        body: Vec::new(),
    };

    for line in &lines {
        if let Some((number, heading)) = match_heading(section_heading(), line) {
            builder.start_section(number, heading, line);
        } else if let Some(parent) = builder.subsection_parent() {
            match match_heading(subsection_heading(), line) {
                Some((ordinal, heading)) => builder.start_subsection(parent, ordinal, heading, line),
                None => builder.push_body(line),
            }
        } else {
            builder.push_body(line);
        }
    }
    builder.flush();

    let sections = builder.sections;
    log::info!("Parsed {} top-level sections", sections.len());

    let metadata = Metadata {
        total_sections: sections.len(),
        has_subsections: sections.iter().any(|s| !s.subsections.is_empty()),
        parsing_timestamp: None,
    };
    let validation = check_completeness(&sections);

    ParsedDisclosure {
        title,
        sections,
        metadata,
        validation,
    }
}
