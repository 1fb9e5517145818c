//! Find Mermaid diagrams in the disclosure and the diagram description file

use super::Diagram;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Tag, TagEnd};
use regex::Regex;
use std::sync::OnceLock;

/// Start of a figure block in the disclosure, up to the description label
fn figure_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\*\*附图(图\d+)：([^\n]+?)\*\*\s*\n\s*```mermaid\n(.*?)```\s*\n\s*图\d+说明：").ok()
    })
    .as_ref()
}

fn figure_heading() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(图\d+)[:：]\s*(.+)$").ok()).as_ref()
}

fn figure_summary() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"本图展示了(.+?)，与说明书中的(.+?)部分相对应").ok())
        .as_ref()
}

/// Description text following `图N说明：`
///
/// Runs to the first blank line, the first line opening with `**`, or the end.
fn description_at(content: &str) -> &str {
    let end = [content.find("\n\n"), content.find("\n**")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(content.len());
    &content[..end]
}

/// Figure blocks embedded in the disclosure Markdown
///
/// ```text
/// **附图图1：系统架构**
/// ```mermaid
/// graph TD
/// ```
/// 图1说明：...
/// ```
pub fn from_markdown(content: &str) -> Vec<Diagram> {
    let Some(re) = figure_block() else {
        return Vec::new();
    };

    let mut diagrams = Vec::new();
    let mut at = 0;
    while let Some(caps) = re.captures_at(content, at) {
        let Some(whole) = caps.get(0) else {
            break;
        };
        let description = description_at(&content[whole.end()..]);
        diagrams.push(Diagram::new(
            caps[1].trim(),
            caps[2].trim(),
            caps[3].trim(),
            description.trim(),
        ));
        at = whole.end() + description.len();
    }

    log::debug!("Found {} diagrams in the disclosure", diagrams.len());
    diagrams
}

/// What the description parser is collecting text for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Nothing,
    Heading,
    Mermaid,
    Paragraph,
}

struct DescriptionParser {
    capture: Capture,
    text: String,
    current: Option<Diagram>,
    diagrams: Vec<Diagram>,
}

impl DescriptionParser {
    fn new() -> Self {
        Self {
            capture: Capture::Nothing,
            text: String::new(),
            current: None,
            diagrams: Vec::new(),
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H3,
                ..
            }) => self.begin(Capture::Heading),
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang)))
                if lang.trim() == "mermaid" && self.current.is_some() =>
            {
                self.begin(Capture::Mermaid)
            }
            Event::Start(Tag::Paragraph) if self.current.is_some() => {
                self.begin(Capture::Paragraph)
            }
            Event::End(TagEnd::Heading(HeadingLevel::H3)) if self.capture == Capture::Heading => {
                self.finish_heading()
            }
            Event::End(TagEnd::CodeBlock) if self.capture == Capture::Mermaid => {
                let source = std::mem::take(&mut self.text);
                if let Some(diagram) = self.current.as_mut() {
                    diagram.source = source.trim().to_string();
                }
                self.capture = Capture::Nothing;
            }
            Event::End(TagEnd::Paragraph) if self.capture == Capture::Paragraph => {
                self.finish_paragraph()
            }
            Event::Text(text) | Event::Code(text) if self.capture != Capture::Nothing => {
                self.text.push_str(&text)
            }
            Event::SoftBreak | Event::HardBreak if self.capture != Capture::Nothing => {
                self.text.push('\n')
            }
            _ => {}
        }
    }

    fn begin(&mut self, capture: Capture) {
        self.capture = capture;
        self.text.clear();
    }

    fn finish_heading(&mut self) {
        self.capture = Capture::Nothing;
        let heading = std::mem::take(&mut self.text);
        let Some(caps) = figure_heading().and_then(|re| re.captures(heading.trim())) else {
            return;
        };
        self.flush();
        self.current = Some(Diagram::new(caps[1].trim(), caps[2].trim(), "", ""));
    }

    fn finish_paragraph(&mut self) {
        self.capture = Capture::Nothing;
        let paragraph = std::mem::take(&mut self.text);
        for line in paragraph.lines().filter(|l| l.contains("附图说明")) {
            let summary = figure_summary().and_then(|re| re.captures(line));
            if let (Some(caps), Some(diagram)) = (summary, self.current.as_mut()) {
                diagram.description = caps[1].trim().to_string();
            }
        }
    }

    fn flush(&mut self) {
        if let Some(diagram) = self.current.take() {
            if diagram.source.is_empty() {
                log::warn!("{} has no mermaid block, skipping", diagram.number);
            } else {
                self.diagrams.push(diagram);
            }
        }
    }
}

/// Diagrams listed in the description file under `### 图N: 名称` headings
pub fn from_description(content: &str) -> Vec<Diagram> {
    let mut parser = DescriptionParser::new();
    for event in pulldown_cmark::Parser::new(content) {
        parser.process_event(event);
    }
    parser.flush();

    log::debug!("Found {} diagrams in the description file", parser.diagrams.len());
    parser.diagrams
}
