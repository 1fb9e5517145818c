//! Layout of a patent disclosure document (技术交底书)
//!
//! Seven numbered top-level sections, with three numbered subsections under
//! section 4. Headings are recognized in two forms: the Markdown source uses
//! `## **1. 名称**` and the DOCX template uses `1、名称` / `（1）名称`.

use regex::Regex;
use std::sync::OnceLock;

/// A required section or subsection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpec {
    /// Hierarchical id ("4", "4.2")
    pub id: &'static str,
    /// Ordinal shown in the heading (4 for "4、", 2 for "（2）")
    pub ordinal: u32,
    pub title: &'static str,
}

/// Required top-level sections in document order
pub const SECTIONS: &[SectionSpec] = &[
    SectionSpec { id: "1", ordinal: 1, title: "发明创造名称" },
    SectionSpec { id: "2", ordinal: 2, title: "所属技术领域" },
    SectionSpec { id: "3", ordinal: 3, title: "相关的背景技术" },
    SectionSpec { id: "4", ordinal: 4, title: "发明内容" },
    SectionSpec { id: "5", ordinal: 5, title: "具体实施方式" },
    SectionSpec { id: "6", ordinal: 6, title: "关键点和欲保护点" },
    SectionSpec { id: "7", ordinal: 7, title: "其他有助于理解本技术的资料" },
];

/// Required subsections of section 4
pub const SUBSECTIONS: &[SectionSpec] = &[
    SectionSpec { id: "4.1", ordinal: 1, title: "解决的技术问题" },
    SectionSpec { id: "4.2", ordinal: 2, title: "技术方案" },
    SectionSpec { id: "4.3", ordinal: 3, title: "有益效果" },
];

/// The only section that carries subsections
pub const PARENT_OF_SUBSECTIONS: &str = "4";

/// Title used when the Markdown has no `#` line
pub const DEFAULT_TITLE: &str = "专利申请技术交底书";

/// Look up a section or subsection by id
pub fn spec_for(id: &str) -> Option<&'static SectionSpec> {
    SECTIONS.iter().chain(SUBSECTIONS).find(|s| s.id == id)
}

struct HeadingPattern {
    spec: &'static SectionSpec,
    regex: Regex,
}

fn heading_patterns() -> &'static [HeadingPattern] {
    static PATTERNS: OnceLock<Vec<HeadingPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let top = SECTIONS.iter().map(|spec| {
            (spec, format!(r"^{}[、.．]\s*{}", spec.ordinal, regex::escape(spec.title)))
        });
        let sub = SUBSECTIONS.iter().map(|spec| {
            (spec, format!(r"^[（(]{}[）)][、.．]?\s*{}", spec.ordinal, regex::escape(spec.title)))
        });
        top.chain(sub)
            .filter_map(|(spec, pattern)| match Regex::new(&pattern) {
                Ok(regex) => Some(HeadingPattern { spec, regex }),
                Err(e) => {
                    log::error!("Invalid heading pattern for section {}: {}", spec.id, e);
                    None
                }
            })
            .collect()
    })
}

/// Recognize a DOCX paragraph as a section or subsection heading
///
/// Returns the section id ("1".."7", "4.1".."4.3").
pub fn recognize_heading(text: &str) -> Option<&'static str> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    heading_patterns()
        .iter()
        .find(|p| p.regex.is_match(text))
        .map(|p| p.spec.id)
}

/// True when `id` names a top-level section
pub fn is_top_level(id: &str) -> bool {
    !id.contains('.')
}

/// Recognize the `（k）` prefix of a subsection heading regardless of its title
pub fn subsection_marker(text: &str) -> Option<u32> {
    let text = text.trim_start();
    let rest = text.strip_prefix('（')?;
    let (digits, _) = rest.split_once('）')?;
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognizes_template_headings() {
        assert_eq!(recognize_heading("1、发明创造名称"), Some("1"));
        assert_eq!(recognize_heading("  5. 具体实施方式"), Some("5"));
        assert_eq!(recognize_heading("7、其他有助于理解本技术的资料："), Some("7"));
        assert_eq!(recognize_heading("（2）技术方案"), Some("4.2"));
        assert_eq!(recognize_heading("（3）、有益效果"), Some("4.3"));
    }

    #[test]
    fn test_rejects_body_text_mentioning_titles() {
        assert_eq!(recognize_heading("本发明的技术方案如下"), None);
        assert_eq!(recognize_heading("11、发明创造名称"), None);
        assert_eq!(recognize_heading("（4）技术方案"), None);
        assert_eq!(recognize_heading(""), None);
    }

    #[test]
    fn test_spec_lookup_and_levels() {
        assert_eq!(spec_for("4.2").map(|s| s.title), Some("技术方案"));
        assert_eq!(spec_for("9"), None);
        assert!(is_top_level("5"));
        assert!(!is_top_level("4.1"));
        assert_eq!(SECTIONS.len(), 7);
    }

    #[test]
    fn test_subsection_marker() {
        assert_eq!(subsection_marker("（1）解决的技术问题"), Some(1));
        assert_eq!(subsection_marker("（12）其他"), Some(12));
        assert_eq!(subsection_marker("1、发明创造名称"), None);
    }
}
