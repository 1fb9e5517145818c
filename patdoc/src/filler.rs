//! Template filling and the formatting pass
//!
//! Both walks carry a single piece of state: the id of the section heading
//! most recently seen.

use crate::config::FontConfig;
use crate::disclosure::recognize_heading;
use crate::docx::paragraph::{self, apply_paragraph_style, apply_run_style};
use crate::docx::xml::XmlElement;
use crate::docx::{DocxDocument, DocxError, Paragraph, RunStyle, Side};
use crate::formatting;
use crate::section_model::ParsedDisclosure;
use serde::Serialize;
use std::collections::BTreeMap;

/// Section whose content is styled like a title
const TITLE_SECTION: &str = "1";

/// Position of the walk relative to the section headings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    BeforeSections,
    InSection(&'static str),
}

/// What a fill pass did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FillOutcome {
    /// Section ids whose placeholder was replaced, in document order
    pub filled_sections: Vec<String>,
    /// Paragraphs created beyond the placeholders themselves
    pub paragraphs_added: usize,
    /// Placeholders that were left in place
    pub warnings: Vec<String>,
}

/// True for a template instruction paragraph such as `【请填写...】`
pub fn is_placeholder(text: &str) -> bool {
    text.contains('【') && text.contains('】')
}

/// Section id → content to put in place of its placeholder
///
/// Subsections map individually; a section's own text maps when it has no
/// subsections or when it is non-empty.
pub fn content_map(parsed: &ParsedDisclosure) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for section in &parsed.sections {
        for sub in &section.subsections {
            map.insert(sub.number.clone(), sub.content.clone());
        }
        if section.subsections.is_empty() || !section.content.trim().is_empty() {
            map.insert(section.number.clone(), section.content.clone());
        }
    }
    map
}

fn style_for(section: &str, fonts: &FontConfig) -> RunStyle {
    if section == TITLE_SECTION {
        formatting::title_style(fonts)
    } else {
        formatting::body_style(fonts)
    }
}

/// Paragraph texts separated by blank lines
fn chunks(content: &str) -> Vec<&str> {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

/// Replace every placeholder under a known section with that section's content
pub fn fill(
    doc: &mut DocxDocument,
    parsed: &ParsedDisclosure,
    fonts: &FontConfig,
) -> Result<FillOutcome, DocxError> {
    let map = content_map(parsed);
    let mut outcome = FillOutcome::default();
    let mut state = WalkState::BeforeSections;
    let mut index = 0;

    while let Some(text) = doc.paragraph(index).map(|p| p.text()) {
        let text = text.trim();

        if let Some(id) = recognize_heading(text) {
            state = WalkState::InSection(id);
            index += 1;
            continue;
        }

        if is_placeholder(text) {
            let content = match state {
                WalkState::InSection(id) => map
                    .get(id)
                    .map(|c| chunks(c))
                    .filter(|c| !c.is_empty())
                    .map(|c| (id, c)),
                WalkState::BeforeSections => None,
            };

            match content {
                Some((id, paragraphs)) => {
                    let added = replace_placeholder(doc, index, &paragraphs, &style_for(id, fonts))?;
                    log::debug!("Filled section {} with {} paragraphs", id, added + 1);
                    outcome.filled_sections.push(id.to_string());
                    outcome.paragraphs_added += added;
                    index += added;
                }
                None => {
                    let warning = match state {
                        WalkState::InSection(id) => {
                            format!("No content for placeholder in section {}: {}", id, text)
                        }
                        WalkState::BeforeSections => {
                            format!("Placeholder before any section heading: {}", text)
                        }
                    };
                    log::warn!("{}", warning);
                    outcome.warnings.push(warning);
                }
            }
        }

        index += 1;
    }

    log::info!(
        "Filled {} placeholders, added {} paragraphs",
        outcome.filled_sections.len(),
        outcome.paragraphs_added
    );
    Ok(outcome)
}

/// Put the first chunk into the placeholder and the rest into new siblings after it
///
/// Returns the number of paragraphs inserted.
fn replace_placeholder(
    doc: &mut DocxDocument,
    index: usize,
    chunks: &[&str],
    style: &RunStyle,
) -> Result<usize, DocxError> {
    let Some((first, rest)) = chunks.split_first() else {
        return Ok(0);
    };

    let count = doc.paragraph_count();
    let placeholder = doc
        .paragraph_mut(index)
        .ok_or(DocxError::ParagraphOutOfRange { index, count })?;
    paragraph::clear(placeholder);
    paragraph::add_run(placeholder, first, Some(style));

    let siblings: Vec<XmlElement> = rest
        .iter()
        .map(|chunk| {
            let mut sibling = paragraph::sibling_with_properties(placeholder);
            paragraph::add_run(&mut sibling, chunk, Some(style));
            sibling
        })
        .collect();

    let added = siblings.len();
    if added > 0 {
        doc.insert_paragraphs(index, Side::After, siblings)?;
    }
    Ok(added)
}

fn style_runs(paragraph: &mut XmlElement, style: &RunStyle) {
    for node in paragraph.children.iter_mut() {
        let Some(run) = node.as_element_mut().filter(|e| e.local_name() == "r") else {
            continue;
        };
        if !crate::docx::Run::new(run).text().trim().is_empty() {
            apply_run_style(run, style);
        }
    }
}

/// Apply page setup, run styles and paragraph formats to the whole document
pub fn format(doc: &mut DocxDocument, fonts: &FontConfig) -> Result<(), DocxError> {
    doc.set_page_geometry(&formatting::patent_page())?;

    let title = formatting::title_style(fonts);
    let body = formatting::body_style(fonts);
    let mut state = WalkState::BeforeSections;

    for index in 0..doc.paragraph_count() {
        let Some(paragraph) = doc.paragraph_mut(index) else {
            continue;
        };
        let text = Paragraph::new(paragraph).text();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        if let Some(id) = recognize_heading(text) {
            state = WalkState::InSection(id);
            style_runs(paragraph, &title);
            apply_paragraph_style(paragraph, &formatting::heading_paragraph());
            continue;
        }

        match state {
            WalkState::BeforeSections => {
                style_runs(paragraph, &title);
                apply_paragraph_style(paragraph, &formatting::title_paragraph());
            }
            WalkState::InSection(id) => {
                let style = if id == TITLE_SECTION { &title } else { &body };
                style_runs(paragraph, style);
                apply_paragraph_style(paragraph, &formatting::body_paragraph());
            }
        }
    }

    log::info!("Formatted {} paragraphs", doc.paragraph_count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::test_support::{document_from_body, document_with_paragraphs, paragraph};
    use crate::docx::{Alignment, LineSpacing};
    use crate::section_model::parse_str;

    const MARKDOWN: &str = "# 交底书
## **1. 发明创造名称**
一种组网方法
## **4. 发明内容**
### **（1）解决的技术问题**
问题描述
### **（2）技术方案**
方案第一段

方案第二段
第二段的续行
## **5. 具体实施方式**
实施方式正文
";

    fn template() -> DocxDocument {
        document_with_paragraphs(&[
            "专利申请技术交底书",
            "1、发明创造名称",
            "【填写发明名称】",
            "4、发明内容",
            "（1）解决的技术问题",
            "【描述问题】",
            "（2）技术方案",
            "【描述方案】",
            "（3）有益效果",
            "【描述效果】",
            "5、具体实施方式",
            "【描述实施方式】",
        ])
    }

    #[test]
    fn test_content_map_prefers_subsections() {
        let map = content_map(&parse_str(MARKDOWN));
        assert_eq!(map.get("4.1").map(String::as_str), Some("问题描述"));
        assert!(!map.contains_key("4"));
        assert_eq!(map.get("5").map(String::as_str), Some("实施方式正文"));
    }

    #[test]
    fn test_fill_replaces_placeholders_in_order() {
        let mut doc = template();
        let outcome = fill(&mut doc, &parse_str(MARKDOWN), &FontConfig::default()).unwrap();

        assert_eq!(outcome.filled_sections, vec!["1", "4.1", "4.2", "5"]);
        assert_eq!(outcome.paragraphs_added, 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("4.3"));

        let texts = doc.paragraph_texts();
        assert_eq!(texts[2], "一种组网方法");
        assert_eq!(texts[7], "方案第一段");
        assert_eq!(texts[8], "方案第二段\n第二段的续行");
        assert_eq!(texts[9], "（3）有益效果");
        assert_eq!(texts[10], "【描述效果】");
        assert_eq!(texts[12], "实施方式正文");
    }

    #[test]
    fn test_extra_paragraphs_keep_placeholder_properties() {
        let mut doc = document_from_body(&format!(
            r#"{}<w:p><w:pPr><w:pStyle w:val="BodyText"/></w:pPr><w:r><w:t>【方案】</w:t></w:r></w:p>"#,
            paragraph("（2）技术方案")
        ));
        let parsed = parse_str("## **4. 发明内容**\n### **（2）技术方案**\n甲\n\n乙\n");
        fill(&mut doc, &parsed, &FontConfig::default()).unwrap();

        let paragraphs = doc.paragraphs();
        assert_eq!(paragraphs.len(), 3);
        let style = paragraphs[2]
            .element()
            .child("pPr")
            .and_then(|ppr| ppr.child("pStyle"))
            .and_then(|s| s.attr("val"));
        assert_eq!(style, Some("BodyText"));
    }

    #[test]
    fn test_placeholder_before_sections_is_a_warning() {
        let mut doc = document_with_paragraphs(&["【标题】", "1、发明创造名称"]);
        let outcome = fill(&mut doc, &parse_str(MARKDOWN), &FontConfig::default()).unwrap();
        assert!(outcome.filled_sections.is_empty());
        assert_eq!(doc.paragraph_texts()[0], "【标题】");
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_format_styles_headings_and_body() {
        let mut doc = template();
        let fonts = FontConfig::default();
        fill(&mut doc, &parse_str(MARKDOWN), &fonts).unwrap();
        format(&mut doc, &fonts).unwrap();

        let paragraphs = doc.paragraphs();

        let heading_run = paragraphs[1].first_run().unwrap().format();
        assert_eq!(heading_run.font.as_deref(), Some("思源黑体 CN Bold"));
        assert_eq!(heading_run.bold, Some(true));
        assert_eq!(heading_run.size_pt, Some(18.0));
        let heading = paragraphs[1].format();
        assert_eq!(heading.line_spacing, Some(LineSpacing::Multiple(1.5)));
        assert_eq!(heading.first_line_indent_twips, None);

        // Section 1 content uses the title face
        assert_eq!(paragraphs[2].first_run().unwrap().format().bold, Some(true));

        let body = &paragraphs[5];
        let run = body.first_run().unwrap().format();
        assert_eq!(run.font.as_deref(), Some("思源黑体 CN Normal"));
        assert_eq!(run.east_asia_font.as_deref(), Some("思源黑体 CN Normal"));
        assert_eq!(run.size_pt, Some(10.0));
        assert_eq!(run.bold, Some(false));

        let format = body.format();
        assert_eq!(format.alignment, Some(Alignment::Justify));
        assert_eq!(format.line_spacing, Some(LineSpacing::Multiple(1.5)));
        assert_eq!(format.first_line_indent_twips, Some(360));
        assert_eq!(format.space_before_twips, Some(0));

        assert_eq!(paragraphs[0].format().alignment, Some(Alignment::Center));

        let page = doc.page_geometry().unwrap();
        assert!((page.width_cm().unwrap() - 21.0).abs() < 0.5);
        assert_eq!(page.left_margin_twips, Some(1800));
    }
}
