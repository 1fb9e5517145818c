//! Blank disclosure template
//!
//! The template carries the document title, every section and subsection
//! heading, and a `【...】` placeholder under each heading that takes content.

use crate::disclosure::{SectionSpec, DEFAULT_TITLE, PARENT_OF_SUBSECTIONS, SECTIONS, SUBSECTIONS};
use crate::error::ConversionError;
use docx_rs::{AlignmentType, Docx, Paragraph, Run};
use std::path::Path;

/// Placeholder text shown under a heading
pub fn placeholder_for(spec: &SectionSpec) -> String {
    format!("【请在此填写{}】", spec.title)
}

fn heading(text: String) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text).bold())
}

fn placeholder(spec: &SectionSpec) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(placeholder_for(spec)))
}

/// Build the template document
fn build() -> Docx {
    let mut docx = Docx::new().add_paragraph(
        Paragraph::new()
            .align(AlignmentType::Center)
            .add_run(Run::new().add_text(DEFAULT_TITLE).bold()),
    );

    for section in SECTIONS {
        docx = docx.add_paragraph(heading(format!("{}、{}", section.ordinal, section.title)));

        if section.id != PARENT_OF_SUBSECTIONS {
            docx = docx.add_paragraph(placeholder(section));
            continue;
        }
        for sub in SUBSECTIONS {
            docx = docx
                .add_paragraph(heading(format!("（{}）{}", sub.ordinal, sub.title)))
                .add_paragraph(placeholder(sub));
        }
    }
    docx
}

/// Write the blank template to `path`
pub fn write_template(path: &Path) -> Result<(), ConversionError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConversionError::io(parent, e))?;
    }
    let file = std::fs::File::create(path).map_err(|e| ConversionError::io(path, e))?;
    build()
        .build()
        .pack(file)
        .map_err(|e| ConversionError::TemplateWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    log::info!("Wrote template {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disclosure::recognize_heading;
    use crate::docx::DocxDocument;
    use crate::filler::is_placeholder;

    #[test]
    fn test_template_has_every_heading_and_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("template.docx");
        write_template(&path).unwrap();

        let doc = DocxDocument::open(&path).unwrap();
        let texts = doc.paragraph_texts();

        assert_eq!(texts[0], DEFAULT_TITLE);
        let headings: Vec<&str> = texts.iter().filter_map(|t| recognize_heading(t)).collect();
        assert_eq!(
            headings,
            vec!["1", "2", "3", "4", "4.1", "4.2", "4.3", "5", "6", "7"]
        );
        assert_eq!(texts.iter().filter(|t| is_placeholder(t)).count(), 9);
        assert!(texts.iter().all(|t| !t.trim().is_empty()));

        // Section 4 goes straight to its first subsection
        let four = texts.iter().position(|t| t == "4、发明内容").unwrap();
        assert_eq!(texts[four + 1], "（1）解决的技术问题");
    }
}
