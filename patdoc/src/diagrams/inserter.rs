//! Render every diagram and insert it into the filled document

use super::render::DiagramRenderer;
use super::resolver::resolve;
use super::{extract, Diagram, DiagramStatus};
use crate::config::FontConfig;
use crate::docx::paragraph::{add_run, apply_paragraph_style};
use crate::docx::xml::XmlElement;
use crate::docx::{DocxDocument, DocxError};
use crate::error::{ConversionError, MERMAID_INSTALL_HINT, NO_DIAGRAMS_HINT};
use crate::formatting;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Files and settings of one insertion run
#[derive(Debug, Clone)]
pub struct InsertOptions {
    /// Disclosure Markdown holding the figure blocks
    pub markdown: PathBuf,
    /// Document the figures are inserted into
    pub docx: PathBuf,
    /// Diagram description file used when the Markdown holds no figures
    pub description: PathBuf,
    /// Directory receiving the rendered images
    pub images_dir: PathBuf,
    /// Where the modified document is written
    pub output: PathBuf,
    pub image_width_inches: f64,
}

/// Outcome of one diagram
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertionRecord {
    pub diagram_number: String,
    pub diagram_name: String,
    pub target_section: String,
    pub image_path: String,
    pub status: DiagramStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of an insertion run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertionReport {
    pub success: bool,
    pub insertion_timestamp: String,
    pub total_diagrams: usize,
    pub success_count: usize,
    pub insertions: Vec<InsertionRecord>,
    pub docx_modified: bool,
}

/// Figures from the Markdown, or from the description file when it has none
pub fn collect_diagrams(markdown: &Path, description: &Path) -> Result<Vec<Diagram>, ConversionError> {
    let content = std::fs::read_to_string(markdown).map_err(|e| ConversionError::MarkdownParse {
        path: markdown.to_path_buf(),
        reason: e.to_string(),
    })?;
    let diagrams = extract::from_markdown(&content);
    if !diagrams.is_empty() || !description.exists() {
        return Ok(diagrams);
    }

    log::info!(
        "No figures in {}, reading {}",
        markdown.display(),
        description.display()
    );
    let content =
        std::fs::read_to_string(description).map_err(|e| ConversionError::io(description, e))?;
    Ok(extract::from_description(&content))
}

/// Render, place and insert every diagram, then save the document
///
/// Fails before touching the document when the renderer is missing or no
/// diagram is found. Individual render or insert failures are reported per
/// diagram; a failed save is reported with `docx_modified == false`.
pub fn insert_all(
    options: &InsertOptions,
    renderer: &dyn DiagramRenderer,
    fonts: &FontConfig,
) -> Result<InsertionReport, ConversionError> {
    if !renderer.is_available() {
        return Err(ConversionError::RendererNotFound {
            command: renderer.name().to_string(),
            hint: MERMAID_INSTALL_HINT.to_string(),
        });
    }

    let diagrams = collect_diagrams(&options.markdown, &options.description)?;
    if diagrams.is_empty() {
        return Err(ConversionError::NoDiagramsFound {
            hint: NO_DIAGRAMS_HINT.to_string(),
        });
    }

    if !options.docx.exists() {
        return Err(ConversionError::TargetDocumentMissing {
            path: options.docx.clone(),
        });
    }
    let mut doc = DocxDocument::open(&options.docx)?;

    let insertions = insert_into(
        &mut doc,
        &diagrams,
        renderer,
        &options.images_dir,
        fonts,
        options.image_width_inches,
    );

    let docx_modified = match doc.save(&options.output) {
        Ok(()) => true,
        Err(e) => {
            log::error!("Failed to save {}: {}", options.output.display(), e);
            false
        }
    };

    let success_count = insertions
        .iter()
        .filter(|r| r.status == DiagramStatus::Success)
        .count();
    Ok(InsertionReport {
        success: docx_modified,
        insertion_timestamp: chrono::Local::now().to_rfc3339(),
        total_diagrams: diagrams.len(),
        success_count,
        insertions,
        docx_modified,
    })
}

/// Insert each diagram in order, recording its outcome
pub fn insert_into(
    doc: &mut DocxDocument,
    diagrams: &[Diagram],
    renderer: &dyn DiagramRenderer,
    images_dir: &Path,
    fonts: &FontConfig,
    width_inches: f64,
) -> Vec<InsertionRecord> {
    diagrams
        .iter()
        .map(|diagram| {
            let image_path = images_dir.join(diagram.image_file_name());
            let mut record = InsertionRecord {
                diagram_number: diagram.number.clone(),
                diagram_name: diagram.name.clone(),
                target_section: String::new(),
                image_path: image_path.display().to_string(),
                status: DiagramStatus::Pending,
                error: None,
            };

            if let Err(e) = renderer.render(&diagram.source, images_dir, &image_path) {
                log::warn!("Failed to render {}: {}", diagram.number, e);
                record.status = DiagramStatus::Failed;
                record.error = Some(e.to_string());
                return record;
            }

            match insert_one(doc, diagram, &image_path, fonts, width_inches) {
                Ok(section) => {
                    log::info!("Inserted {} into {}", diagram.number, section);
                    record.target_section = section;
                    record.status = DiagramStatus::Success;
                }
                Err(e) => {
                    log::warn!("Failed to insert {}: {}", diagram.number, e);
                    record.status = DiagramStatus::Failed;
                    record.error = Some(e.to_string());
                }
            }
            record
        })
        .collect()
}

/// Insert the figure and description paragraphs; returns the target section
fn insert_one(
    doc: &mut DocxDocument,
    diagram: &Diagram,
    image_path: &Path,
    fonts: &FontConfig,
    width_inches: f64,
) -> Result<String, DocxError> {
    let bytes = std::fs::read(image_path)?;
    let point = resolve(&diagram.number, &doc.paragraph_texts());

    let (picture, staged) = doc.image_run(bytes, "png", width_inches, &diagram.name)?;

    let mut figure = XmlElement::new("w:p");
    apply_paragraph_style(&mut figure, &formatting::figure_paragraph());
    add_run(
        &mut figure,
        &format!("{}：{}\n", diagram.number, diagram.name),
        Some(&formatting::caption_style(fonts)),
    );
    figure.push(picture);

    let mut description = XmlElement::new("w:p");
    apply_paragraph_style(&mut description, &formatting::description_paragraph());
    add_run(
        &mut description,
        &format!("{}说明：{}", diagram.number, diagram.description),
        Some(&formatting::description_style(fonts)),
    );

    doc.insert_paragraphs_with_image(point.index, point.side, vec![figure, description], staged)?;
    Ok(point.section)
}
