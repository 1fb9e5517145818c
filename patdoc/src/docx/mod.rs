//! Read, modify and write `.docx` files
//!
//! A .docx file is a ZIP archive of XML parts. The document body
//! (`word/document.xml`) is parsed into an owned element tree; every other part
//! is carried through untouched unless an image is embedded, in which case the
//! relationships and content types are extended.

mod media;
mod package;
pub mod paragraph;
pub mod xml;

pub use media::{Extent, StagedImage, EMUS_PER_INCH};
pub use package::DocxPackage;
pub use paragraph::{
    Alignment, LineSpacing, Paragraph, ParagraphFormat, ParagraphStyle, Run, RunFormat, RunStyle,
};
pub use xml::XmlError;

use std::path::Path;
use thiserror::Error;
use xml::{XmlElement, XmlNode};

const DOCUMENT_PART: &str = "word/document.xml";

/// Twips per inch
pub const TWIPS_PER_INCH: i64 = 1440;

const CM_PER_INCH: f64 = 2.54;

/// WordprocessingML section property order (CT_SectPr)
const SECTPR_ORDER: &[&str] = &[
    "headerReference",
    "footerReference",
    "footnotePr",
    "endnotePr",
    "type",
    "pgSz",
    "pgMar",
    "paperSrc",
    "pgBorders",
    "lnNumType",
    "pgNumType",
    "cols",
    "formProt",
    "vAlign",
    "noEndnote",
    "titlePg",
    "textDirection",
    "bidi",
    "rtlGutter",
    "docGrid",
    "printerSettings",
    "sectPrChange",
];

/// Errors that can occur while working with a DOCX package
#[derive(Error, Debug)]
pub enum DocxError {
    /// Error reading or writing the ZIP archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing or writing XML content
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// Required part not found in the archive
    #[error("Required part not found: {0}")]
    MissingPart(String),

    /// The XML does not have the expected shape
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),

    /// A paragraph index past the end of the body
    #[error("Paragraph index {index} out of range ({count} paragraphs)")]
    ParagraphOutOfRange { index: usize, count: usize },
}

/// Where to put new content relative to an anchor paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Before,
    After,
}

/// Page size and margins of a section, in twips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageGeometry {
    pub width_twips: Option<i64>,
    pub height_twips: Option<i64>,
    pub top_margin_twips: Option<i64>,
    pub bottom_margin_twips: Option<i64>,
    pub left_margin_twips: Option<i64>,
    pub right_margin_twips: Option<i64>,
}

/// Convert twips to centimetres
pub fn twips_to_cm(twips: i64) -> f64 {
    twips as f64 / TWIPS_PER_INCH as f64 * CM_PER_INCH
}

/// Convert inches to whole twips
pub fn inches_to_twips(inches: f64) -> i64 {
    (inches * TWIPS_PER_INCH as f64).round() as i64
}

impl PageGeometry {
    pub fn width_cm(&self) -> Option<f64> {
        self.width_twips.map(twips_to_cm)
    }

    pub fn height_cm(&self) -> Option<f64> {
        self.height_twips.map(twips_to_cm)
    }

    fn read(sect_pr: &XmlElement) -> Self {
        let value = |child: &str, attr: &str| {
            sect_pr
                .child(child)
                .and_then(|e| e.attr(attr))
                .and_then(|v| v.parse::<i64>().ok())
        };
        Self {
            width_twips: value("pgSz", "w"),
            height_twips: value("pgSz", "h"),
            top_margin_twips: value("pgMar", "top"),
            bottom_margin_twips: value("pgMar", "bottom"),
            left_margin_twips: value("pgMar", "left"),
            right_margin_twips: value("pgMar", "right"),
        }
    }
}

/// An opened document: the package plus the parsed main document part
#[derive(Debug, Clone)]
pub struct DocxDocument {
    package: DocxPackage,
    root: XmlElement,
}

impl DocxDocument {
    /// Open a .docx file from disk
    pub fn open(path: &Path) -> Result<Self, DocxError> {
        log::info!("Opening DOCX {}", path.display());
        Self::from_package(DocxPackage::open(path)?)
    }

    pub fn from_package(package: DocxPackage) -> Result<Self, DocxError> {
        let bytes = package
            .part(DOCUMENT_PART)
            .ok_or_else(|| DocxError::MissingPart(DOCUMENT_PART.to_string()))?;
        let root = xml::parse(bytes)?;
        if root.child("body").is_none() {
            return Err(DocxError::InvalidStructure(
                "word/document.xml has no w:body".to_string(),
            ));
        }
        Ok(Self { package, root })
    }

    /// Write the document, including any embedded media, to `path`
    pub fn save(&mut self, path: &Path) -> Result<(), DocxError> {
        self.package.set_part(DOCUMENT_PART, xml::write(&self.root)?);
        self.package.write_to(path)?;
        log::info!("Saved DOCX {}", path.display());
        Ok(())
    }

    fn body(&self) -> Option<&XmlElement> {
        self.root.child("body")
    }

    fn body_mut(&mut self) -> Result<&mut XmlElement, DocxError> {
        self.root
            .child_mut("body")
            .ok_or_else(|| DocxError::InvalidStructure("document has no w:body".to_string()))
    }

    /// Indices into `w:body` children of every direct `w:p`
    fn paragraph_slots(&self) -> Vec<usize> {
        self.body()
            .map(|body| {
                body.children
                    .iter()
                    .enumerate()
                    .filter(|(_, node)| node.is_element("p"))
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Body paragraphs in document order (tables and other blocks are skipped)
    pub fn paragraphs(&self) -> Vec<Paragraph<'_>> {
        self.body()
            .map(|body| body.children_named("p").map(Paragraph::new).collect())
            .unwrap_or_default()
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraph_slots().len()
    }

    pub fn paragraph_texts(&self) -> Vec<String> {
        self.paragraphs().iter().map(Paragraph::text).collect()
    }

    pub fn paragraph(&self, index: usize) -> Option<Paragraph<'_>> {
        self.body()?.children_named("p").nth(index).map(Paragraph::new)
    }

    pub fn paragraph_mut(&mut self, index: usize) -> Option<&mut XmlElement> {
        let slot = *self.paragraph_slots().get(index)?;
        self.root
            .child_mut("body")?
            .children
            .get_mut(slot)?
            .as_element_mut()
    }

    /// Insert `paragraphs` in order on the given side of paragraph `index`
    ///
    /// Inserting after the last paragraph of an empty body appends before the
    /// trailing section properties.
    pub fn insert_paragraphs(
        &mut self,
        index: usize,
        side: Side,
        paragraphs: Vec<XmlElement>,
    ) -> Result<(), DocxError> {
        let slots = self.paragraph_slots();
        let body = self.body_mut()?;

        let at = match (slots.get(index), side) {
            (Some(&slot), Side::Before) => slot,
            (Some(&slot), Side::After) => slot + 1,
            (None, _) if slots.is_empty() && index == 0 => body
                .position_of("sectPr")
                .unwrap_or(body.children.len()),
            (None, _) => {
                return Err(DocxError::ParagraphOutOfRange {
                    index,
                    count: slots.len(),
                })
            }
        };

        for (offset, paragraph) in paragraphs.into_iter().enumerate() {
            body.children.insert(at + offset, XmlNode::Element(paragraph));
        }
        Ok(())
    }

    /// Geometry of the first section
    pub fn page_geometry(&self) -> Option<PageGeometry> {
        self.first_section().map(PageGeometry::read)
    }

    fn first_section(&self) -> Option<&XmlElement> {
        let body = self.body()?;
        body.children_named("p")
            .find_map(|p| p.child("pPr").and_then(|ppr| ppr.child("sectPr")))
            .or_else(|| body.child("sectPr"))
    }

    fn first_section_mut(&mut self) -> Result<&mut XmlElement, DocxError> {
        let body = self.body_mut()?;
        let in_paragraph = body.children.iter().position(|node| {
            node.as_element().is_some_and(|e| {
                e.local_name() == "p"
                    && e.child("pPr").is_some_and(|ppr| ppr.child("sectPr").is_some())
            })
        });

        let section = match in_paragraph {
            Some(slot) => body.children[slot]
                .as_element_mut()
                .and_then(|p| p.child_mut("pPr"))
                .and_then(|ppr| ppr.child_mut("sectPr")),
            None => {
                if body.child("sectPr").is_none() {
                    body.push(XmlElement::new("w:sectPr"));
                }
                body.child_mut("sectPr")
            }
        };
        section.ok_or_else(|| DocxError::InvalidStructure("no section properties".to_string()))
    }

    /// Write page size and margins into the first section
    ///
    /// Fields left as `None` are not touched.
    pub fn set_page_geometry(&mut self, geometry: &PageGeometry) -> Result<(), DocxError> {
        let section = self.first_section_mut()?;

        let size = section_child(section, "pgSz");
        if let Some(w) = geometry.width_twips {
            size.set_attr("w:w", w.to_string());
        }
        if let Some(h) = geometry.height_twips {
            size.set_attr("w:h", h.to_string());
        }
        if let (Some(w), Some(h)) = (geometry.width_twips, geometry.height_twips) {
            if w < h {
                size.remove_attr("orient");
            }
        }

        let margins = section_child(section, "pgMar");
        for (key, value) in [
            ("w:top", geometry.top_margin_twips),
            ("w:bottom", geometry.bottom_margin_twips),
            ("w:left", geometry.left_margin_twips),
            ("w:right", geometry.right_margin_twips),
        ] {
            if let Some(value) = value {
                margins.set_attr(key, value.to_string());
            }
        }
        for (key, default) in [("w:header", "720"), ("w:footer", "720"), ("w:gutter", "0")] {
            if margins.attr(xml::local_part(key)).is_none() {
                margins.set_attr(key, default);
            }
        }
        Ok(())
    }

    /// Build a run showing a picture at `width_inches`, with the package
    /// changes it needs staged for [`DocxDocument::insert_paragraphs_with_image`]
    pub fn image_run(
        &self,
        bytes: Vec<u8>,
        extension: &str,
        width_inches: f64,
        description: &str,
    ) -> Result<(XmlElement, StagedImage), DocxError> {
        let extent = Extent::for_width(&bytes, width_inches);
        let staged = media::stage_image_part(&self.package, bytes, extension)?;
        let run = media::drawing_run(&staged.rel_id, extent, self.next_drawing_id(), description)?;
        Ok((run, staged))
    }

    /// Insert paragraphs that reference a staged picture, then embed it
    ///
    /// The package is left unchanged when the insertion fails.
    pub fn insert_paragraphs_with_image(
        &mut self,
        index: usize,
        side: Side,
        paragraphs: Vec<XmlElement>,
        image: StagedImage,
    ) -> Result<(), DocxError> {
        self.insert_paragraphs(index, side, paragraphs)?;
        image.apply(&mut self.package);
        Ok(())
    }

    /// One past the largest `wp:docPr/@id` in the body
    fn next_drawing_id(&self) -> u32 {
        let mut doc_prs = Vec::new();
        self.root.descendants("docPr", &mut doc_prs);
        doc_prs
            .iter()
            .filter_map(|e| e.attr("id").and_then(|id| id.parse::<u32>().ok()))
            .max()
            .unwrap_or(0)
            + 1
    }

    pub fn package(&self) -> &DocxPackage {
        &self.package
    }
}

fn section_child<'a>(section: &'a mut XmlElement, local: &str) -> &'a mut XmlElement {
    let index = match section.position_of(local) {
        Some(index) => index,
        None => {
            let rank = |name: &str| SECTPR_ORDER.iter().position(|o| *o == name);
            let new_rank = rank(local);
            let at = section
                .children
                .iter()
                .position(|node| match (node.as_element(), new_rank) {
                    (Some(e), Some(new_rank)) => rank(e.local_name()).is_some_and(|r| r > new_rank),
                    _ => false,
                })
                .unwrap_or(section.children.len());
            section
                .children
                .insert(at, XmlNode::Element(XmlElement::new(format!("w:{local}"))));
            at
        }
    };
    match &mut section.children[index] {
        XmlNode::Element(element) => element,
        _ => unreachable!("position_of only returns element indices"),
    }
}

/// Builders for in-memory documents used by unit tests
#[cfg(test)]
pub mod test_support {
    use super::*;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

    const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

    const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

    /// A document whose `w:body` holds `body_xml`
    pub fn document_from_body(body_xml: &str) -> DocxDocument {
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{}</w:body></w:document>"#,
            body_xml
        );
        let package = DocxPackage::from_parts(vec![
            ("[Content_Types].xml".to_string(), CONTENT_TYPES.as_bytes().to_vec()),
            ("_rels/.rels".to_string(), ROOT_RELS.as_bytes().to_vec()),
            ("word/document.xml".to_string(), document.into_bytes()),
            (
                "word/_rels/document.xml.rels".to_string(),
                DOCUMENT_RELS.as_bytes().to_vec(),
            ),
        ]);
        DocxDocument::from_package(package).unwrap()
    }

    /// A single-run paragraph
    pub fn paragraph(text: &str) -> String {
        format!(r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#, text)
    }

    /// A document with one plain paragraph per entry
    pub fn document_with_paragraphs(texts: &[&str]) -> DocxDocument {
        let body: String = texts.iter().map(|t| paragraph(t)).collect();
        document_from_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_paragraphs_skip_tables_and_section_properties() {
        let doc = document_from_body(&format!(
            "{}<w:tbl><w:tr><w:tc>{}</w:tc></w:tr></w:tbl>{}<w:sectPr/>",
            paragraph("一"),
            paragraph("cell"),
            paragraph("二")
        ));
        assert_eq!(doc.paragraph_texts(), vec!["一", "二"]);
        assert_eq!(doc.paragraph_count(), 2);
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut doc = document_with_paragraphs(&["a", "b"]);
        let x = xml::parse_fragment(&paragraph("x")).unwrap();
        let y = xml::parse_fragment(&paragraph("y")).unwrap();
        let z = xml::parse_fragment(&paragraph("z")).unwrap();

        doc.insert_paragraphs(1, Side::Before, vec![x]).unwrap();
        doc.insert_paragraphs(2, Side::After, vec![y, z]).unwrap();

        assert_eq!(doc.paragraph_texts(), vec!["a", "x", "b", "y", "z"]);
        assert!(matches!(
            doc.insert_paragraphs(9, Side::After, Vec::new()),
            Err(DocxError::ParagraphOutOfRange { index: 9, count: 5 })
        ));
    }

    #[test]
    fn test_page_geometry_reads_first_section() {
        let doc = document_from_body(&format!(
            r#"<w:p><w:pPr><w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:pPr></w:p>{}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#,
            paragraph("x")
        ));
        let geometry = doc.page_geometry().unwrap();
        assert_eq!(geometry.width_twips, Some(12240));
        assert!((geometry.width_cm().unwrap() - 21.59).abs() < 0.01);
    }

    #[test]
    fn test_set_page_geometry_creates_missing_section() {
        let mut doc = document_with_paragraphs(&["x"]);
        assert!(doc.page_geometry().is_none());

        doc.set_page_geometry(&PageGeometry {
            width_twips: Some(11909),
            height_twips: Some(16834),
            top_margin_twips: Some(1440),
            bottom_margin_twips: Some(1440),
            left_margin_twips: Some(1800),
            right_margin_twips: Some(1800),
        })
        .unwrap();

        let geometry = doc.page_geometry().unwrap();
        assert!((geometry.width_cm().unwrap() - 21.0).abs() < 0.05);
        assert!((geometry.height_cm().unwrap() - 29.7).abs() < 0.05);
        assert_eq!(geometry.left_margin_twips, Some(1800));
    }

    #[test]
    fn test_save_and_reopen_with_image() {
        let mut png = Vec::new();
        image::RgbaImage::new(40, 20)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let mut doc = document_with_paragraphs(&["图前"]);
        let (run, staged) = doc.image_run(png, "png", 5.0, "图1").unwrap();
        let mut p = XmlElement::new("w:p");
        p.push(run);
        doc.insert_paragraphs_with_image(0, Side::After, vec![p], staged).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.docx");
        doc.save(&path).unwrap();

        let reopened = DocxDocument::open(&path).unwrap();
        assert_eq!(reopened.paragraph_count(), 2);
        assert!(reopened.package().contains("word/media/patdoc_image1.png"));
        let types = String::from_utf8_lossy(reopened.package().part("[Content_Types].xml").unwrap()).into_owned();
        assert!(types.contains(r#"Extension="png""#));
        let rels = String::from_utf8_lossy(reopened.package().part("word/_rels/document.xml.rels").unwrap()).into_owned();
        assert!(rels.contains(r#"Id="rId1""#));
    }

    #[test]
    fn test_failed_image_insert_leaves_package_unchanged() {
        let mut doc = document_with_paragraphs(&["唯一段落"]);
        let before = doc.package().clone();

        let (run, staged) = doc.image_run(vec![0; 8], "png", 5.0, "图1").unwrap();
        let mut p = XmlElement::new("w:p");
        p.push(run);
        let result = doc.insert_paragraphs_with_image(5, Side::After, vec![p], staged);

        assert!(matches!(result, Err(DocxError::ParagraphOutOfRange { index: 5, count: 1 })));
        assert_eq!(doc.paragraph_count(), 1);
        assert!(!doc.package().contains("word/media/patdoc_image1.png"));
        assert_eq!(
            doc.package().part("word/_rels/document.xml.rels"),
            before.part("word/_rels/document.xml.rels")
        );
    }
}
