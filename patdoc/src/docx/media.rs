//! Embedded pictures: media parts, relationships, content types and drawing runs

use super::xml::{self, XmlElement};
use super::{DocxError, DocxPackage};

/// EMUs (English Metric Units) per inch - Word uses this for measurements
pub const EMUS_PER_INCH: i64 = 914400;

/// Aspect ratio used when the image header cannot be read
const FALLBACK_ASPECT_RATIO: f64 = 0.75;

pub(crate) const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const IMAGE_RELATIONSHIP_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Size of an inline picture in EMUs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub width_emu: i64,
    pub height_emu: i64,
}

impl Extent {
    /// Scale the image to `width_inches`, keeping the aspect ratio from its header
    pub fn for_width(bytes: &[u8], width_inches: f64) -> Self {
        let aspect_ratio = match imagesize::blob_size(bytes) {
            Ok(size) if size.width > 0 && size.height > 0 => size.height as f64 / size.width as f64,
            _ => {
                log::warn!("Could not read image dimensions, assuming 4:3");
                FALLBACK_ASPECT_RATIO
            }
        };
        let width_emu = (width_inches * EMUS_PER_INCH as f64) as i64;
        let height_emu = (width_inches * aspect_ratio * EMUS_PER_INCH as f64) as i64;
        Self {
            width_emu,
            height_emu,
        }
    }
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Package changes for one picture, computed without touching the package
#[derive(Debug, Clone)]
pub struct StagedImage {
    pub rel_id: String,
    parts: Vec<(String, Vec<u8>)>,
}

impl StagedImage {
    /// Write the media part, relationships and content types into `package`
    pub(crate) fn apply(self, package: &mut DocxPackage) {
        for (name, bytes) in self.parts {
            package.set_part(&name, bytes);
        }
        log::debug!("Embedded image as {}", self.rel_id);
    }
}

/// Prepare `bytes` as a new media part with its relationship and content type
pub(crate) fn stage_image_part(
    package: &DocxPackage,
    bytes: Vec<u8>,
    extension: &str,
) -> Result<StagedImage, DocxError> {
    let extension = extension.to_ascii_lowercase();
    let mut n = 1;
    let media_name = loop {
        let candidate = format!("media/patdoc_image{}.{}", n, extension);
        if !package.contains(&format!("word/{}", candidate)) {
            break candidate;
        }
        n += 1;
    };

    let mut rels = match package.part(DOCUMENT_RELS_PART) {
        Some(bytes) => xml::parse(bytes)?,
        None => XmlElement::new("Relationships").with_attr("xmlns", RELATIONSHIPS_NS),
    };
    let rel_id = add_relationship(&mut rels, IMAGE_RELATIONSHIP_TYPE, &media_name)?;

    let content_types_bytes = package
        .part(CONTENT_TYPES_PART)
        .ok_or_else(|| DocxError::MissingPart(CONTENT_TYPES_PART.to_string()))?;
    let mut content_types = xml::parse(content_types_bytes)?;
    ensure_default_content_type(&mut content_types, &extension)?;

    Ok(StagedImage {
        rel_id,
        parts: vec![
            (DOCUMENT_RELS_PART.to_string(), xml::write(&rels)?),
            (CONTENT_TYPES_PART.to_string(), xml::write(&content_types)?),
            (format!("word/{}", media_name), bytes),
        ],
    })
}

/// Name for a new child of `root` that uses the root's prefix, if any
fn child_name(root: &XmlElement, local: &str) -> String {
    match root.name.split_once(':') {
        Some((prefix, _)) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

fn expect_root(root: &XmlElement, local: &str, part: &str) -> Result<(), DocxError> {
    if root.local_name() == local {
        Ok(())
    } else {
        Err(DocxError::InvalidStructure(format!(
            "{} has root <{}>, expected <{}>",
            part, root.name, local
        )))
    }
}

/// Append a relationship with the next free `rIdN` and return that id
fn add_relationship(rels: &mut XmlElement, rel_type: &str, target: &str) -> Result<String, DocxError> {
    expect_root(rels, "Relationships", DOCUMENT_RELS_PART)?;

    let max_rid = rels
        .children_named("Relationship")
        .filter_map(|r| r.attr("Id")?.strip_prefix("rId")?.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    let rel_id = format!("rId{}", max_rid + 1);

    let relationship = XmlElement::new(child_name(rels, "Relationship"))
        .with_attr("Id", rel_id.as_str())
        .with_attr("Type", rel_type)
        .with_attr("Target", target);
    rels.push(relationship);
    Ok(rel_id)
}

/// Register a `Default` content type for `extension` unless one exists
fn ensure_default_content_type(types: &mut XmlElement, extension: &str) -> Result<(), DocxError> {
    expect_root(types, "Types", CONTENT_TYPES_PART)?;

    let registered = types
        .children_named("Default")
        .filter_map(|d| d.attr("Extension"))
        .any(|existing| existing.eq_ignore_ascii_case(extension));
    if !registered {
        let default = XmlElement::new(child_name(types, "Default"))
            .with_attr("Extension", extension)
            .with_attr("ContentType", content_type_for(extension));
        types.push(default);
    }
    Ok(())
}

/// Build a `w:r` holding an inline picture that references `rel_id`
pub(crate) fn drawing_run(
    rel_id: &str,
    extent: Extent,
    drawing_id: u32,
    description: &str,
) -> Result<XmlElement, DocxError> {
    let fragment = format!(
        r#"<w:r>
  <w:drawing>
    <wp:inline distT="0" distB="0" distL="0" distR="0" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">
      <wp:extent cx="{cx}" cy="{cy}"/>
      <wp:docPr id="{id}" name="Picture {id}" descr="{descr}"/>
      <a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
        <a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">
          <pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">
            <pic:nvPicPr>
              <pic:cNvPr id="{id}" name="Picture {id}"/>
              <pic:cNvPicPr/>
            </pic:nvPicPr>
            <pic:blipFill>
              <a:blip r:embed="{rel_id}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"/>
              <a:stretch><a:fillRect/></a:stretch>
            </pic:blipFill>
            <pic:spPr>
              <a:xfrm>
                <a:off x="0" y="0"/>
                <a:ext cx="{cx}" cy="{cy}"/>
              </a:xfrm>
              <a:prstGeom prst="rect"><a:avLst/></a:prstGeom>
            </pic:spPr>
          </pic:pic>
        </a:graphicData>
      </a:graphic>
    </wp:inline>
  </w:drawing>
</w:r>"#,
        cx = extent.width_emu,
        cy = extent.height_emu,
        id = drawing_id,
        descr = escape_attr(description),
        rel_id = rel_id,
    );

    let mut run = xml::parse_fragment(&fragment)?;
    strip_indentation(&mut run);
    Ok(run)
}

/// Drop whitespace-only text nodes introduced by the fragment layout
fn strip_indentation(element: &mut XmlElement) {
    element
        .children
        .retain(|node| !matches!(node, xml::XmlNode::Text(t) if t.trim().is_empty()));
    for child in element.children.iter_mut().filter_map(xml::XmlNode::as_element_mut) {
        strip_indentation(child);
    }
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_relationship_uses_next_free_id() {
        let mut rels = xml::parse_fragment(
            r#"<Relationships xmlns="x"><Relationship Id='rId3' Type="t" Target="styles.xml"/><Relationship Id="rId12" Type="t" Target="theme.xml"/><Relationship Id="custom" Type="t" Target="a.xml"/></Relationships>"#,
        )
        .unwrap();
        let rel_id = add_relationship(&mut rels, IMAGE_RELATIONSHIP_TYPE, "media/a.png").unwrap();

        assert_eq!(rel_id, "rId13");
        let added = rels.elements().last().unwrap();
        assert_eq!(added.name, "Relationship");
        assert_eq!(added.attr("Target"), Some("media/a.png"));
        assert_eq!(added.attr("Type"), Some(IMAGE_RELATIONSHIP_TYPE));
    }

    #[test]
    fn test_add_relationship_to_self_closing_root() {
        let mut rels = xml::parse_fragment(r#"<pr:Relationships xmlns:pr="x"/>"#).unwrap();
        let rel_id = add_relationship(&mut rels, IMAGE_RELATIONSHIP_TYPE, "media/a.png").unwrap();

        assert_eq!(rel_id, "rId1");
        assert_eq!(rels.elements().next().unwrap().name, "pr:Relationship");
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let mut other = xml::parse_fragment("<Other/>").unwrap();
        assert!(matches!(
            add_relationship(&mut other, IMAGE_RELATIONSHIP_TYPE, "media/a.png"),
            Err(DocxError::InvalidStructure(_))
        ));
        assert!(matches!(
            ensure_default_content_type(&mut other, "png"),
            Err(DocxError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_content_type_default_added_once_ignoring_case() {
        let mut types = xml::parse_fragment(
            r#"<Types xmlns="x"><Default Extension="xml" ContentType="application/xml"/></Types>"#,
        )
        .unwrap();
        ensure_default_content_type(&mut types, "png").unwrap();
        ensure_default_content_type(&mut types, "png").unwrap();
        assert_eq!(types.children_named("Default").count(), 2);
        let png = types.children_named("Default").last().unwrap();
        assert_eq!(png.attr("ContentType"), Some("image/png"));

        let mut upper = xml::parse_fragment(
            r#"<Types xmlns="x"><Default Extension="PNG" ContentType="image/png"/></Types>"#,
        )
        .unwrap();
        ensure_default_content_type(&mut upper, "png").unwrap();
        assert_eq!(upper.children_named("Default").count(), 1);
    }

    #[test]
    fn test_staging_leaves_package_untouched_until_applied() {
        let doc = crate::docx::test_support::document_with_paragraphs(&["x"]);
        let mut package = doc.package().clone();
        let rels_before = package.part(DOCUMENT_RELS_PART).unwrap().to_vec();

        let staged = stage_image_part(&package, vec![1, 2, 3], "PNG").unwrap();
        assert_eq!(staged.rel_id, "rId1");
        assert!(!package.contains("word/media/patdoc_image1.png"));
        assert_eq!(package.part(DOCUMENT_RELS_PART).unwrap(), rels_before.as_slice());

        staged.apply(&mut package);
        assert_eq!(package.part("word/media/patdoc_image1.png"), Some(&[1u8, 2, 3][..]));
        let rels = xml::parse(package.part(DOCUMENT_RELS_PART).unwrap()).unwrap();
        assert_eq!(rels.child("Relationship").and_then(|r| r.attr("Id")), Some("rId1"));
        let types = xml::parse(package.part(CONTENT_TYPES_PART).unwrap()).unwrap();
        assert!(types
            .children_named("Default")
            .any(|d| d.attr("Extension") == Some("png")));
    }

    #[test]
    fn test_extent_keeps_aspect_ratio() {
        let mut png = Vec::new();
        image::RgbaImage::new(200, 100)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let extent = Extent::for_width(&png, 5.0);
        assert_eq!(extent.width_emu, 5 * EMUS_PER_INCH);
        assert_eq!(extent.height_emu, 5 * EMUS_PER_INCH / 2);
    }

    #[test]
    fn test_drawing_run_references_relationship() {
        let run = drawing_run(
            "rId7",
            Extent {
                width_emu: 100,
                height_emu: 50,
            },
            3,
            "图1 \"系统\"",
        )
        .unwrap();

        assert_eq!(run.name, "w:r");
        let mut blips = Vec::new();
        run.descendants("blip", &mut blips);
        assert_eq!(blips[0].attr("embed"), Some("rId7"));

        let mut doc_prs = Vec::new();
        run.descendants("docPr", &mut doc_prs);
        assert_eq!(doc_prs[0].attr("id"), Some("3"));
        assert_eq!(doc_prs[0].attr("descr"), Some("图1 \"系统\""));
    }
}
