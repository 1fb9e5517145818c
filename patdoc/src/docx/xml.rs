//! Lossless XML element tree for OOXML parts
//!
//! Parts are read into a small owned tree so that paragraphs can be moved,
//! cloned and rewritten without disturbing markup we do not understand.
//! Element and attribute names keep their prefixes (`w:p`, `w:val`); lookups
//! match on the local part.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// Errors raised while reading or writing XML parts
#[derive(Error, Debug)]
pub enum XmlError {
    /// The underlying reader rejected the input
    #[error("XML parsing error: {0}")]
    Parse(#[from] quick_xml::Error),

    /// An attribute could not be decoded
    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// Serialization failed
    #[error("XML write error: {0}")]
    Write(#[from] std::io::Error),

    /// Well-formed events that do not make a single-rooted tree
    #[error("Malformed XML: {0}")]
    Malformed(String),
}

/// A node in the element tree
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// True for an element whose local name is `local`
    pub fn is_element(&self, local: &str) -> bool {
        self.as_element().is_some_and(|e| e.local_name() == local)
    }
}

/// An element with its qualified name, attributes in source order, and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// Local part of a possibly prefixed name
pub fn local_part(name: &str) -> &str {
    name.split_once(':').map_or(name, |(_, local)| local)
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Attribute value by local name (`val` matches `w:val`)
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| local_part(key) == local)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute by qualified name, replacing any attribute with the same local name
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let local = local_part(key);
        match self
            .attributes
            .iter_mut()
            .find(|(existing, _)| local_part(existing) == local)
        {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Remove every attribute with the given local name
    pub fn remove_attr(&mut self, local: &str) {
        self.attributes.retain(|(key, _)| local_part(key) != local);
    }

    /// Iterate over child elements, skipping text and comments
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// First child element with the given local name
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.local_name() == local)
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.children
            .iter_mut()
            .filter_map(XmlNode::as_element_mut)
            .find(|e| e.local_name() == local)
    }

    /// All child elements with the given local name
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.local_name() == local)
    }

    /// Index in `children` of the first element with the given local name
    pub fn position_of(&self, local: &str) -> Option<usize> {
        self.children.iter().position(|n| n.is_element(local))
    }

    pub fn remove_children(&mut self, local: &str) {
        self.children.retain(|n| !n.is_element(local));
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Depth-first search for descendants with the given local name
    pub fn descendants<'a>(&'a self, local: &str, out: &mut Vec<&'a XmlElement>) {
        for child in self.elements() {
            if child.local_name() == local {
                out.push(child);
            }
            child.descendants(local, out);
        }
    }
}

/// Parse a complete XML part into its root element
pub fn parse(bytes: &[u8]) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => stack.push(element_from_start(e)?),
            Event::Empty(ref e) => {
                let element = element_from_start(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::Malformed("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XmlNode::Text(e.unescape()?.into_owned()));
                }
            }
            Event::CData(ref e) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XmlNode::CData(String::from_utf8_lossy(e).into_owned()));
                }
            }
            Event::Comment(ref e) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XmlNode::Comment(String::from_utf8_lossy(e).into_owned()));
                }
            }
            Event::Eof => break,
            // Declaration, processing instructions and doctype are regenerated or dropped
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(XmlError::Malformed(format!(
            "unclosed element <{}>",
            stack.last().map(|e| e.name.as_str()).unwrap_or_default()
        )));
    }

    root.ok_or_else(|| XmlError::Malformed("no root element".to_string()))
}

/// Parse a fragment that holds exactly one element and no declaration
pub fn parse_fragment(fragment: &str) -> Result<XmlElement, XmlError> {
    parse(fragment.as_bytes())
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlError::Malformed(format!(
            "second root element <{}>",
            element.name
        ))),
    }
}

/// Serialize a root element with a standalone UTF-8 declaration
pub fn write(root: &XmlElement) -> Result<Vec<u8>, XmlError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    write_element(&mut writer, root)?;
    Ok(writer.into_inner())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(inner) => write_element(writer, inner)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
            XmlNode::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_prefixes_whitespace_and_entities() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t xml:space="preserve"> a &amp; b </w:t></w:r></w:p><!--note--></w:body></w:document>"#;

        let root = parse(xml.as_bytes()).unwrap();
        assert_eq!(root.name, "w:document");
        assert_eq!(root.attr("w"), Some("urn:w"));

        let body = root.child("body").unwrap();
        let t = body.child("p").unwrap().child("r").unwrap().child("t").unwrap();
        assert_eq!(t.attr("space"), Some("preserve"));
        assert_eq!(t.children, vec![XmlNode::Text(" a & b ".to_string())]);
        assert!(matches!(body.children.last(), Some(XmlNode::Comment(c)) if c == "note"));
    }

    #[test]
    fn test_write_then_parse_preserves_tree() {
        let xml = r#"<w:document xmlns:w="urn:w"><w:body><w:p><w:pPr><w:jc w:val="both"/></w:pPr><w:r><w:t>x &lt; y</w:t></w:r></w:p></w:body></w:document>"#;
        let root = parse(xml.as_bytes()).unwrap();

        let bytes = write(&root).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
        assert!(text.contains("x &lt; y"));

        assert_eq!(parse(&bytes).unwrap(), root);
    }

    #[test]
    fn test_unbalanced_input_is_rejected() {
        assert!(parse(b"<a><b></b>").is_err());
        assert!(parse(b"").is_err());
    }

    #[test]
    fn test_set_attr_replaces_by_local_name() {
        let mut element = XmlElement::new("w:rFonts").with_attr("w:ascii", "Arial");
        element.set_attr("w:ascii", "思源黑体 CN Bold");
        element.set_attr("w:hAnsi", "思源黑体 CN Bold");
        assert_eq!(element.attributes.len(), 2);
        assert_eq!(element.attr("ascii"), Some("思源黑体 CN Bold"));

        element.remove_attr("ascii");
        assert_eq!(element.attr("ascii"), None);
    }
}
