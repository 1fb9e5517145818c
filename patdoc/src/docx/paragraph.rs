//! Paragraph and run views over `w:p` / `w:r` elements
//!
//! Reading follows Word's effective-direct-formatting model: only properties
//! written on the paragraph or run itself are reported, inherited style values
//! show up as `None`.

use super::xml::{XmlElement, XmlNode};

/// WordprocessingML paragraph property order (CT_PPrBase followed by CT_PPr extras)
const PPR_ORDER: &[&str] = &[
    "pStyle",
    "keepNext",
    "keepLines",
    "pageBreakBefore",
    "framePr",
    "widowControl",
    "numPr",
    "suppressLineNumbers",
    "pBdr",
    "shd",
    "tabs",
    "suppressAutoHyphens",
    "kinsoku",
    "wordWrap",
    "overflowPunct",
    "topLinePunct",
    "autoSpaceDE",
    "autoSpaceDN",
    "bidi",
    "adjustRightInd",
    "snapToGrid",
    "spacing",
    "ind",
    "contextualSpacing",
    "mirrorIndents",
    "suppressOverlap",
    "jc",
    "textDirection",
    "textAlignment",
    "textboxTightWrap",
    "outlineLvl",
    "divId",
    "cnfStyle",
    "rPr",
    "sectPr",
    "pPrChange",
];

/// WordprocessingML run property order (CT_RPr)
const RPR_ORDER: &[&str] = &[
    "rStyle",
    "rFonts",
    "b",
    "bCs",
    "i",
    "iCs",
    "caps",
    "smallCaps",
    "strike",
    "dstrike",
    "outline",
    "shadow",
    "emboss",
    "imprint",
    "noProof",
    "snapToGrid",
    "vanish",
    "webHidden",
    "color",
    "spacing",
    "w",
    "kern",
    "position",
    "sz",
    "szCs",
    "highlight",
    "u",
    "effect",
    "bdr",
    "shd",
    "fitText",
    "vertAlign",
    "rtl",
    "cs",
    "em",
    "lang",
    "eastAsianLayout",
    "specVanish",
    "oMath",
];

/// Twips per line in `w:spacing/@w:line` for single spacing
const LINE_UNITS_PER_LINE: f64 = 240.0;

/// Paragraph alignment (`w:jc`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Distribute,
}

impl Alignment {
    /// Parse a `w:jc/@w:val` value; unknown values yield `None`
    pub fn from_val(val: &str) -> Option<Self> {
        match val {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "both" => Some(Alignment::Justify),
            "distribute" => Some(Alignment::Distribute),
            _ => None,
        }
    }

    pub fn as_val(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
            Alignment::Distribute => "distribute",
        }
    }
}

/// Line spacing as Word stores it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSpacing {
    /// Multiple of single spacing (`lineRule="auto"`)
    Multiple(f64),
    /// Fixed height in points
    Exact(f64),
    /// Minimum height in points
    AtLeast(f64),
}

/// Direct paragraph formatting
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParagraphFormat {
    pub alignment: Option<Alignment>,
    pub line_spacing: Option<LineSpacing>,
    pub space_before_twips: Option<i64>,
    pub space_after_twips: Option<i64>,
    pub first_line_indent_twips: Option<i64>,
}

/// Direct run formatting
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunFormat {
    /// `w:rFonts/@w:ascii`
    pub font: Option<String>,
    /// `w:rFonts/@w:eastAsia`
    pub east_asia_font: Option<String>,
    pub size_pt: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
}

/// Run formatting to write onto a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunStyle {
    pub font: String,
    pub size_pt: f64,
    pub bold: bool,
    /// `None` leaves any existing italic setting alone
    pub italic: Option<bool>,
}

/// Paragraph formatting to write onto a paragraph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParagraphStyle {
    pub alignment: Alignment,
    /// Multiple of single line spacing
    pub line_spacing: f64,
    /// `None` removes any first-line indent
    pub first_line_indent_twips: Option<i64>,
    pub space_before_twips: Option<i64>,
    pub space_after_twips: Option<i64>,
}

/// Read-only view of a `w:p` element
#[derive(Debug, Clone, Copy)]
pub struct Paragraph<'a> {
    element: &'a XmlElement,
}

impl<'a> Paragraph<'a> {
    pub fn new(element: &'a XmlElement) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &'a XmlElement {
        self.element
    }

    /// Visible text of the paragraph's runs, including runs inside hyperlinks
    pub fn text(&self) -> String {
        let mut text = String::new();
        for child in self.element.elements() {
            match child.local_name() {
                "r" => push_run_text(child, &mut text),
                "hyperlink" | "ins" | "smartTag" => {
                    for run in child.children_named("r") {
                        push_run_text(run, &mut text);
                    }
                }
                _ => {}
            }
        }
        text
    }

    /// Direct `w:r` children
    pub fn runs(&self) -> Vec<Run<'a>> {
        self.element.children_named("r").map(Run::new).collect()
    }

    pub fn first_run(&self) -> Option<Run<'a>> {
        self.element.child("r").map(Run::new)
    }

    pub fn format(&self) -> ParagraphFormat {
        let Some(ppr) = self.element.child("pPr") else {
            return ParagraphFormat::default();
        };

        let alignment = ppr
            .child("jc")
            .and_then(|jc| jc.attr("val"))
            .and_then(Alignment::from_val);

        let spacing = ppr.child("spacing");
        let line_spacing = spacing.and_then(|s| {
            let line = s.attr("line")?.parse::<f64>().ok()?;
            Some(match s.attr("lineRule") {
                Some("exact") => LineSpacing::Exact(line / 20.0),
                Some("atLeast") => LineSpacing::AtLeast(line / 20.0),
                _ => LineSpacing::Multiple(line / LINE_UNITS_PER_LINE),
            })
        });
        let space_before_twips = spacing.and_then(|s| parse_int(s.attr("before")));
        let space_after_twips = spacing.and_then(|s| parse_int(s.attr("after")));

        let first_line_indent_twips = ppr.child("ind").and_then(|ind| {
            parse_int(ind.attr("firstLine")).or_else(|| parse_int(ind.attr("hanging")).map(|h| -h))
        });

        ParagraphFormat {
            alignment,
            line_spacing,
            space_before_twips,
            space_after_twips,
            first_line_indent_twips,
        }
    }
}

fn push_run_text(run: &XmlElement, out: &mut String) {
    for child in run.elements() {
        match child.local_name() {
            "t" => {
                for node in &child.children {
                    if let XmlNode::Text(text) | XmlNode::CData(text) = node {
                        out.push_str(text);
                    }
                }
            }
            "tab" => out.push('\t'),
            "br" | "cr" => out.push('\n'),
            _ => {}
        }
    }
}

fn parse_int(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.parse::<i64>().ok())
}

/// On/off property semantics: present without `w:val` means on
fn toggle(element: Option<&XmlElement>) -> Option<bool> {
    element.map(|e| !matches!(e.attr("val"), Some("0" | "false" | "off")))
}

/// Read-only view of a `w:r` element
#[derive(Debug, Clone, Copy)]
pub struct Run<'a> {
    element: &'a XmlElement,
}

impl<'a> Run<'a> {
    pub fn new(element: &'a XmlElement) -> Self {
        Self { element }
    }

    pub fn text(&self) -> String {
        let mut text = String::new();
        push_run_text(self.element, &mut text);
        text
    }

    pub fn format(&self) -> RunFormat {
        let Some(rpr) = self.element.child("rPr") else {
            return RunFormat::default();
        };

        let fonts = rpr.child("rFonts");
        RunFormat {
            font: fonts.and_then(|f| f.attr("ascii")).map(str::to_string),
            east_asia_font: fonts.and_then(|f| f.attr("eastAsia")).map(str::to_string),
            size_pt: rpr
                .child("sz")
                .and_then(|sz| sz.attr("val"))
                .and_then(|v| v.parse::<f64>().ok())
                .map(|half_points| half_points / 2.0),
            bold: toggle(rpr.child("b")),
            italic: toggle(rpr.child("i")),
        }
    }
}

/// Find or create the `w:{local}` child of `parent`, keeping schema order
fn ensure_child<'a>(parent: &'a mut XmlElement, local: &str, order: &[&str]) -> &'a mut XmlElement {
    let index = match parent.position_of(local) {
        Some(index) => index,
        None => {
            let rank = |name: &str| order.iter().position(|o| *o == name);
            let new_rank = rank(local);
            let at = parent
                .children
                .iter()
                .position(|node| match (node.as_element(), new_rank) {
                    (Some(e), Some(new_rank)) => rank(e.local_name()).is_some_and(|r| r > new_rank),
                    _ => false,
                })
                .unwrap_or(parent.children.len());
            parent
                .children
                .insert(at, XmlNode::Element(XmlElement::new(format!("w:{local}"))));
            at
        }
    };
    match &mut parent.children[index] {
        XmlNode::Element(element) => element,
        _ => unreachable!("position_of only returns element indices"),
    }
}

/// Find or create a property container that must be the first child (`w:pPr`, `w:rPr`)
fn ensure_leading_child<'a>(parent: &'a mut XmlElement, local: &str) -> &'a mut XmlElement {
    match parent.position_of(local) {
        Some(0) => {}
        Some(index) => {
            let node = parent.children.remove(index);
            parent.children.insert(0, node);
        }
        None => {
            parent
                .children
                .insert(0, XmlNode::Element(XmlElement::new(format!("w:{local}"))));
        }
    }
    match &mut parent.children[0] {
        XmlNode::Element(element) => element,
        _ => unreachable!("the leading child was just placed at index 0"),
    }
}

/// Remove everything but the paragraph properties
pub fn clear(paragraph: &mut XmlElement) {
    paragraph.children.retain(|node| node.is_element("pPr"));
}

/// Build a run holding `text`, translating `\n` to breaks and `\t` to tabs
pub fn build_run(text: &str, style: Option<&RunStyle>) -> XmlElement {
    let mut run = XmlElement::new("w:r");
    if let Some(style) = style {
        apply_run_style(&mut run, style);
    }

    let mut pending = String::new();
    let flush = |pending: &mut String, run: &mut XmlElement| {
        if !pending.is_empty() {
            let mut t = XmlElement::new("w:t").with_attr("xml:space", "preserve");
            t.children.push(XmlNode::Text(std::mem::take(pending)));
            run.push(t);
        }
    };

    for ch in text.chars() {
        match ch {
            '\n' => {
                flush(&mut pending, &mut run);
                run.push(XmlElement::new("w:br"));
            }
            '\t' => {
                flush(&mut pending, &mut run);
                run.push(XmlElement::new("w:tab"));
            }
            '\r' => {}
            other => pending.push(other),
        }
    }
    flush(&mut pending, &mut run);
    run
}

/// Append a run to the paragraph
pub fn add_run(paragraph: &mut XmlElement, text: &str, style: Option<&RunStyle>) {
    paragraph.push(build_run(text, style));
}

/// Write explicit fonts, size and weight onto a run
pub fn apply_run_style(run: &mut XmlElement, style: &RunStyle) {
    let rpr = ensure_leading_child(run, "rPr");

    let fonts = ensure_child(rpr, "rFonts", RPR_ORDER);
    for key in ["w:ascii", "w:hAnsi", "w:eastAsia", "w:cs"] {
        fonts.set_attr(key, style.font.as_str());
    }
    for theme in ["asciiTheme", "hAnsiTheme", "eastAsiaTheme", "cstheme"] {
        fonts.remove_attr(theme);
    }

    for local in ["b", "bCs"] {
        let element = ensure_child(rpr, local, RPR_ORDER);
        if style.bold {
            element.remove_attr("val");
        } else {
            element.set_attr("w:val", "0");
        }
    }

    match style.italic {
        Some(true) => {
            for local in ["i", "iCs"] {
                ensure_child(rpr, local, RPR_ORDER).remove_attr("val");
            }
        }
        Some(false) => {
            for local in ["i", "iCs"] {
                ensure_child(rpr, local, RPR_ORDER).set_attr("w:val", "0");
            }
        }
        None => {}
    }

    let half_points = (style.size_pt * 2.0).round() as i64;
    for local in ["sz", "szCs"] {
        ensure_child(rpr, local, RPR_ORDER).set_attr("w:val", half_points.to_string());
    }
}

/// Write alignment, line spacing, spacing and first-line indent
pub fn apply_paragraph_style(paragraph: &mut XmlElement, style: &ParagraphStyle) {
    let ppr = ensure_leading_child(paragraph, "pPr");

    {
        let spacing = ensure_child(ppr, "spacing", PPR_ORDER);
        let line = (style.line_spacing * LINE_UNITS_PER_LINE).round() as i64;
        spacing.set_attr("w:line", line.to_string());
        spacing.set_attr("w:lineRule", "auto");
        if let Some(before) = style.space_before_twips {
            spacing.set_attr("w:before", before.to_string());
            spacing.remove_attr("beforeLines");
            spacing.remove_attr("beforeAutospacing");
        }
        if let Some(after) = style.space_after_twips {
            spacing.set_attr("w:after", after.to_string());
            spacing.remove_attr("afterLines");
            spacing.remove_attr("afterAutospacing");
        }
    }

    match style.first_line_indent_twips {
        Some(indent) => {
            let ind = ensure_child(ppr, "ind", PPR_ORDER);
            ind.remove_attr("hanging");
            ind.remove_attr("hangingChars");
            ind.remove_attr("firstLineChars");
            ind.set_attr("w:firstLine", indent.to_string());
        }
        None => {
            if let Some(ind) = ppr.child_mut("ind") {
                for local in ["firstLine", "firstLineChars", "hanging", "hangingChars"] {
                    ind.remove_attr(local);
                }
            }
        }
    }

    ensure_child(ppr, "jc", PPR_ORDER).set_attr("w:val", style.alignment.as_val());
}

/// A fresh paragraph that copies the paragraph properties of `template`
pub fn sibling_with_properties(template: &XmlElement) -> XmlElement {
    let mut paragraph = XmlElement::new(template.name.clone());
    if let Some(ppr) = template.child("pPr") {
        let mut ppr = ppr.clone();
        // A copied section break would split the document
        ppr.remove_children("sectPr");
        paragraph.push(ppr);
    }
    paragraph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::xml::parse_fragment;

    fn paragraph(xml: &str) -> XmlElement {
        parse_fragment(xml).unwrap()
    }

    #[test]
    fn test_text_joins_runs_tabs_and_breaks() {
        let p = paragraph(
            r#"<w:p><w:r><w:t>一、</w:t><w:tab/><w:t>名称</w:t></w:r><w:hyperlink><w:r><w:t>链接</w:t></w:r></w:hyperlink><w:r><w:br/><w:t>下一行</w:t></w:r></w:p>"#,
        );
        assert_eq!(Paragraph::new(&p).text(), "一、\t名称链接\n下一行");
        assert_eq!(Paragraph::new(&p).runs().len(), 2);
    }

    #[test]
    fn test_format_reads_direct_properties() {
        let p = paragraph(
            r#"<w:p><w:pPr><w:spacing w:before="0" w:after="120" w:line="360" w:lineRule="auto"/><w:ind w:firstLine="360"/><w:jc w:val="both"/></w:pPr></w:p>"#,
        );
        let format = Paragraph::new(&p).format();
        assert_eq!(format.alignment, Some(Alignment::Justify));
        assert_eq!(format.line_spacing, Some(LineSpacing::Multiple(1.5)));
        assert_eq!(format.space_before_twips, Some(0));
        assert_eq!(format.space_after_twips, Some(120));
        assert_eq!(format.first_line_indent_twips, Some(360));

        let exact = paragraph(r#"<w:p><w:pPr><w:spacing w:line="480" w:lineRule="exact"/></w:pPr></w:p>"#);
        assert_eq!(
            Paragraph::new(&exact).format().line_spacing,
            Some(LineSpacing::Exact(24.0))
        );
        assert_eq!(Paragraph::new(&exact).format().alignment, None);
    }

    #[test]
    fn test_run_format_toggles_and_sizes() {
        let p = paragraph(
            r#"<w:p><w:r><w:rPr><w:rFonts w:ascii="思源黑体 CN Bold" w:eastAsia="思源黑体 CN Bold"/><w:b/><w:i w:val="0"/><w:sz w:val="36"/></w:rPr><w:t>标题</w:t></w:r><w:r><w:t>plain</w:t></w:r></w:p>"#,
        );
        let runs = Paragraph::new(&p).runs();

        let first = runs[0].format();
        assert_eq!(first.font.as_deref(), Some("思源黑体 CN Bold"));
        assert_eq!(first.east_asia_font.as_deref(), Some("思源黑体 CN Bold"));
        assert_eq!(first.size_pt, Some(18.0));
        assert_eq!(first.bold, Some(true));
        assert_eq!(first.italic, Some(false));

        assert_eq!(runs[1].format(), RunFormat::default());
    }

    #[test]
    fn test_apply_run_style_writes_ordered_properties() {
        let mut run = paragraph(
            r#"<w:r><w:rPr><w:rFonts w:asciiTheme="minorHAnsi" w:ascii="Calibri"/><w:sz w:val="24"/></w:rPr><w:t>x</w:t></w:r>"#,
        );
        apply_run_style(
            &mut run,
            &RunStyle {
                font: "思源黑体 CN Normal".to_string(),
                size_pt: 10.0,
                bold: false,
                italic: None,
            },
        );

        let rpr = run.child("rPr").unwrap();
        let order: Vec<&str> = rpr.elements().map(|e| e.local_name()).collect();
        assert_eq!(order, vec!["rFonts", "b", "bCs", "sz", "szCs"]);

        let fonts = rpr.child("rFonts").unwrap();
        assert_eq!(fonts.attr("asciiTheme"), None);
        assert_eq!(fonts.attr("cs"), Some("思源黑体 CN Normal"));

        let format = Run::new(&run).format();
        assert_eq!(format.size_pt, Some(10.0));
        assert_eq!(format.bold, Some(false));
    }

    #[test]
    fn test_apply_paragraph_style_places_properties_first() {
        let mut p = paragraph(
            r#"<w:p><w:r><w:t>x</w:t></w:r><w:pPr><w:pStyle w:val="Body"/><w:ind w:firstLineChars="200" w:firstLine="420"/></w:pPr></w:p>"#,
        );
        apply_paragraph_style(
            &mut p,
            &ParagraphStyle {
                alignment: Alignment::Justify,
                line_spacing: 1.5,
                first_line_indent_twips: None,
                space_before_twips: Some(0),
                space_after_twips: Some(0),
            },
        );

        let ppr = p.child("pPr").unwrap();
        let order: Vec<&str> = ppr.elements().map(|e| e.local_name()).collect();
        assert_eq!(order, vec!["pStyle", "spacing", "ind", "jc"]);

        let format = Paragraph::new(&p).format();
        assert_eq!(format.first_line_indent_twips, None);
        assert_eq!(format.line_spacing, Some(LineSpacing::Multiple(1.5)));
        assert_eq!(format.alignment, Some(Alignment::Justify));
    }

    #[test]
    fn test_clear_and_add_run() {
        let mut p = paragraph(
            r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>【请填写】</w:t></w:r><w:bookmarkStart w:id="0"/></w:p>"#,
        );
        clear(&mut p);
        assert_eq!(Paragraph::new(&p).text(), "");
        assert!(p.child("pPr").is_some());

        add_run(&mut p, "第一行\n第二行\t尾", None);
        assert_eq!(Paragraph::new(&p).text(), "第一行\n第二行\t尾");
        let run = p.child("r").unwrap();
        let kinds: Vec<&str> = run.elements().map(|e| e.local_name()).collect();
        assert_eq!(kinds, vec!["t", "br", "t", "tab", "t"]);
    }

    #[test]
    fn test_sibling_copies_properties_without_section_break() {
        let p = paragraph(
            r#"<w:p><w:pPr><w:jc w:val="both"/><w:sectPr/></w:pPr><w:r><w:t>x</w:t></w:r></w:p>"#,
        );
        let sibling = sibling_with_properties(&p);
        let ppr = sibling.child("pPr").unwrap();
        assert!(ppr.child("jc").is_some());
        assert!(ppr.child("sectPr").is_none());
        assert!(sibling.child("r").is_none());
    }
}
