//! Disclosure formatting rules: run styles, paragraph formats and page setup

use crate::config::FontConfig;
use crate::docx::{inches_to_twips, Alignment, PageGeometry, ParagraphStyle, RunStyle};

/// A4 width (8.27in)
pub const A4_WIDTH_INCHES: f64 = 8.27;
/// A4 height (11.69in)
pub const A4_HEIGHT_INCHES: f64 = 11.69;

/// Body line spacing multiple
pub const BODY_LINE_SPACING: f64 = 1.5;

/// First-line indent of body paragraphs
pub const BODY_FIRST_LINE_INDENT_INCHES: f64 = 0.25;

/// Diagram caption size in points
pub const CAPTION_SIZE_PT: f64 = 11.0;

/// Diagram description size in points
pub const DESCRIPTION_SIZE_PT: f64 = 9.0;

/// Bold title-face style for document titles and headings
pub fn title_style(fonts: &FontConfig) -> RunStyle {
    RunStyle {
        font: fonts.title.clone(),
        size_pt: fonts.title_size_pt,
        bold: true,
        italic: None,
    }
}

/// Regular body-face style
pub fn body_style(fonts: &FontConfig) -> RunStyle {
    RunStyle {
        font: fonts.body.clone(),
        size_pt: fonts.body_size_pt,
        bold: false,
        italic: None,
    }
}

/// Bold caption above an inserted diagram
pub fn caption_style(fonts: &FontConfig) -> RunStyle {
    RunStyle {
        font: fonts.title.clone(),
        size_pt: CAPTION_SIZE_PT,
        bold: true,
        italic: None,
    }
}

/// Italic description below an inserted diagram
pub fn description_style(fonts: &FontConfig) -> RunStyle {
    RunStyle {
        font: fonts.body.clone(),
        size_pt: DESCRIPTION_SIZE_PT,
        bold: false,
        italic: Some(true),
    }
}

/// Headings: justified, body spacing, no indent
pub fn heading_paragraph() -> ParagraphStyle {
    ParagraphStyle {
        alignment: Alignment::Justify,
        line_spacing: BODY_LINE_SPACING,
        first_line_indent_twips: None,
        space_before_twips: None,
        space_after_twips: None,
    }
}

/// Body text: justified, 1.5 spacing, 0.25in first-line indent, no extra spacing
pub fn body_paragraph() -> ParagraphStyle {
    ParagraphStyle {
        alignment: Alignment::Justify,
        line_spacing: BODY_LINE_SPACING,
        first_line_indent_twips: Some(inches_to_twips(BODY_FIRST_LINE_INDENT_INCHES)),
        space_before_twips: Some(0),
        space_after_twips: Some(0),
    }
}

/// Document title above the first section: centered, body spacing, no indent
pub fn title_paragraph() -> ParagraphStyle {
    ParagraphStyle {
        alignment: Alignment::Center,
        line_spacing: BODY_LINE_SPACING,
        first_line_indent_twips: None,
        space_before_twips: Some(0),
        space_after_twips: Some(0),
    }
}

/// Diagram with its caption: centered, body spacing, no indent
pub fn figure_paragraph() -> ParagraphStyle {
    title_paragraph()
}

/// Diagram description: justified body spacing without indent
pub fn description_paragraph() -> ParagraphStyle {
    ParagraphStyle {
        first_line_indent_twips: None,
        ..body_paragraph()
    }
}

/// A4 with patent margins: 1in top and bottom, 1.25in left and right
pub fn patent_page() -> PageGeometry {
    PageGeometry {
        width_twips: Some(inches_to_twips(A4_WIDTH_INCHES)),
        height_twips: Some(inches_to_twips(A4_HEIGHT_INCHES)),
        top_margin_twips: Some(inches_to_twips(1.0)),
        bottom_margin_twips: Some(inches_to_twips(1.0)),
        left_margin_twips: Some(inches_to_twips(1.25)),
        right_margin_twips: Some(inches_to_twips(1.25)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patent_page_twips() {
        let page = patent_page();
        assert_eq!(page.width_twips, Some(11909));
        assert_eq!(page.height_twips, Some(16834));
        assert_eq!(page.top_margin_twips, Some(1440));
        assert_eq!(page.left_margin_twips, Some(1800));
        assert!((page.width_cm().unwrap() - 21.0).abs() < 0.5);
        assert!((page.height_cm().unwrap() - 29.7).abs() < 0.5);
    }

    #[test]
    fn test_styles_follow_font_config() {
        let fonts = FontConfig::default();
        let title = title_style(&fonts);
        assert_eq!(title.font, "思源黑体 CN Bold");
        assert_eq!(title.size_pt, 18.0);
        assert!(title.bold);

        let body = body_style(&fonts);
        assert_eq!(body.font, "思源黑体 CN Normal");
        assert!(!body.bold);

        assert_eq!(body_paragraph().first_line_indent_twips, Some(360));
        assert_eq!(description_style(&fonts).italic, Some(true));
    }
}
