//! Weighted validation of a generated disclosure
//!
//! Six independent checks run over the body paragraphs. Each check kind has a
//! fixed weight; the score is the sum of the weights of passed checks. A run
//! passes with a score of at least 80 and no failed critical check.

use crate::config::FontConfig;
use crate::disclosure::{self, SECTIONS, SUBSECTIONS};
use crate::docx::{twips_to_cm, Alignment, DocxDocument, LineSpacing, Paragraph};
use crate::error::ConversionError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Minimum score for a passing document
pub const PASS_SCORE: u32 = 80;

const EXPECTED_LINE_SPACING: f64 = 1.5;
const LINE_SPACING_TOLERANCE: f64 = 0.1;
const EXPECTED_INDENT_CHARS: u32 = 2;
const FONT_SIZE_TOLERANCE_PT: f64 = 1.0;
const A4_WIDTH_CM: f64 = 21.0;
const A4_HEIGHT_CM: f64 = 29.7;
const PAGE_TOLERANCE_CM: f64 = 0.5;
const MAX_EMPTY_PARAGRAPHS: usize = 5;
const MIN_SECTION_CHARS: usize = 20;
const MAX_FONTS_PER_ROLE: usize = 2;

/// The six checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    SectionCompleteness,
    FontApplication,
    ParagraphFormatting,
    StyleConsistency,
    PageSetup,
    ContentQuality,
}

impl CheckKind {
    pub const ALL: [CheckKind; 6] = [
        CheckKind::SectionCompleteness,
        CheckKind::FontApplication,
        CheckKind::ParagraphFormatting,
        CheckKind::StyleConsistency,
        CheckKind::PageSetup,
        CheckKind::ContentQuality,
    ];

    pub fn weight(self) -> u32 {
        match self {
            CheckKind::SectionCompleteness => 30,
            CheckKind::FontApplication => 25,
            CheckKind::ParagraphFormatting => 20,
            CheckKind::StyleConsistency => 10,
            CheckKind::PageSetup => 5,
            CheckKind::ContentQuality => 10,
        }
    }

    /// A failed critical check blocks the pass regardless of score
    pub fn is_critical(self) -> bool {
        matches!(self, CheckKind::SectionCompleteness | CheckKind::FontApplication)
    }

    pub fn name(self) -> &'static str {
        match self {
            CheckKind::SectionCompleteness => "section_completeness",
            CheckKind::FontApplication => "font_application",
            CheckKind::ParagraphFormatting => "paragraph_formatting",
            CheckKind::StyleConsistency => "style_consistency",
            CheckKind::PageSetup => "page_setup",
            CheckKind::ContentQuality => "content_quality",
        }
    }

    fn recommendation(self) -> &'static str {
        match self {
            CheckKind::SectionCompleteness => "请补充缺失的章节内容",
            CheckKind::FontApplication => "请确保使用思源黑体 CN 字体，标题18pt，正文10pt",
            CheckKind::ParagraphFormatting => "请设置段落格式：行距1.5倍，两端对齐",
            CheckKind::StyleConsistency => "请统一文档中的字体和样式",
            CheckKind::PageSetup => "请将纸张大小设置为 A4",
            CheckKind::ContentQuality => "请检查并完善内容，删除不必要的空段落",
        }
    }

    fn critical_issue(self) -> Option<&'static str> {
        if !self.is_critical() {
            return None;
        }
        match self {
            CheckKind::SectionCompleteness => Some("章节不完整"),
            _ => Some("字体设置错误"),
        }
    }
}

/// Outcome of one check with its typed details
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult<D> {
    pub passed: bool,
    pub details: D,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionPresence {
    pub number: &'static str,
    pub title: &'static str,
    pub found: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsectionPresence {
    pub expected: usize,
    pub found: usize,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletenessDetails {
    pub expected_sections: usize,
    pub found_sections: usize,
    pub missing_sections: Vec<&'static str>,
    pub sections: Vec<SectionPresence>,
    pub section_4_subsections: SubsectionPresence,
}

/// First-run font sample of one role
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FontSample {
    pub passed: bool,
    pub font_name: Option<String>,
    pub font_size_pt: Option<f64>,
    pub is_bold: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontIssue {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontDetails {
    pub expected_font: String,
    pub title_font_check: FontSample,
    pub body_font_check: FontSample,
    pub font_issues: Vec<FontIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSpacingCheck {
    pub expected: f64,
    pub tolerance: f64,
    pub passed: bool,
    pub offending_paragraphs: usize,
}

/// First-line indents must not hang
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndentCheck {
    pub expected_chars: u32,
    pub passed: bool,
    pub offending_paragraphs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentCheck {
    pub expected: &'static str,
    pub passed: bool,
    pub offending_paragraphs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParagraphDetails {
    pub line_spacing_check: LineSpacingCheck,
    pub first_line_indent_check: IndentCheck,
    pub alignment_check: AlignmentCheck,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyDetails {
    pub title_fonts: Vec<Option<String>>,
    pub body_fonts: Vec<Option<String>>,
    pub title_style_consistent: bool,
    pub body_style_consistent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Margins {
    pub top: Option<String>,
    pub bottom: Option<String>,
    pub left: Option<String>,
    pub right: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDetails {
    pub paper_size: &'static str,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub margins: Margins,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortSection {
    pub section: &'static str,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentDetails {
    pub empty_paragraphs: usize,
    pub very_short_sections: Vec<ShortSection>,
    pub warnings: Vec<String>,
}

/// All six results, serialized under their check names
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checks {
    pub section_completeness: CheckResult<CompletenessDetails>,
    pub font_application: CheckResult<FontDetails>,
    pub paragraph_formatting: CheckResult<ParagraphDetails>,
    pub style_consistency: CheckResult<ConsistencyDetails>,
    pub page_setup: CheckResult<PageDetails>,
    pub content_quality: CheckResult<ContentDetails>,
}

impl Checks {
    pub fn passed(&self, kind: CheckKind) -> bool {
        match kind {
            CheckKind::SectionCompleteness => self.section_completeness.passed,
            CheckKind::FontApplication => self.font_application.passed,
            CheckKind::ParagraphFormatting => self.paragraph_formatting.passed,
            CheckKind::StyleConsistency => self.style_consistency.passed,
            CheckKind::PageSetup => self.page_setup.passed,
            CheckKind::ContentQuality => self.content_quality.passed,
        }
    }
}

/// Full validation report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub validation_passed: bool,
    pub validation_timestamp: String,
    pub overall_score: u32,
    pub checks: Checks,
    pub recommendations: Vec<&'static str>,
    pub critical_issues: Vec<&'static str>,
}

/// Sum of weights of the passed checks
pub fn score(passed: impl Fn(CheckKind) -> bool) -> u32 {
    CheckKind::ALL
        .iter()
        .filter(|kind| passed(**kind))
        .map(|kind| kind.weight())
        .sum()
}

/// Validate a .docx file on disk
pub fn validate_file(path: &Path, fonts: &FontConfig) -> Result<ValidationReport, ConversionError> {
    if !path.exists() {
        return Err(ConversionError::ValidationTargetMissing {
            path: path.to_path_buf(),
        });
    }
    let doc = DocxDocument::open(path)?;
    Ok(validate(&doc, fonts))
}

/// Run every check over a loaded document
pub fn validate(doc: &DocxDocument, fonts: &FontConfig) -> ValidationReport {
    let paragraphs = doc.paragraphs();
    let texts: Vec<String> = paragraphs.iter().map(|p| p.text().trim().to_string()).collect();

    let checks = Checks {
        section_completeness: check_section_completeness(&texts),
        font_application: check_font_application(&paragraphs, fonts),
        paragraph_formatting: check_paragraph_formatting(&paragraphs, &texts),
        style_consistency: check_style_consistency(&paragraphs),
        page_setup: check_page_setup(doc),
        content_quality: check_content_quality(&texts),
    };

    let overall_score = score(|kind| checks.passed(kind));
    let failed: Vec<CheckKind> = CheckKind::ALL
        .into_iter()
        .filter(|kind| !checks.passed(*kind))
        .collect();
    let recommendations = failed.iter().map(|kind| kind.recommendation()).collect();
    let critical_issues: Vec<&'static str> =
        failed.iter().filter_map(|kind| kind.critical_issue()).collect();

    let validation_passed = overall_score >= PASS_SCORE && critical_issues.is_empty();
    log::info!(
        "Validation score {}/100, passed: {}",
        overall_score,
        validation_passed
    );

    ValidationReport {
        validation_passed,
        validation_timestamp: chrono::Local::now().to_rfc3339(),
        overall_score,
        checks,
        recommendations,
        critical_issues,
    }
}

fn check_section_completeness(texts: &[String]) -> CheckResult<CompletenessDetails> {
    let found: BTreeSet<&'static str> = texts
        .iter()
        .filter_map(|t| disclosure::recognize_heading(t))
        .filter(|id| disclosure::is_top_level(id))
        .collect();

    let sections: Vec<SectionPresence> = SECTIONS
        .iter()
        .map(|spec| SectionPresence {
            number: spec.id,
            title: spec.title,
            found: found.contains(spec.id),
        })
        .collect();
    let missing_sections: Vec<&'static str> =
        sections.iter().filter(|s| !s.found).map(|s| s.number).collect();

    let markers: BTreeSet<u32> = texts
        .iter()
        .filter_map(|t| disclosure::subsection_marker(t))
        .filter(|k| SUBSECTIONS.iter().any(|spec| spec.ordinal == *k))
        .collect();
    let section_4_subsections = SubsectionPresence {
        expected: SUBSECTIONS.len(),
        found: markers.len(),
        complete: markers.len() == SUBSECTIONS.len(),
    };

    CheckResult {
        passed: missing_sections.is_empty() && section_4_subsections.complete,
        details: CompletenessDetails {
            expected_sections: SECTIONS.len(),
            found_sections: found.len(),
            missing_sections,
            sections,
            section_4_subsections,
        },
    }
}

fn sample(format: &crate::docx::RunFormat) -> FontSample {
    FontSample {
        passed: false,
        font_name: format.font.clone(),
        font_size_pt: format.size_pt,
        is_bold: format.bold,
    }
}

fn check_font_application(paragraphs: &[Paragraph<'_>], fonts: &FontConfig) -> CheckResult<FontDetails> {
    let mut title: Option<FontSample> = None;
    let mut body: Option<FontSample> = None;

    for paragraph in paragraphs {
        let Some(run) = paragraph.first_run() else {
            continue;
        };
        let format = run.format();
        if format.font.is_none() {
            continue;
        }
        if format.bold == Some(true) {
            title.get_or_insert_with(|| sample(&format));
        } else {
            body.get_or_insert_with(|| sample(&format));
        }
        if title.is_some() && body.is_some() {
            break;
        }
    }

    let matches = |s: &FontSample, size: f64, bold: bool| {
        s.font_name.as_deref().is_some_and(|name| name.contains(&fonts.family))
            && s.font_size_pt.is_some_and(|pt| (pt - size).abs() < FONT_SIZE_TOLERANCE_PT)
            && (s.is_bold == Some(true)) == bold
    };

    let mut title = title.unwrap_or_default();
    title.passed = matches(&title, fonts.title_size_pt, true);
    let mut body = body.unwrap_or_default();
    body.passed = matches(&body, fonts.body_size_pt, false);

    let describe = |s: &FontSample| {
        format!(
            "{}, {}pt",
            s.font_name.as_deref().unwrap_or("None"),
            s.font_size_pt.map_or_else(|| "None".to_string(), |pt| pt.to_string())
        )
    };
    let mut font_issues = Vec::new();
    if !title.passed {
        font_issues.push(FontIssue {
            kind: "title_font",
            expected: format!("{} Bold, {}pt", fonts.family, fonts.title_size_pt),
            actual: describe(&title),
        });
    }
    if !body.passed {
        font_issues.push(FontIssue {
            kind: "body_font",
            expected: format!("{} Normal, {}pt", fonts.family, fonts.body_size_pt),
            actual: describe(&body),
        });
    }

    CheckResult {
        passed: font_issues.is_empty(),
        details: FontDetails {
            expected_font: fonts.family.clone(),
            title_font_check: title,
            body_font_check: body,
            font_issues,
        },
    }
}

fn check_paragraph_formatting(
    paragraphs: &[Paragraph<'_>],
    texts: &[String],
) -> CheckResult<ParagraphDetails> {
    let mut bad_spacing = 0;
    let mut bad_indent = 0;
    let mut bad_alignment = 0;

    for (paragraph, text) in paragraphs.iter().zip(texts) {
        if text.is_empty() {
            continue;
        }
        let format = paragraph.format();

        let spacing_ok = match format.line_spacing {
            None => true,
            Some(LineSpacing::Multiple(m)) => {
                (m - EXPECTED_LINE_SPACING).abs() <= LINE_SPACING_TOLERANCE
            }
            Some(LineSpacing::Exact(_) | LineSpacing::AtLeast(_)) => false,
        };
        if !spacing_ok {
            bad_spacing += 1;
        }

        if format.first_line_indent_twips.is_some_and(|twips| twips < 0) {
            bad_indent += 1;
        }

        if !matches!(format.alignment, Some(Alignment::Justify | Alignment::Center)) {
            bad_alignment += 1;
        }
    }

    let line_spacing_check = LineSpacingCheck {
        expected: EXPECTED_LINE_SPACING,
        tolerance: LINE_SPACING_TOLERANCE,
        passed: bad_spacing == 0,
        offending_paragraphs: bad_spacing,
    };
    let first_line_indent_check = IndentCheck {
        expected_chars: EXPECTED_INDENT_CHARS,
        passed: bad_indent == 0,
        offending_paragraphs: bad_indent,
    };
    let alignment_check = AlignmentCheck {
        expected: "justify",
        passed: bad_alignment == 0,
        offending_paragraphs: bad_alignment,
    };

    CheckResult {
        passed: line_spacing_check.passed
            && first_line_indent_check.passed
            && alignment_check.passed,
        details: ParagraphDetails {
            line_spacing_check,
            first_line_indent_check,
            alignment_check,
        },
    }
}

fn check_style_consistency(paragraphs: &[Paragraph<'_>]) -> CheckResult<ConsistencyDetails> {
    let mut title_fonts: BTreeSet<Option<String>> = BTreeSet::new();
    let mut body_fonts: BTreeSet<Option<String>> = BTreeSet::new();

    for run in paragraphs.iter().filter_map(Paragraph::first_run) {
        let format = run.format();
        if format.bold == Some(true) {
            title_fonts.insert(format.font);
        } else {
            body_fonts.insert(format.font);
        }
    }

    let title_style_consistent = title_fonts.len() <= MAX_FONTS_PER_ROLE;
    let body_style_consistent = body_fonts.len() <= MAX_FONTS_PER_ROLE;

    CheckResult {
        passed: title_style_consistent && body_style_consistent,
        details: ConsistencyDetails {
            title_fonts: title_fonts.into_iter().collect(),
            body_fonts: body_fonts.into_iter().collect(),
            title_style_consistent,
            body_style_consistent,
        },
    }
}

fn check_page_setup(doc: &DocxDocument) -> CheckResult<PageDetails> {
    let geometry = doc.page_geometry().unwrap_or_default();
    let width_cm = geometry.width_cm();
    let height_cm = geometry.height_cm();

    let is_a4 = matches!(
        (width_cm, height_cm),
        (Some(w), Some(h)) if (w - A4_WIDTH_CM).abs() < PAGE_TOLERANCE_CM
            && (h - A4_HEIGHT_CM).abs() < PAGE_TOLERANCE_CM
    );
    let cm = |twips: Option<i64>| twips.map(|t| format!("{:.2}cm", twips_to_cm(t)));

    CheckResult {
        passed: is_a4,
        details: PageDetails {
            paper_size: if is_a4 { "A4" } else { "Other" },
            width_cm,
            height_cm,
            margins: Margins {
                top: cm(geometry.top_margin_twips),
                bottom: cm(geometry.bottom_margin_twips),
                left: cm(geometry.left_margin_twips),
                right: cm(geometry.right_margin_twips),
            },
        },
    }
}

fn check_content_quality(texts: &[String]) -> CheckResult<ContentDetails> {
    let empty_paragraphs = texts.iter().filter(|t| t.is_empty()).count();

    let mut very_short_sections = Vec::new();
    let mut current: Option<(&'static str, usize)> = None;
    let mut close = |section: Option<(&'static str, usize)>| {
        if let Some((id, length)) = section {
            if length < MIN_SECTION_CHARS {
                let title = disclosure::spec_for(id).map_or(id, |spec| spec.title);
                very_short_sections.push(ShortSection {
                    section: title,
                    length,
                });
            }
        }
    };

    for text in texts {
        match disclosure::recognize_heading(text).filter(|id| disclosure::is_top_level(id)) {
            Some(id) => {
                close(current.take());
                current = Some((id, 0));
            }
            None => {
                if let Some((_, length)) = current.as_mut() {
                    *length += text.chars().count();
                }
            }
        }
    }
    close(current.take());

    let mut warnings = Vec::new();
    if empty_paragraphs > MAX_EMPTY_PARAGRAPHS {
        warnings.push(format!("发现 {} 个空段落", empty_paragraphs));
    }
    if !very_short_sections.is_empty() {
        let names: Vec<&str> = very_short_sections.iter().map(|s| s.section).collect();
        warnings.push(format!("以下章节内容过短: {}", names.join("、")));
    }

    CheckResult {
        passed: warnings.is_empty(),
        details: ContentDetails {
            empty_paragraphs,
            very_short_sections,
            warnings,
        },
    }
}
