//! Disclosure conversion pipeline
//!
//! The stages run as separate commands and hand over through files:
//! 1. **Parse**: Markdown disclosure → section model JSON
//! 2. **Generate**: section model + DOCX template → filled, formatted DOCX
//! 3. **Insert diagrams**: render Mermaid figures and place them in the DOCX
//! 4. **Validate**: score the DOCX against the formatting rules

use crate::config::Config;
use crate::diagrams::{self, InsertOptions, InsertionReport, MermaidCli};
use crate::docx::DocxDocument;
use crate::error::ConversionError;
use crate::filler;
use crate::fonts::{FontChecker, FontStatus};
use crate::section_model::{self, ParsedDisclosure};
use crate::template;
use crate::validator::{self, ValidationReport};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Write `value` as pretty-printed JSON, creating parent directories
///
/// # Parameters
/// * `path` - Destination file
/// * `value` - Any serializable report or model
///
/// # Returns
/// * `Ok(())` - The file was written
/// * `Err(ConversionError)` - Serialization or I/O failed
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConversionError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ConversionError::json(path, e))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConversionError::io(parent, e))?;
    }
    std::fs::write(path, json).map_err(|e| ConversionError::io(path, e))?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Stage 1: Parse the Markdown disclosure and write the section model
///
/// # Parameters
/// * `markdown` - Disclosure Markdown file
/// * `output` - Section model JSON to write
///
/// # Returns
/// * `Ok(ParsedDisclosure)` - The model that was written; incompleteness is
///   reported inside it, not raised
/// * `Err(ConversionError)` - The Markdown could not be read or the JSON written
pub fn parse(markdown: &Path, output: &Path) -> Result<ParsedDisclosure, ConversionError> {
    let parsed = section_model::parse_file(markdown)?;
    write_json(output, &parsed)?;
    log::info!(
        "Parsed {} sections into {}",
        parsed.sections.len(),
        output.display()
    );
    Ok(parsed)
}

/// Inputs of the generate stage
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Section model written by [`parse`]
    pub sections_json: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
    pub skip_font_check: bool,
    /// Optional path for the generation report
    pub report: Option<PathBuf>,
}

/// Font names applied by the formatting pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontApplied {
    pub title: String,
    pub body: String,
}

/// Counts reported after generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationStats {
    pub total_paragraphs: usize,
    pub sections_filled: usize,
    pub font_applied: FontApplied,
}

/// Result of the generate stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub success: bool,
    pub docx_path: String,
    pub generation_timestamp: String,
    pub stats: GenerationStats,
    pub warnings: Vec<String>,
}

/// Stage 2: Fill the template with the section model and format it
///
/// # Parameters
/// * `options` - Input and output paths
/// * `config` - Font settings used for styling and the font check
/// * `fonts` - Installed font lookup
///
/// # Returns
/// * `Ok(GenerationReport)` - The filled document was saved
/// * `Err(ConversionError)` - Missing template, missing font, unreadable JSON
///   or a DOCX failure
pub fn generate(
    options: &GenerateOptions,
    config: &Config,
    fonts: &FontChecker,
) -> Result<GenerationReport, ConversionError> {
    if !options.template.exists() {
        return Err(ConversionError::TemplateNotFound {
            path: options.template.clone(),
        });
    }

    if options.skip_font_check {
        log::info!("Skipping font check");
    } else {
        fonts.ensure_available(&config.fonts)?;
    }

    let parsed = section_model::load_json(&options.sections_json)?;
    let mut doc = DocxDocument::open(&options.template)?;

    let outcome = filler::fill(&mut doc, &parsed, &config.fonts)?;
    filler::format(&mut doc, &config.fonts)?;
    doc.save(&options.output)?;

    let report = GenerationReport {
        success: true,
        docx_path: options.output.display().to_string(),
        generation_timestamp: chrono::Local::now().to_rfc3339(),
        stats: GenerationStats {
            total_paragraphs: doc.paragraph_count(),
            sections_filled: outcome.filled_sections.len(),
            font_applied: FontApplied {
                title: config.fonts.title.clone(),
                body: config.fonts.body.clone(),
            },
        },
        warnings: outcome.warnings,
    };

    if let Some(path) = &options.report {
        write_json(path, &report)?;
    }
    Ok(report)
}

/// Stage 3: Render the disclosure's diagrams and insert them
///
/// # Returns
/// * `Ok(InsertionReport)` - Per-diagram outcomes; `success` is false when the
///   document could not be saved
/// * `Err(ConversionError)` - Renderer missing, no diagrams, or unreadable inputs
pub fn insert_diagrams(
    options: &InsertOptions,
    config: &Config,
    report: Option<&Path>,
) -> Result<InsertionReport, ConversionError> {
    let renderer = MermaidCli::new(&config.renderer);
    let result = diagrams::insert_all(options, &renderer, &config.fonts)?;
    if let Some(path) = report {
        write_json(path, &result)?;
    }
    Ok(result)
}

/// Stage 4: Validate a generated document and write the report
pub fn validate(
    docx: &Path,
    output: &Path,
    config: &Config,
) -> Result<ValidationReport, ConversionError> {
    let report = validator::validate_file(docx, &config.fonts)?;
    write_json(output, &report)?;
    log::info!(
        "Validation score {} written to {}",
        report.overall_score,
        output.display()
    );
    Ok(report)
}

/// Availability of every configured font
pub fn check_fonts(config: &Config, fonts: &FontChecker) -> Vec<FontStatus> {
    fonts.check(&config.fonts)
}

/// Write the blank disclosure template
pub fn template(output: &Path) -> Result<(), ConversionError> {
    template::write_template(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const DISCLOSURE: &str = "# 一种自组网方法
## **1. 发明创造名称**
一种基于邻居信息的无线自组网设备地址分配方法及系统
## **2. 所属技术领域**
本发明涉及无线通信技术领域，具体涉及自组网中的地址分配。
## **3. 相关的背景技术**
现有方案依赖中心服务器分配地址，单点故障会导致整个网络不可用。
## **4. 发明内容**
### **（1）解决的技术问题**
解决无中心网络中设备地址冲突和分配效率低的问题。
### **（2）技术方案**
设备上电后广播发现报文，根据邻居信息计算候选地址并进行冲突检测。

冲突时按退避算法重新选择地址，直至分配成功为止。
### **（3）有益效果**
无需中心服务器即可完成地址分配，提高了网络的可靠性和部署效率。
## **5. 具体实施方式**
以下结合具体实施例对地址分配的完整过程进行详细说明和描述。
## **6. 关键点和欲保护点**
基于邻居信息的候选地址计算方法以及冲突退避重选机制。
## **7. 其他有助于理解本技术的资料**
无线自组网相关的协议标准与公开文献资料，可供审查参考使用。
";

    #[test]
    fn test_parse_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let markdown = dir.path().join("disclosure.md");
        fs::write(&markdown, DISCLOSURE).unwrap();
        let output = dir.path().join("out").join("parsed_sections.json");

        let parsed = parse(&markdown, &output).unwrap();

        assert!(parsed.validation.is_complete);
        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains("发明创造名称"));
        assert_eq!(section_model::load_json(&output).unwrap(), parsed);
    }

    #[test]
    fn test_generate_then_validate_passes() {
        let dir = tempfile::tempdir().unwrap();
        let markdown = dir.path().join("disclosure.md");
        fs::write(&markdown, DISCLOSURE).unwrap();
        let json = dir.path().join("parsed_sections.json");
        parse(&markdown, &json).unwrap();

        let template_path = dir.path().join("template.docx");
        template(&template_path).unwrap();

        let options = GenerateOptions {
            sections_json: json,
            template: template_path,
            output: dir.path().join("disclosure.docx"),
            skip_font_check: true,
            report: Some(dir.path().join("generation_report.json")),
        };
        let config = Config::default();
        let fonts = FontChecker::with_dirs(Vec::new());
        let report = generate(&options, &config, &fonts).unwrap();

        assert!(report.success);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.generation_timestamp).is_ok());
        assert_eq!(report.stats.sections_filled, 9);
        assert!(report.warnings.is_empty());
        assert!(options.report.as_ref().unwrap().exists());

        let validation = validate(
            &options.output,
            &dir.path().join("validation_report.json"),
            &config,
        )
        .unwrap();
        assert_eq!(validation.overall_score, 100);
        assert!(chrono::DateTime::parse_from_rfc3339(&validation.validation_timestamp).is_ok());
        assert!(validation.validation_passed);
    }

    #[test]
    fn test_generate_requires_template_and_font() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = GenerateOptions {
            sections_json: dir.path().join("parsed_sections.json"),
            template: dir.path().join("missing.docx"),
            output: dir.path().join("out.docx"),
            skip_font_check: false,
            report: None,
        };
        let config = Config::default();
        let fonts = FontChecker::with_dirs(Vec::new());

        assert!(matches!(
            generate(&options, &config, &fonts),
            Err(ConversionError::TemplateNotFound { .. })
        ));

        options.template = dir.path().join("template.docx");
        template(&options.template).unwrap();
        assert!(matches!(
            generate(&options, &config, &fonts),
            Err(ConversionError::FontNotFound { .. })
        ));
    }
}
