//! patdoc - Patent disclosure conversion tool
//!
//! A CLI tool that turns a Markdown patent disclosure (技术交底书) into a
//! formatted DOCX document, inserts its Mermaid diagrams and validates the
//! result.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::pedantic))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(missing_docs))]
// Allow some pedantic lints that are too strict for this project
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(dead_code)]

mod cli;
mod config;
mod diagrams;
mod disclosure;
mod docx;
mod error;
mod filler;
mod fonts;
mod formatting;
mod pipeline;
mod section_model;
mod template;
mod validator;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use diagrams::InsertOptions;
use fonts::FontChecker;
use itertools::Itertools;
use pipeline::GenerateOptions;
use std::path::{Path, PathBuf};

/// Main entry point for the patdoc CLI application
fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

/// Run the CLI application
fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = Config::load_or_default(cli.config.as_deref()).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            cli.config
                .as_deref()
                .map_or_else(|| "<default>".to_string(), |p| p.display().to_string())
        )
    })?;

    match cli.command {
        Commands::Parse { markdown, output } => {
            handle_parse_command(&markdown, &output)?;
        }

        Commands::Generate {
            json,
            template,
            output,
            skip_font_check,
            report,
        } => {
            let options = GenerateOptions {
                sections_json: json,
                template,
                output,
                skip_font_check,
                report,
            };
            handle_generate_command(&options, &config)?;
        }

        Commands::Validate { docx, output } => {
            handle_validate_command(&docx, &output, &config)?;
        }

        Commands::InsertDiagrams {
            markdown,
            docx,
            description,
            images_dir,
            output,
            report,
        } => {
            let options = InsertOptions {
                output: output.unwrap_or_else(|| docx.clone()),
                markdown,
                docx,
                description,
                images_dir,
                image_width_inches: config.diagrams.image_width_inches,
            };
            handle_insert_diagrams_command(&options, &config, report)?;
        }

        Commands::CheckFonts => {
            handle_check_fonts_command(&config)?;
        }

        Commands::Template { output } => {
            pipeline::template(&output)
                .with_context(|| format!("Failed to write template {}", output.display()))?;
            println!("✓ Wrote template: {}", output.display());
        }
    }

    Ok(())
}

/// Handle the parse command
fn handle_parse_command(markdown: &Path, output: &Path) -> Result<()> {
    let parsed = pipeline::parse(markdown, output)
        .with_context(|| format!("Failed to parse {}", markdown.display()))?;

    println!("✓ Parsed: {}", output.display());
    println!("  Title: {}", parsed.title);
    println!("  Sections: {}", parsed.sections.len());

    let validation = &parsed.validation;
    if validation.is_complete {
        println!("✓ All required sections present");
    } else {
        println!("⚠ Section check found problems:");
        if !validation.missing_sections.is_empty() {
            println!("  Missing sections: {}", validation.missing_sections.iter().join(", "));
        }
        if !validation.missing_subsections.is_empty() {
            println!(
                "  Missing subsections: {}",
                validation.missing_subsections.iter().join(", ")
            );
        }
    }
    Ok(())
}

/// Handle the generate command
fn handle_generate_command(options: &GenerateOptions, config: &Config) -> Result<()> {
    let fonts = FontChecker::system();
    let report = pipeline::generate(options, config, &fonts).with_context(|| {
        format!(
            "Failed to generate {} from {}",
            options.output.display(),
            options.template.display()
        )
    })?;

    println!("✓ Generated: {}", report.docx_path);
    println!("  Paragraphs: {}", report.stats.total_paragraphs);
    println!("  Sections filled: {}", report.stats.sections_filled);
    println!("  Title font: {}", report.stats.font_applied.title);
    println!("  Body font: {}", report.stats.font_applied.body);
    for warning in &report.warnings {
        println!("⚠ {}", warning);
    }
    Ok(())
}

/// Handle the validate command
fn handle_validate_command(docx: &Path, output: &Path, config: &Config) -> Result<()> {
    let report = pipeline::validate(docx, output, config)
        .with_context(|| format!("Failed to validate {}", docx.display()))?;

    println!("✓ Report written: {}", output.display());
    println!("  Passed: {}", report.validation_passed);
    println!("  Score: {}/100", report.overall_score);
    if !report.recommendations.is_empty() {
        println!("\nRecommendations:");
        for recommendation in &report.recommendations {
            println!("  - {}", recommendation);
        }
    }
    if !report.critical_issues.is_empty() {
        println!("\nCritical issues:");
        for issue in &report.critical_issues {
            println!("  - {}", issue);
        }
    }
    Ok(())
}

/// Handle the insert-diagrams command
fn handle_insert_diagrams_command(
    options: &InsertOptions,
    config: &Config,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let report = pipeline::insert_diagrams(options, config, report_path.as_deref())
        .with_context(|| format!("Failed to insert diagrams into {}", options.docx.display()))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize insertion report")?
    );
    if let Some(path) = &report_path {
        println!("\nReport written: {}", path.display());
    }

    if !report.success {
        anyhow::bail!("Failed to save {}", options.output.display());
    }
    Ok(())
}

/// Handle the check-fonts command
fn handle_check_fonts_command(config: &Config) -> Result<()> {
    let fonts = FontChecker::system();
    let statuses = pipeline::check_fonts(config, &fonts);

    for status in &statuses {
        let mark = if status.available { "✓" } else { "✗" };
        println!("{} {} ({})", mark, status.name, status.role);
    }

    if statuses.iter().all(|s| s.available) {
        println!("\n✓ All configured fonts are installed");
    } else {
        println!("{}", fonts::installation_guide());
    }
    Ok(())
}
