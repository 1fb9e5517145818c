//! Command-line interface definitions for patdoc

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI structure for the patdoc application
#[derive(Parser)]
#[command(name = "patdoc")]
#[command(version)]
#[command(about = "Patent disclosure Markdown to DOCX converter", long_about = None)]
pub struct Cli {
    /// Log progress at info level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file for fonts, renderer and diagrams
    #[arg(short, long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for patdoc
#[derive(Subcommand)]
pub enum Commands {
    /// Parse a Markdown disclosure into a section model JSON
    Parse {
        /// Disclosure Markdown file
        markdown: PathBuf,

        /// Section model JSON to write
        #[arg(short, long, default_value = "parsed_sections.json")]
        output: PathBuf,
    },

    /// Fill a DOCX template with a section model and apply formatting
    Generate {
        /// Section model JSON written by `parse`
        json: PathBuf,

        /// DOCX template with section headings and 【...】 placeholders
        template: PathBuf,

        /// Output DOCX path
        #[arg(short, long, default_value = "output.docx")]
        output: PathBuf,

        /// Do not require the configured font to be installed
        #[arg(long)]
        skip_font_check: bool,

        /// Write a JSON generation report
        #[arg(long, value_name = "JSON")]
        report: Option<PathBuf>,
    },

    /// Score a generated DOCX against the formatting rules
    Validate {
        /// DOCX to validate
        docx: PathBuf,

        /// Validation report JSON to write
        #[arg(short, long, default_value = "validation_report.json")]
        output: PathBuf,
    },

    /// Render Mermaid diagrams and insert them into a DOCX
    InsertDiagrams {
        /// Disclosure Markdown containing the figure blocks
        markdown: PathBuf,

        /// DOCX to insert into
        docx: PathBuf,

        /// Diagram description file used when the Markdown has no figures
        description: PathBuf,

        /// Directory for the rendered images
        images_dir: PathBuf,

        /// Write the result here instead of modifying the DOCX in place
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write a JSON insertion report
        #[arg(long, value_name = "JSON")]
        report: Option<PathBuf>,
    },

    /// Check whether the configured fonts are installed
    CheckFonts,

    /// Write a blank disclosure template
    Template {
        /// Output DOCX path
        output: PathBuf,
    },
}
