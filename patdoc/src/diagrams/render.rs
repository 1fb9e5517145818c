//! Mermaid to PNG rendering through an external command

use crate::config::RendererConfig;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// Name of the scratch source file written next to the images
const TEMP_SOURCE: &str = "temp.mmd";

/// Errors that can occur while rendering one diagram
#[derive(Error, Debug)]
pub enum RenderError {
    /// The renderer could not be started
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The renderer ran and reported failure
    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// The renderer succeeded without producing the image
    #[error("Renderer produced no output at {0}")]
    MissingOutput(String),

    /// Writing the scratch source failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns diagram source into a PNG file
pub trait DiagramRenderer {
    /// Command name shown in messages
    fn name(&self) -> &str;

    /// Whether the renderer can run on this machine
    fn is_available(&self) -> bool;

    /// Render `source` into `output`, using `work_dir` for scratch files
    fn render(&self, source: &str, work_dir: &Path, output: &Path) -> Result<(), RenderError>;
}

/// The Mermaid CLI (`mmdc`)
#[derive(Debug, Clone)]
pub struct MermaidCli {
    command: String,
    background: String,
    scale: u32,
}

impl MermaidCli {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            command: config.command.clone(),
            background: config.background.clone(),
            scale: config.scale,
        }
    }

    fn run(&self, input: &Path, output: &Path) -> Result<(), RenderError> {
        let result = Command::new(&self.command)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .args(["-b", &self.background, "-s", &self.scale.to_string()])
            .output()
            .map_err(|source| RenderError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(RenderError::Failed {
                command: self.command.clone(),
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        if !output.exists() {
            return Err(RenderError::MissingOutput(output.display().to_string()));
        }
        Ok(())
    }
}

impl DiagramRenderer for MermaidCli {
    fn name(&self) -> &str {
        &self.command
    }

    fn is_available(&self) -> bool {
        match Command::new(&self.command).arg("--version").output() {
            Ok(output) if output.status.success() => {
                log::info!(
                    "Using {} {}",
                    self.command,
                    String::from_utf8_lossy(&output.stdout).trim()
                );
                true
            }
            Ok(output) => {
                log::warn!(
                    "{} --version failed with status {}: {}",
                    self.command,
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                );
                false
            }
            Err(e) => {
                log::warn!("Failed to execute {}: {}", self.command, e);
                false
            }
        }
    }

    fn render(&self, source: &str, work_dir: &Path, output: &Path) -> Result<(), RenderError> {
        std::fs::create_dir_all(work_dir)?;
        let input = work_dir.join(TEMP_SOURCE);
        std::fs::write(&input, source)?;

        let result = self.run(&input, output);

        if let Err(e) = std::fs::remove_file(&input) {
            log::warn!("Failed to remove {}: {}", input.display(), e);
        }
        result
    }
}
