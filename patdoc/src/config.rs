//! Tool configuration from an optional patdoc.toml
//!
//! Every field has a default, so a missing file or a partial file both work.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fonts applied by the generator and expected by the validator
    pub fonts: FontConfig,

    /// External diagram renderer invocation
    pub renderer: RendererConfig,

    /// Diagram placement settings
    pub diagrams: DiagramConfig,
}

/// Font family names and sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Family name every styled run must belong to
    pub family: String,

    /// Face used for titles and headings
    pub title: String,

    /// Face used for body text
    pub body: String,

    /// Title size in points
    pub title_size_pt: f64,

    /// Body size in points
    pub body_size_pt: f64,

    /// Alternative names the family may be installed under
    pub aliases: Vec<String>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "思源黑体 CN".to_string(),
            title: "思源黑体 CN Bold".to_string(),
            body: "思源黑体 CN Normal".to_string(),
            title_size_pt: 18.0,
            body_size_pt: 10.0,
            aliases: vec![
                "Source Han Sans CN".to_string(),
                "SourceHanSansCN".to_string(),
                "Source Han Sans SC".to_string(),
                "SourceHanSansSC".to_string(),
            ],
        }
    }
}

/// Mermaid CLI settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Executable name or path
    pub command: String,

    /// Background color passed with `-b`
    pub background: String,

    /// Scale factor passed with `-s`
    pub scale: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: "mmdc".to_string(),
            background: "transparent".to_string(),
            scale: 2,
        }
    }
}

/// Diagram embedding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    /// Width of inserted diagrams in inches
    pub image_width_inches: f64,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            image_width_inches: 5.0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Parameters
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` - Parsed configuration with defaults filled in
    /// * `Err(ConfigError)` - Error reading or parsing the file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(ConfigError::IoError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum ConfigError {
    /// IO error when reading the file
    #[error("Config IO error: {0}")]
    IoError(std::io::Error),

    /// Error parsing TOML
    #[error("Config TOML parse error: {0}")]
    ParseError(toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_disclosure_fonts() {
        let config = Config::default();
        assert_eq!(config.fonts.family, "思源黑体 CN");
        assert_eq!(config.fonts.title_size_pt, 18.0);
        assert_eq!(config.fonts.body_size_pt, 10.0);
        assert_eq!(config.renderer.command, "mmdc");
        assert_eq!(config.renderer.scale, 2);
        assert_eq!(config.diagrams.image_width_inches, 5.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_content = r#"
[renderer]
command = "/opt/node/bin/mmdc"

[fonts]
body_size_pt = 10.5
"#;

        let config: Config = toml::from_str(toml_content).unwrap();

        assert_eq!(config.renderer.command, "/opt/node/bin/mmdc");
        assert_eq!(config.renderer.background, "transparent");
        assert_eq!(config.fonts.body_size_pt, 10.5);
        assert_eq!(config.fonts.title, "思源黑体 CN Bold");
        assert_eq!(config.diagrams, DiagramConfig::default());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = Config::load("/definitely/not/here/patdoc.toml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
