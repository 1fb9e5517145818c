//! Installed font discovery
//!
//! Font availability is decided from font file names found under the usual
//! per-platform font directories. No font files are opened.

use crate::config::FontConfig;
use crate::error::ConversionError;
use std::cell::OnceCell;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Release page for Source Han Sans
pub const SOURCE_HAN_SANS_URL: &str = "https://github.com/adobe-fonts/source-han-sans/releases";

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Availability of one configured font name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontStatus {
    pub role: &'static str,
    pub name: String,
    pub available: bool,
}

/// Looks up fonts by file name, caching the directory walk
#[derive(Debug)]
pub struct FontChecker {
    dirs: Vec<PathBuf>,
    installed: OnceCell<Vec<String>>,
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Font directories for the current platform
pub fn system_font_dirs() -> Vec<PathBuf> {
    let home = home_dir();
    let mut dirs = Vec::new();

    if cfg!(target_os = "windows") {
        let windir = std::env::var_os("WINDIR").map(PathBuf::from);
        dirs.push(windir.unwrap_or_else(|| PathBuf::from(r"C:\Windows")).join("Fonts"));
        if let Some(local) = std::env::var_os("LOCALAPPDATA") {
            dirs.push(PathBuf::from(local).join("Microsoft").join("Windows").join("Fonts"));
        }
    } else if cfg!(target_os = "macos") {
        dirs.push(PathBuf::from("/Library/Fonts"));
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        if let Some(home) = &home {
            dirs.push(home.join("Library").join("Fonts"));
        }
    } else {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(home) = &home {
            dirs.push(home.join(".fonts"));
            dirs.push(home.join(".local").join("share").join("fonts"));
        }
    }
    dirs
}

/// Lowercase with spaces, hyphens and underscores removed
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl FontChecker {
    /// Checker over the platform font directories
    pub fn system() -> Self {
        Self::with_dirs(system_font_dirs())
    }

    pub fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            installed: OnceCell::new(),
        }
    }

    /// File stems of every font file found, walked once
    pub fn installed_fonts(&self) -> &[String] {
        self.installed.get_or_init(|| {
            let mut fonts = Vec::new();
            for dir in self.dirs.iter().filter(|d| d.is_dir()) {
                for entry in WalkDir::new(dir).follow_links(true).into_iter().flatten() {
                    let path = entry.path();
                    let is_font = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
                    if !is_font {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        fonts.push(stem.to_string());
                    }
                }
            }
            log::debug!("Found {} installed font files", fonts.len());
            fonts
        })
    }

    /// Case, whitespace and hyphen insensitive substring match against file stems
    pub fn is_font_available(&self, name: &str) -> bool {
        let wanted = normalize(name);
        if wanted.is_empty() {
            return false;
        }
        self.installed_fonts()
            .iter()
            .any(|installed| normalize(installed).contains(&wanted))
    }

    /// True when the family or any of its aliases is installed
    pub fn is_family_available(&self, fonts: &FontConfig) -> bool {
        std::iter::once(&fonts.family)
            .chain(fonts.aliases.iter())
            .any(|name| self.is_font_available(name))
    }

    /// Status of the family and both faces
    ///
    /// A face counts as present when it matches by name or its family is installed.
    pub fn check(&self, fonts: &FontConfig) -> Vec<FontStatus> {
        let family = self.is_family_available(fonts);
        vec![
            FontStatus {
                role: "family",
                name: fonts.family.clone(),
                available: family,
            },
            FontStatus {
                role: "title",
                name: fonts.title.clone(),
                available: family || self.is_font_available(&fonts.title),
            },
            FontStatus {
                role: "body",
                name: fonts.body.clone(),
                available: family || self.is_font_available(&fonts.body),
            },
        ]
    }

    /// Fail with an install guide unless the configured family is installed
    pub fn ensure_available(&self, fonts: &FontConfig) -> Result<(), ConversionError> {
        if self.is_family_available(fonts) {
            log::info!("Font {} is available", fonts.family);
            Ok(())
        } else {
            Err(ConversionError::FontNotFound {
                font: fonts.family.clone(),
                install_guide: installation_guide(),
            })
        }
    }
}

/// How to install Source Han Sans on each platform
pub fn installation_guide() -> String {
    format!(
        r#"
思源黑体（Source Han Sans）字体安装指南
=====================================

1. 下载字体
   访问: {url}
   下载: SourceHanSansSC.zip (简体中文版本)

2. Windows 安装:
   - 解压下载的 ZIP 文件
   - 右键点击 OTF 或 TTF 文件，选择"为所有用户安装"
   - 或将字体文件复制到 C:\Windows\Fonts\

3. macOS 安装:
   - 双击字体文件并点击"安装字体"
   - 或将字体文件复制到 ~/Library/Fonts/

4. Linux 安装:
   - 复制字体文件到 ~/.fonts/ 或 /usr/share/fonts/
   - 运行: fc-cache -fv

5. 安装完成后重新运行 patdoc check-fonts 确认
"#,
        url = SOURCE_HAN_SANS_URL
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn checker_with(files: &[&str]) -> (tempfile::TempDir, FontChecker) {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("opentype").join("source-han");
        fs::create_dir_all(&nested).unwrap();
        for file in files {
            fs::write(nested.join(file), b"").unwrap();
        }
        let checker = FontChecker::with_dirs(vec![dir.path().to_path_buf()]);
        (dir, checker)
    }

    #[test]
    fn test_alias_matches_file_stem() {
        let (_dir, checker) = checker_with(&["SourceHanSansCN-Bold.otf", "readme.txt"]);
        assert_eq!(checker.installed_fonts(), &["SourceHanSansCN-Bold".to_string()]);
        assert!(checker.is_font_available("Source Han Sans CN"));
        assert!(checker.is_font_available("source-han-sans-cn bold"));
        assert!(!checker.is_font_available("Noto Serif"));
        assert!(checker.is_family_available(&FontConfig::default()));
        assert!(checker.ensure_available(&FontConfig::default()).is_ok());
    }

    #[test]
    fn test_missing_family_reports_install_guide() {
        let (_dir, checker) = checker_with(&["DejaVuSans.ttf"]);
        let statuses = checker.check(&FontConfig::default());
        assert!(statuses.iter().all(|s| !s.available));

        match checker.ensure_available(&FontConfig::default()) {
            Err(ConversionError::FontNotFound { install_guide, .. }) => {
                assert!(install_guide.contains(SOURCE_HAN_SANS_URL));
            }
            other => panic!("expected FontNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_directories_are_skipped() {
        let checker = FontChecker::with_dirs(vec![PathBuf::from("/nonexistent/fonts")]);
        assert!(checker.installed_fonts().is_empty());
        assert!(!checker.is_font_available(""));
    }
}
