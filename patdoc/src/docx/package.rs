//! DOCX package (ZIP archive) held in memory as ordered parts

use super::DocxError;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::read::ZipArchive;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// All parts of a package in archive order
#[derive(Debug, Clone, Default)]
pub struct DocxPackage {
    parts: Vec<(String, Vec<u8>)>,
}

impl DocxPackage {
    /// Read every file of the archive at `path`
    pub fn open(path: &Path) -> Result<Self, DocxError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut parts = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            parts.push((name, contents));
        }

        log::debug!("Read DOCX package with {} parts", parts.len());
        Ok(Self { parts })
    }

    pub fn from_parts(parts: Vec<(String, Vec<u8>)>) -> Self {
        Self { parts }
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    /// Replace a part, or append it when it does not exist yet
    pub fn set_part(&mut self, name: &str, bytes: Vec<u8>) {
        match self.parts.iter_mut().find(|(existing, _)| existing == name) {
            Some(slot) => slot.1 = bytes,
            None => self.parts.push((name.to_string(), bytes)),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    /// Write the package to `path`, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<(), DocxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        // Serialize fully before touching the target so a failure never truncates it
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for (name, contents) in &self.parts {
            let method = if name.starts_with("word/media/") {
                // Images don't compress well
                zip::CompressionMethod::Stored
            } else {
                zip::CompressionMethod::Deflated
            };
            let options = SimpleFileOptions::default().compression_method(method);
            zip.start_file(name.as_str(), options)?;
            zip.write_all(contents)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}
