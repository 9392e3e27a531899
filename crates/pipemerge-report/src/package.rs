//! Spreadsheet packages (zip archives of XML parts) held in memory.
//!
//! Parts are kept in archive order and written back unchanged unless
//! replaced or removed.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{ReportError, Result};

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
}

/// All parts of an `.xlsx` package.
#[derive(Debug, Clone, Default)]
pub struct XlsxPackage {
    parts: Vec<Part>,
}

impl XlsxPackage {
    /// Load every part of the package at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| ReportError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|source| ReportError::Archive {
                path: path.to_path_buf(),
                source,
            })?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|source| ReportError::Archive {
                path: path.to_path_buf(),
                source,
            })?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|source| ReportError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })?;
            parts.push(Part { name, data });
        }
        Ok(Self { parts })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|part| part.name == name)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|part| part.name.as_str())
    }

    /// Part content as UTF-8 text.
    pub fn text(&self, name: &str) -> Result<String> {
        let part = self
            .parts
            .iter()
            .find(|part| part.name == name)
            .ok_or_else(|| ReportError::MissingPart {
                part: name.to_string(),
            })?;
        String::from_utf8(part.data.clone()).map_err(|e| ReportError::xml(name, e))
    }

    /// Part content as text, or `None` when the part does not exist.
    pub fn optional_text(&self, name: &str) -> Result<Option<String>> {
        if self.contains(name) {
            self.text(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Replace a part, or append it when new.
    pub fn set(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|part| part.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.parts.len();
        self.parts.retain(|part| part.name != name);
        self.parts.len() != before
    }

    /// Write the package to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let write_err = |source: std::io::Error| ReportError::FileWrite {
            path: path.to_path_buf(),
            source,
        };
        let archive_err = |source: zip::result::ZipError| ReportError::Archive {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(write_err)?;
        let mut zip_writer = ZipWriter::new(file);
        for part in &self.parts {
            zip_writer
                .start_file(part.name.as_str(), FileOptions::<()>::default())
                .map_err(archive_err)?;
            zip_writer.write_all(&part.data).map_err(write_err)?;
        }
        zip_writer.finish().map_err(archive_err)?;
        Ok(())
    }
}
