//! Error types for template workbook writing.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    // === File System Errors ===
    #[error("failed to read workbook {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write workbook {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Package Errors ===
    /// The file is not a readable spreadsheet package.
    #[error("invalid workbook archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("workbook is missing required part {part}")]
    MissingPart { part: String },

    #[error("sheet '{sheet}' not found in workbook (available: {available})")]
    SheetNotFound { sheet: String, available: String },

    /// A package part contains XML that could not be processed.
    #[error("malformed XML in {part}: {message}")]
    Xml { part: String, message: String },
}

impl ReportError {
    pub(crate) fn xml(part: &str, err: impl std::fmt::Display) -> Self {
        Self::Xml {
            part: part.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;
