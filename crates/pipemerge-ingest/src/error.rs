//! Error types for loading raw exports and report templates.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading spreadsheets.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Input file does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file exceeds the size limit.
    #[error("file {path} is too large ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    // === Workbook Errors ===
    /// Extension is not a spreadsheet or CSV format.
    #[error("unsupported file type '{extension}' for {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The spreadsheet library rejected the file.
    #[error("failed to open workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    /// Requested worksheet does not exist.
    #[error("sheet '{sheet}' not found in {path} (available: {available})")]
    SheetNotFound {
        path: PathBuf,
        sheet: String,
        available: String,
    },

    /// Workbook contains no worksheets.
    #[error("workbook {path} has no worksheets")]
    EmptyWorkbook { path: PathBuf },

    // === CSV Errors ===
    /// CSV content could not be parsed.
    #[error("failed to parse CSV {path}: {source}")]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// CSV encoding other than UTF-8.
    #[error("unsupported encoding {encoding} in {path}; save the file as UTF-8")]
    UnsupportedEncoding {
        path: PathBuf,
        encoding: &'static str,
    },

    // === Template Structure Errors ===
    /// The template cannot be used as a merge destination.
    #[error("invalid template {path}: {source}")]
    Structure {
        path: PathBuf,
        #[source]
        source: StructureError,
    },
}

/// Why a template header row could not be turned into column slots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("sheet '{sheet}' not found")]
    SheetNotFound { sheet: String },

    #[error("header row {row} is empty or missing")]
    HeaderRowMissing { row: u32 },

    #[error("header row {row} has no data columns")]
    NoDataSlots { row: u32 },
}

impl IngestError {
    /// True when the template itself is unusable (as opposed to an I/O problem).
    pub fn is_structure_error(&self) -> bool {
        matches!(self, Self::Structure { .. })
    }
}

/// Result type for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::SheetNotFound {
            path: PathBuf::from("report.xlsx"),
            sheet: "Pipeline".to_string(),
            available: "Sheet1, Data".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "sheet 'Pipeline' not found in report.xlsx (available: Sheet1, Data)"
        );
    }

    #[test]
    fn test_structure_error_display() {
        let err = IngestError::Structure {
            path: PathBuf::from("template.xlsx"),
            source: StructureError::NoDataSlots { row: 4 },
        };
        assert!(err.is_structure_error());
        assert_eq!(
            err.to_string(),
            "invalid template template.xlsx: header row 4 has no data columns"
        );
    }
}
