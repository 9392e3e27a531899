//! CSV exports read as a positional grid.
//!
//! No header row is assumed: the raw header is located later by keyword
//! voting, exactly as for spreadsheet exports. Blank lines are kept as
//! empty rows, so row indexes match the spreadsheet view of the file.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use pipemerge_model::{CellValue, RawSheet};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Maximum file size for CSV loading (100 MB).
pub const MAX_CSV_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Read a CSV file; every field becomes a text value.
pub fn read_csv_sheet(path: &Path) -> Result<RawSheet> {
    check_file_size(path, MAX_CSV_FILE_SIZE)?;
    validate_encoding(path)?;

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut rows = Vec::new();
    let mut next_line = 1u64;
    for record in reader.records() {
        let record = record.map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        // The parser drops blank lines; keep them as empty rows so row
        // indexes stay physical.
        if let Some(position) = record.position() {
            let line = position.line();
            for _ in next_line..line {
                rows.push(Vec::new());
            }
            let embedded: usize = record.iter().map(|field| field.matches('\n').count()).sum();
            next_line = line + 1 + embedded as u64;
        }
        rows.push(record.iter().map(CellValue::text).collect());
    }

    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("csv")
        .to_string();
    debug!(path = %path.display(), rows = rows.len(), "read CSV export");
    Ok(RawSheet::new(name, rows))
}

fn check_file_size(path: &Path, max_size: u64) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    if metadata.len() > max_size {
        return Err(IngestError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size,
        });
    }
    Ok(())
}

/// Reject UTF-16 exports, which the CSV parser would read as garbage.
fn validate_encoding(path: &Path) -> Result<()> {
    let mut file = File::open(path).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut buffer = [0u8; 2];
    let bytes_read = file.read(&mut buffer).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    if bytes_read == 2 {
        let encoding = match buffer {
            [0xFF, 0xFE] => Some("UTF-16 LE"),
            [0xFE, 0xFF] => Some("UTF-16 BE"),
            _ => None,
        };
        if let Some(encoding) = encoding {
            return Err(IngestError::UnsupportedEncoding {
                path: path.to_path_buf(),
                encoding,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("create temp csv");
        file.write_all(contents).expect("write temp csv");
        file
    }

    #[test]
    fn test_reads_ragged_rows_without_headers() {
        let file = temp_file(b"Report title\nCapture Manager,Opportunity,SF ID\nSmith,Alpha,\"1,000\"\n");
        let sheet = read_csv_sheet(file.path()).expect("read csv");
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.cell(0, 0), &CellValue::text("Report title"));
        assert_eq!(sheet.cell(1, 1), &CellValue::text("Opportunity"));
        assert_eq!(sheet.cell(2, 2), &CellValue::text("1,000"));
    }

    #[test]
    fn test_blank_lines_keep_physical_rows() {
        let file = temp_file(
            b"Report title\n\n\nCapture Manager,Notes\nSmith,\"two\nlines\"\n\nJones,x\n",
        );
        let sheet = read_csv_sheet(file.path()).expect("read csv");
        assert_eq!(sheet.cell(0, 0), &CellValue::text("Report title"));
        assert!(sheet.row(1).is_some_and(<[CellValue]>::is_empty));
        assert!(sheet.row(2).is_some_and(<[CellValue]>::is_empty));
        assert_eq!(sheet.cell(3, 0), &CellValue::text("Capture Manager"));
        assert_eq!(sheet.cell(4, 1), &CellValue::text("two\nlines"));
        assert!(sheet.row(5).is_some_and(<[CellValue]>::is_empty));
        assert_eq!(sheet.cell(6, 0), &CellValue::text("Jones"));
        assert_eq!(sheet.row_count(), 7);
    }

    #[test]
    fn test_rejects_utf16() {
        let file = temp_file(&[0xFF, 0xFE, b'a', 0x00]);
        let err = read_csv_sheet(file.path()).expect_err("utf16 rejected");
        assert!(matches!(err, IngestError::UnsupportedEncoding { .. }));
    }
}
