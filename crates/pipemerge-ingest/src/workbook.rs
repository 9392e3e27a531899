//! Spreadsheet reading (values only) into positional grids.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::NaiveDate;
use pipemerge_model::{CellValue, RawSheet};
use tracing::debug;

use crate::csv::read_csv_sheet;
use crate::error::{IngestError, Result};

/// Extensions read through the spreadsheet backend.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Kind of file behind a raw export path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Workbook,
    Csv,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if extension == "csv" {
            Ok(Self::Csv)
        } else if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
            Ok(Self::Workbook)
        } else {
            Err(IngestError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            })
        }
    }
}

/// Read the sheet of interest from a raw export.
///
/// Spreadsheets use `sheet` when given, otherwise their first worksheet.
/// CSV files ignore `sheet`.
pub fn read_raw_sheet(path: &Path, sheet: Option<&str>) -> Result<RawSheet> {
    ensure_exists(path)?;
    match SourceFormat::from_path(path)? {
        SourceFormat::Csv => read_csv_sheet(path),
        SourceFormat::Workbook => read_workbook_sheet(path, sheet),
    }
}

/// Read one worksheet of a spreadsheet file.
pub fn read_workbook_sheet(path: &Path, sheet: Option<&str>) -> Result<RawSheet> {
    ensure_exists(path)?;
    let mut workbook = open_workbook_auto(path).map_err(|e| IngestError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let names = workbook.sheet_names();
    let name = match sheet {
        Some(requested) => names
            .iter()
            .find(|name| name.as_str() == requested)
            .or_else(|| {
                names
                    .iter()
                    .find(|name| name.trim().eq_ignore_ascii_case(requested.trim()))
            })
            .cloned()
            .ok_or_else(|| IngestError::SheetNotFound {
                path: path.to_path_buf(),
                sheet: requested.to_string(),
                available: names.join(", "),
            })?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| IngestError::EmptyWorkbook {
                path: path.to_path_buf(),
            })?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| IngestError::Workbook {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let rows = range_to_grid(&range);
    debug!(
        path = %path.display(),
        sheet = %name,
        rows = rows.len(),
        "read worksheet"
    );
    Ok(RawSheet::new(name, rows))
}

/// List the worksheet names of a spreadsheet file.
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    ensure_exists(path)?;
    let workbook = open_workbook_auto(path).map_err(|e| IngestError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(workbook.sheet_names())
}

/// Convert a range into a grid anchored at A1.
///
/// The backend trims leading empty rows and columns; they are restored so
/// grid coordinates equal physical sheet coordinates.
fn range_to_grid(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let mut grid: Vec<Vec<CellValue>> = vec![Vec::new(); start_row as usize];
    for cells in range.rows() {
        let mut row = vec![CellValue::Empty; start_col as usize];
        row.extend(cells.iter().map(data_to_value));
        grid.push(row);
    }
    grid
}

/// Convert one backend cell into a [`CellValue`].
pub fn data_to_value(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(text) => CellValue::text(text.as_str()),
        Data::Float(value) => CellValue::Number(*value),
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) if !value.is_duration() => CellValue::Date(datetime.date()),
            _ => CellValue::Number(value.as_f64()),
        },
        Data::DateTimeIso(text) => text
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
            .map_or_else(|| CellValue::text(text.as_str()), CellValue::Date),
        Data::DurationIso(text) => CellValue::text(text.as_str()),
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}
