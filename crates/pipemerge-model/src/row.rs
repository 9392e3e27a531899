//! Raw sheet grids and transformed rows.

use serde::{Deserialize, Serialize};

use crate::value::CellValue;

/// A column of the raw source sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    /// Zero-based position inside each raw row.
    pub index: usize,
    /// Cleaned header text; empty when the header cell was blank.
    pub header_text: String,
}

impl RawColumn {
    pub fn is_blank(&self) -> bool {
        self.header_text.is_empty()
    }
}

/// Values of a raw sheet, addressed by physical position.
///
/// Row 0 is the first physical row of the sheet even when the underlying
/// reader skipped leading blank rows, so header offsets match what a user
/// sees in the spreadsheet application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Header cells of `row` as [`RawColumn`]s, padded to the sheet width.
    pub fn columns_at(&self, row: usize) -> Vec<RawColumn> {
        (0..self.width())
            .map(|index| RawColumn {
                index,
                header_text: clean_header(&self.cell(row, index).to_string()),
            })
            .collect()
    }

    /// Rows from `start` onward.
    pub fn rows_from(&self, start: usize) -> &[Vec<CellValue>] {
        self.rows.get(start..).unwrap_or(&[])
    }
}

/// Collapse internal whitespace (including line breaks) and trim.
pub fn clean_header(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One transformed record, aligned with the template's DATA slots.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<CellValue>,
}

impl Row {
    pub fn new(values: Vec<CellValue>) -> Self {
        Self { values }
    }

    pub fn field(&self, index: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.values.get(index).unwrap_or(&EMPTY)
    }

    pub fn is_all_empty(&self) -> bool {
        self.values.iter().all(CellValue::is_empty)
    }

    /// Lower-cased, trimmed first field.
    pub fn owner_key(&self) -> String {
        self.field(0).display_trimmed().to_lowercase()
    }

    /// First field equals "total" after trimming and lower-casing.
    pub fn is_total(&self) -> bool {
        self.owner_key() == "total"
    }

    /// Non-empty owner; the literal "nan" left by upstream exports counts as empty.
    pub fn has_owner(&self) -> bool {
        let key = self.owner_key();
        !key.is_empty() && key != "nan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_padded_to_width() {
        let sheet = RawSheet::new(
            "Report",
            vec![
                vec![CellValue::text("a")],
                vec![CellValue::Empty, CellValue::text(" Capture\nManager "), CellValue::text("x")],
            ],
        );
        let columns = sheet.columns_at(0);
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].header_text, "a");
        assert!(columns[2].is_blank());
        assert_eq!(sheet.columns_at(1)[1].header_text, "Capture Manager");
    }

    #[test]
    fn test_total_and_owner_detection() {
        let total = Row::new(vec![CellValue::text("  TOTAL "), CellValue::Empty]);
        assert!(total.is_total());
        let nan = Row::new(vec![CellValue::text("nan"), CellValue::text("x")]);
        assert!(!nan.has_owner());
        let owner = Row::new(vec![CellValue::text("Smith"), CellValue::text("x")]);
        assert!(owner.has_owner());
        assert_eq!(owner.owner_key(), "smith");
    }
}
