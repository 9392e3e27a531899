//! Writes transformed rows into the template's data region.

use chrono::{Datelike, NaiveDate};
use pipemerge_model::{CellValue, ColumnSlot, Row, TemplateLayout, ValueType, WriterOptions};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::sheet::{CellPatch, PatchValue, SheetPatch};
use crate::styles::CellFormat;
use crate::workbook::TemplateWorkbook;

/// Days from 0001-01-01 to the spreadsheet epoch, 1899-12-30.
const SERIAL_EPOCH_DAYS_FROM_CE: i32 = 693_594;

/// Spreadsheet serial number of a date.
pub fn date_serial(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - SERIAL_EPOCH_DAYS_FROM_CE)
}

/// What a write did to the template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    /// First written row (1-based).
    pub first_row: u32,
    pub rows_written: usize,
    /// Last row of the cleared region; below `first_row` when nothing was cleared.
    pub clear_boundary: u32,
    /// Template row that ended the cleared region, when one was found.
    pub template_total_row: Option<u32>,
    pub cells_cleared: usize,
}

/// Writes rows into a [`TemplateWorkbook`] with per-column formatting.
#[derive(Debug, Clone)]
pub struct TemplateWriter {
    row_height: f64,
    currency: CellFormat,
    date: CellFormat,
    wrapped: CellFormat,
}

impl TemplateWriter {
    pub fn new(options: &WriterOptions) -> Self {
        Self {
            row_height: options.row_height,
            currency: CellFormat::number(options.currency_format.as_str()),
            date: CellFormat::number(options.date_format.as_str()),
            wrapped: CellFormat::wrapped(),
        }
    }

    /// Clear the old data region and write `rows` from the data-start row.
    ///
    /// `rows` are aligned with the DATA entries of `slots`; CALENDAR
    /// columns are cleared but never written.
    pub fn write(
        &self,
        workbook: &mut TemplateWorkbook,
        layout: &TemplateLayout,
        slots: &[ColumnSlot],
        rows: &[Row],
    ) -> Result<WriteSummary> {
        let first_row = layout.data_start_row.max(1);
        let label_col = slots
            .iter()
            .find(|slot| slot.is_data())
            .map_or(layout.first_column_index(), |slot| slot.position);
        let cells = workbook.cells();
        let template_total_row = cells.find_total_row(first_row, label_col);
        let clear_boundary = match template_total_row {
            Some(row) => row - 1,
            None => cells.last_populated_row().unwrap_or(0),
        };

        let mut patch = SheetPatch::default();
        for row in first_row..=clear_boundary {
            for slot in slots {
                patch.set(row, slot.position, CellPatch::clear());
            }
        }
        let cells_cleared = patch.cell_count();
        debug!(
            first_row,
            clear_boundary,
            label_col,
            ?template_total_row,
            cells_cleared,
            "cleared template data region"
        );

        let data: Vec<&ColumnSlot> = slots.iter().filter(|slot| slot.is_data()).collect();
        for (offset, row) in rows.iter().enumerate() {
            let row_num = first_row + offset as u32;
            patch.set_row_height(row_num, self.row_height);
            for slot in slots.iter().filter(|slot| !slot.is_data()) {
                patch.set(row_num, slot.position, CellPatch::clear());
            }
            for (index, slot) in data.iter().enumerate() {
                let cell = self.cell_patch(workbook, row_num, slot, row.field(index));
                patch.set(row_num, slot.position, cell);
            }
        }

        workbook.apply(&patch)?;

        info!(
            sheet = workbook.sheet_name(),
            first_row,
            rows = rows.len(),
            clear_boundary,
            "rows written to template"
        );

        Ok(WriteSummary {
            first_row,
            rows_written: rows.len(),
            clear_boundary,
            template_total_row,
            cells_cleared,
        })
    }

    fn cell_patch(
        &self,
        workbook: &mut TemplateWorkbook,
        row: u32,
        slot: &ColumnSlot,
        value: &CellValue,
    ) -> CellPatch {
        let (value, format) = match (slot.value_type, value) {
            (_, value) if value.is_empty() => return CellPatch::clear(),
            (_, CellValue::Date(date)) => (PatchValue::Number(date_serial(*date)), Some(&self.date)),
            (ValueType::Currency, CellValue::Number(n)) => {
                (PatchValue::Number(*n), Some(&self.currency))
            }
            (ValueType::TextWrapped, value) => (plain(value), Some(&self.wrapped)),
            (_, value) => (plain(value), None),
        };

        let patch = CellPatch::value(value);
        match format {
            Some(format) => {
                let base = workbook.cells().style(row, slot.position);
                patch.with_style(workbook.styles_mut().derive(base, format))
            }
            None => patch,
        }
    }
}

fn plain(value: &CellValue) -> PatchValue {
    match value {
        CellValue::Empty => PatchValue::Clear,
        CellValue::Text(text) => PatchValue::Text(text.clone()),
        CellValue::Number(n) => PatchValue::Number(*n),
        CellValue::Date(date) => PatchValue::Number(date_serial(*date)),
        CellValue::Bool(b) => PatchValue::Bool(*b),
    }
}
