//! Template header parsing into column slots.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use chrono::Datelike;
use pipemerge_model::{CellValue, ColumnSlot, RawSheet, TemplateLayout, clean_header};
use regex::Regex;
use tracing::{debug, info};

use crate::error::{IngestError, Result, StructureError};
use crate::workbook::read_workbook_sheet;

/// A run of this many empty header cells ends the header band.
const EMPTY_RUN_LIMIT: usize = 3;

/// Month token followed by a four-digit year, e.g. "jan 2025" or "sept. 2026".
static CALENDAR_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z]+)\.?\s+(\d{4})$").expect("Invalid calendar header regex")
});

const MONTHS: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const FULL_MONTHS: &[&str] = &[
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Column slots parsed from a template header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStructure {
    /// Every slot in template order, DATA and CALENDAR.
    pub slots: Vec<ColumnSlot>,
    /// Names that appear more than once in the header.
    pub duplicate_names: Vec<String>,
}

impl TemplateStructure {
    pub fn data_slots(&self) -> impl Iterator<Item = &ColumnSlot> {
        self.slots.iter().filter(|slot| slot.is_data())
    }

    pub fn data_slot_count(&self) -> usize {
        self.data_slots().count()
    }

    pub fn calendar_slot_count(&self) -> usize {
        self.slots.len() - self.data_slot_count()
    }
}

/// Read the template's slots from its header row.
pub fn read_template_structure(path: &Path, layout: &TemplateLayout) -> Result<TemplateStructure> {
    let sheet = read_workbook_sheet(path, Some(&layout.sheet_name)).map_err(|err| match err {
        IngestError::SheetNotFound { sheet, .. } => IngestError::Structure {
            path: path.to_path_buf(),
            source: StructureError::SheetNotFound { sheet },
        },
        other => other,
    })?;
    let structure = structure_from_sheet(&sheet, layout).map_err(|source| IngestError::Structure {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        template = %path.display(),
        sheet = %layout.sheet_name,
        data_slots = structure.data_slot_count(),
        calendar_slots = structure.calendar_slot_count(),
        "read template structure"
    );
    Ok(structure)
}

/// Parse slots from an already loaded template sheet.
pub fn structure_from_sheet(
    sheet: &RawSheet,
    layout: &TemplateLayout,
) -> std::result::Result<TemplateStructure, StructureError> {
    let header_index = layout.header_row_index() as usize;
    let cells = sheet
        .row(header_index)
        .ok_or(StructureError::HeaderRowMissing {
            row: layout.header_row,
        })?;
    slots_from_header(cells, layout)
}

/// Classify header cells from the layout's first column onward.
///
/// A single blank inside the band is skipped; a run of three blanks ends it.
pub fn slots_from_header(
    cells: &[CellValue],
    layout: &TemplateLayout,
) -> std::result::Result<TemplateStructure, StructureError> {
    let mut slots = Vec::new();
    let mut empty_run = 0;

    for (offset, cell) in cells
        .iter()
        .enumerate()
        .skip(layout.first_column_index() as usize)
    {
        let position = offset as u32;
        if let Some(date) = cell.as_date() {
            empty_run = 0;
            let name = date.format("%b %Y").to_string();
            if date.year() >= layout.calendar_baseline_year {
                slots.push(ColumnSlot::calendar(name, position));
            } else {
                slots.push(ColumnSlot::data(name, position));
            }
            continue;
        }

        let name = clean_header(&cell.to_string());
        if name.is_empty() {
            empty_run += 1;
            if empty_run >= EMPTY_RUN_LIMIT {
                break;
            }
            continue;
        }
        empty_run = 0;

        if is_calendar_header(&name, layout.calendar_baseline_year) {
            slots.push(ColumnSlot::calendar(name, position));
        } else {
            slots.push(ColumnSlot::data(name, position));
        }
    }

    if slots.is_empty() {
        return Err(StructureError::HeaderRowMissing {
            row: layout.header_row,
        });
    }
    if !slots.iter().any(ColumnSlot::is_data) {
        return Err(StructureError::NoDataSlots {
            row: layout.header_row,
        });
    }

    let duplicate_names = duplicate_names(&slots);
    for slot in &slots {
        debug!(
            column = %slot.column_letters(),
            name = %slot.name,
            kind = slot.kind.as_str(),
            value_type = slot.value_type.as_str(),
            "template slot"
        );
    }
    Ok(TemplateStructure {
        slots,
        duplicate_names,
    })
}

/// True for "Mon YYYY" headers whose year is at or after `baseline_year`.
pub fn is_calendar_header(name: &str, baseline_year: i32) -> bool {
    let lower = name.trim().to_lowercase();
    let Some(captures) = CALENDAR_HEADER.captures(&lower) else {
        return false;
    };
    let month = &captures[1];
    let is_month = MONTHS.contains(&month) || month == "sept" || FULL_MONTHS.contains(&month);
    let year_ok = captures[2]
        .parse::<i32>()
        .is_ok_and(|year| year >= baseline_year);
    is_month && year_ok
}

fn duplicate_names(slots: &[ColumnSlot]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for slot in slots {
        let key = slot.name.to_lowercase();
        if !seen.insert(key) {
            duplicates.insert(slot.name.clone());
        }
    }
    duplicates.into_iter().collect()
}
