//! Loading raw pipeline exports and report templates.
//!
//! # Features
//!
//! - **Raw exports**: read `.xlsx`/`.xls`/`.ods` (values only) or `.csv` into a
//!   positional grid
//! - **Raw header detection**: find the header row below a variable preamble
//! - **Template structure**: turn the template header row into DATA and
//!   CALENDAR column slots

mod csv;
mod error;
mod header;
mod structure;
mod workbook;

// === Error Types ===
pub use error::{IngestError, Result, StructureError};

// === Raw Exports ===
pub use csv::{MAX_CSV_FILE_SIZE, read_csv_sheet};
pub use workbook::{SourceFormat, data_to_value, read_raw_sheet, read_workbook_sheet, sheet_names};

// === Raw Header Detection ===
pub use header::{HeaderLocation, contains_keyword, keyword_hits, locate_header, raw_columns};

// === Template Structure ===
pub use structure::{
    TemplateStructure, is_calendar_header, read_template_structure, slots_from_header,
    structure_from_sheet,
};
