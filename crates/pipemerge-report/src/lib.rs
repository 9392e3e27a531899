//! Writing merged rows into a copy of the report template.
//!
//! The template is edited at the package level: only the target
//! worksheet and style sheet are rewritten, so charts, merged ranges,
//! column widths and other sheets come through untouched.
//!
//! - [`TemplateWorkbook`]: an in-memory copy of the template
//! - [`TemplateWriter`]: clears the old data region and writes new rows
//! - [`SheetPatch`]: the cell edits applied to the worksheet

mod error;
mod package;
mod shared_strings;
mod sheet;
mod styles;
mod workbook;
mod writer;
mod xml;

// === Errors ===
pub use error::{ReportError, Result};

// === Package and worksheet ===
pub use package::XlsxPackage;
pub use sheet::{CellPatch, PatchValue, SheetCell, SheetCells, SheetPatch};
pub use styles::{CellFormat, StyleSheet};
pub use workbook::TemplateWorkbook;

// === Writer ===
pub use writer::{TemplateWriter, WriteSummary, date_serial};
