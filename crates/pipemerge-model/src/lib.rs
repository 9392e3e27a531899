//! Shared model for merging raw pipeline exports into a report template.
//!
//! - [`ColumnSlot`]: a destination template column, DATA or CALENDAR
//! - [`RawSheet`] / [`RawColumn`]: the positional grid of a raw export
//! - [`Row`] / [`CellValue`]: transformed records and their values
//! - option structs passed explicitly to every stage
//! - [`MergeWarning`] and the injected [`LogSink`]

pub mod diagnostics;
pub mod log;
pub mod options;
pub mod row;
pub mod slot;
pub mod value;

pub use diagnostics::MergeWarning;
pub use log::{LogLevel, LogSink, MemorySink, TracingSink};
pub use options::{
    HeaderSearchOptions, MappingOptions, TemplateLayout, TransformOptions, WriterOptions,
};
pub use row::{RawColumn, RawSheet, Row, clean_header};
pub use slot::{ColumnSlot, SlotKind, ValueType, column_index, column_letters, data_slots};
pub use value::{CellValue, format_number};
