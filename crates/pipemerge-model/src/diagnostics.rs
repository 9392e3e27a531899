//! Non-fatal conditions raised during a merge.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A soft failure: the merge continued but the result deserves a look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeWarning {
    /// No row in the scan window looked like a header; a fixed row was used.
    HeaderNotFound { fallback_row: usize },
    /// Fewer DATA slots were mapped than the configured coverage requires.
    MappingInsufficient {
        mapped: usize,
        total: usize,
        unmapped: Vec<String>,
    },
    /// Filtering removed every row.
    EmptyResult,
    /// More than one row was labelled Total; all were kept at the end.
    MultipleTotals { count: usize },
    /// Values that could not be coerced and were written as found.
    CoercionFallbacks { count: usize },
    /// The template header repeats a column name.
    DuplicateSlotName { name: String },
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderNotFound { fallback_row } => write!(
                f,
                "raw header row not detected; using fallback row {fallback_row}"
            ),
            Self::MappingInsufficient {
                mapped,
                total,
                unmapped,
            } => write!(
                f,
                "only {mapped}/{total} template columns mapped; unmapped: {}",
                unmapped.join(", ")
            ),
            Self::EmptyResult => write!(f, "no rows survived filtering"),
            Self::MultipleTotals { count } => {
                write!(f, "{count} total rows found; all kept at the end")
            }
            Self::CoercionFallbacks { count } => {
                write!(f, "{count} values could not be converted and were kept as-is")
            }
            Self::DuplicateSlotName { name } => {
                write!(f, "template column name '{name}' appears more than once")
            }
        }
    }
}
