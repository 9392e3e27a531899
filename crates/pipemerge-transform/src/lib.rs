//! Reshaping raw pipeline rows into template-aligned rows.
//!
//! - **normalization**: per-cell coercion (currency, dates, percentages,
//!   numbers) that never drops a value it cannot parse
//! - **pipeline**: projection, row filters, Total-row handling and ordering

pub mod normalization;
pub mod pipeline;

pub use normalization::datetime::parse_date;
pub use normalization::numeric::{parse_currency, parse_percentage};
pub use normalization::{Coerced, coerce};
pub use pipeline::{RowTransformer, TransformOutcome, TransformStats};
