//! Column mapping between a report template and a raw pipeline export.
//!
//! Every template DATA slot is scored against every raw header using name
//! equality, shared domain keywords, conflicting keywords, and sampled values.
//! Candidates are then claimed greedily, highest score first, so a raw column
//! feeds at most one slot.

pub mod engine;
pub mod patterns;
pub mod score;
pub mod types;
pub mod utils;

pub use engine::ColumnMapper;
pub use score::{ColumnScore, ScoreComponent, ScoringEngine};
pub use types::{ColumnMapping, SlotMapping};
pub use utils::normalize_text;
