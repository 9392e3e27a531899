use pipemerge_model::{MergeWarning, ValueType};
use serde::Serialize;

/// Mapping outcome for one DATA slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotMapping {
    pub slot_name: String,
    /// Zero-based template column.
    pub slot_position: u32,
    pub value_type: ValueType,
    /// Raw column feeding this slot; `None` leaves the slot empty.
    pub raw_index: Option<usize>,
    pub raw_header: Option<String>,
    /// Score of the chosen candidate, or of the best rejected one.
    pub score: i32,
    pub accepted: bool,
    pub explanation: String,
}

/// Mapping of every DATA slot, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub entries: Vec<SlotMapping>,
    /// Non-blank raw headers that no slot claimed.
    pub unused_columns: Vec<String>,
}

impl ColumnMapping {
    pub fn accepted_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.accepted).count()
    }

    /// Fraction of DATA slots with an accepted source column.
    pub fn coverage(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.accepted_count() as f64 / self.entries.len() as f64
    }

    pub fn unmapped_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| !entry.accepted)
            .map(|entry| entry.slot_name.clone())
            .collect()
    }

    /// Raw column feeding the slot at `slot_position`.
    pub fn raw_index_for(&self, slot_position: u32) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| entry.slot_position == slot_position && entry.accepted)
            .and_then(|entry| entry.raw_index)
    }

    /// Warning when coverage falls below `min_coverage`.
    pub fn coverage_warning(&self, min_coverage: f64) -> Option<MergeWarning> {
        (self.coverage() < min_coverage).then(|| MergeWarning::MappingInsufficient {
            mapped: self.accepted_count(),
            total: self.entries.len(),
            unmapped: self.unmapped_names(),
        })
    }
}
