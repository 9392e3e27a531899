//! Slot-to-column assignment.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use pipemerge_model::{CellValue, ColumnSlot, MappingOptions, RawColumn};
use tracing::{debug, info};

use crate::score::{ColumnScore, ScoringEngine};
use crate::types::{ColumnMapping, SlotMapping};

/// Maps template DATA slots onto raw export columns.
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    scorer: ScoringEngine,
    min_score: i32,
    sample_rows: usize,
}

struct Candidate {
    slot: usize,
    column: usize,
    score: ColumnScore,
}

impl ColumnMapper {
    pub fn new(options: &MappingOptions) -> Self {
        Self {
            scorer: ScoringEngine::new(options),
            min_score: options.min_score,
            sample_rows: options.sample_rows,
        }
    }

    /// Compute the mapping for every DATA slot.
    ///
    /// All slot/column pairs are scored, then claimed greedily from the
    /// highest score down. Ties go to the earlier template column, then the
    /// earlier raw column. A raw column is claimed at most once.
    pub fn map(
        &self,
        slots: &[ColumnSlot],
        columns: &[RawColumn],
        data_rows: &[Vec<CellValue>],
    ) -> ColumnMapping {
        let data_slots: Vec<&ColumnSlot> = slots.iter().filter(|slot| slot.is_data()).collect();
        let samples: Vec<Vec<&CellValue>> = columns
            .iter()
            .map(|column| sample_values(data_rows, column.index, self.sample_rows))
            .collect();

        let mut candidates = Vec::new();
        let mut best_rejected: BTreeMap<usize, (i32, usize, String)> = BTreeMap::new();
        for (slot_idx, slot) in data_slots.iter().enumerate() {
            for (column_idx, column) in columns.iter().enumerate() {
                let Some(score) =
                    self.scorer
                        .score(&slot.name, &column.header_text, &samples[column_idx])
                else {
                    continue;
                };
                debug!(
                    slot = %slot.name,
                    column = %column.header_text,
                    score = score.score,
                    "mapping candidate"
                );
                if score.score >= self.min_score {
                    candidates.push(Candidate {
                        slot: slot_idx,
                        column: column_idx,
                        score,
                    });
                } else if score.score > 0
                    && best_rejected
                        .get(&slot_idx)
                        .is_none_or(|(best, _, _)| score.score > *best)
                {
                    best_rejected.insert(slot_idx, (score.score, column_idx, score.explain()));
                }
            }
        }

        candidates.sort_by_key(|candidate| {
            (
                Reverse(candidate.score.score),
                candidate.slot,
                columns[candidate.column].index,
            )
        });

        let mut claimed_slots: BTreeMap<usize, Candidate> = BTreeMap::new();
        let mut claimed_columns: BTreeSet<usize> = BTreeSet::new();
        for candidate in candidates {
            if claimed_slots.contains_key(&candidate.slot)
                || claimed_columns.contains(&candidate.column)
            {
                continue;
            }
            claimed_columns.insert(candidate.column);
            claimed_slots.insert(candidate.slot, candidate);
        }

        let entries: Vec<SlotMapping> = data_slots
            .iter()
            .enumerate()
            .map(|(slot_idx, slot)| match claimed_slots.get(&slot_idx) {
                Some(candidate) => {
                    let column = &columns[candidate.column];
                    SlotMapping {
                        slot_name: slot.name.clone(),
                        slot_position: slot.position,
                        value_type: slot.value_type,
                        raw_index: Some(column.index),
                        raw_header: Some(column.header_text.clone()),
                        score: candidate.score.score,
                        accepted: true,
                        explanation: candidate.score.explain(),
                    }
                }
                None => {
                    let rejected = best_rejected.get(&slot_idx);
                    SlotMapping {
                        slot_name: slot.name.clone(),
                        slot_position: slot.position,
                        value_type: slot.value_type,
                        raw_index: None,
                        raw_header: None,
                        score: rejected.map_or(0, |(score, _, _)| *score),
                        accepted: false,
                        explanation: rejected.map_or_else(String::new, |(_, column, why)| {
                            format!("best below threshold: '{}' ({why})", columns[*column].header_text)
                        }),
                    }
                }
            })
            .collect();

        let unused_columns = columns
            .iter()
            .enumerate()
            .filter(|(idx, column)| !column.is_blank() && !claimed_columns.contains(idx))
            .map(|(_, column)| column.header_text.clone())
            .collect();

        let mapping = ColumnMapping {
            entries,
            unused_columns,
        };
        info!(
            mapped = mapping.accepted_count(),
            data_slots = mapping.entries.len(),
            coverage = %format!("{:.0}%", mapping.coverage() * 100.0),
            "column mapping complete"
        );
        mapping
    }
}

/// First `limit` non-empty values of a raw column.
fn sample_values(rows: &[Vec<CellValue>], index: usize, limit: usize) -> Vec<&CellValue> {
    rows.iter()
        .filter_map(|row| row.get(index))
        .filter(|value| !value.is_empty())
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(headers: &[&str]) -> Vec<RawColumn> {
        headers
            .iter()
            .enumerate()
            .map(|(index, header)| RawColumn {
                index,
                header_text: (*header).to_string(),
            })
            .collect()
    }

    fn slots(names: &[&str]) -> Vec<ColumnSlot> {
        names
            .iter()
            .enumerate()
            .map(|(offset, name)| ColumnSlot::data(*name, offset as u32 + 1))
            .collect()
    }

    #[test]
    fn test_maps_exact_and_keyword_matches() {
        let mapper = ColumnMapper::new(&MappingOptions::default());
        let mapping = mapper.map(
            &slots(&["Capture Manager", "Opportunity Name", "SF Number"]),
            &columns(&["", "Capture Manager", "Opportunity", "SF ID", "Stage"]),
            &[],
        );
        let raw: Vec<_> = mapping.entries.iter().map(|e| e.raw_index).collect();
        assert_eq!(raw, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(mapping.unused_columns, vec!["Stage".to_string()]);
    }

    #[test]
    fn test_higher_score_claims_first() {
        // "Opportunity" scores higher for "Opportunity Name" than for
        // "Opportunity ID"; the ID slot falls back to the GovWin column.
        let mapper = ColumnMapper::new(&MappingOptions::default());
        let mapping = mapper.map(
            &slots(&["GovWin Opportunity ID", "Opportunity Name"]),
            &columns(&["Opportunity", "GovWin IQ"]),
            &[],
        );
        assert_eq!(mapping.entries[1].raw_index, Some(0));
        assert_eq!(mapping.entries[0].raw_index, Some(1));
    }

    #[test]
    fn test_below_threshold_is_unmapped() {
        let mapper = ColumnMapper::new(&MappingOptions {
            min_score: 50,
            ..MappingOptions::default()
        });
        let mapping = mapper.map(&slots(&["SF Number"]), &columns(&["SF ID"]), &[]);
        assert!(!mapping.entries[0].accepted);
        assert_eq!(mapping.entries[0].score, 20);
        assert!(mapping.entries[0].explanation.contains("SF ID"));
    }

    #[test]
    fn test_calendar_slots_are_ignored() {
        let mapper = ColumnMapper::new(&MappingOptions::default());
        let mut template = slots(&["Stage"]);
        template.push(ColumnSlot::calendar("Jan 2025", 2));
        let mapping = mapper.map(&template, &columns(&["Stage", "Jan 2025"]), &[]);
        assert_eq!(mapping.entries.len(), 1);
    }

    #[test]
    fn test_samples_skip_empty_values() {
        let rows = vec![
            vec![CellValue::Empty],
            vec![CellValue::text("1")],
            vec![CellValue::text("2")],
        ];
        let samples = sample_values(&rows, 0, 3);
        assert_eq!(samples.len(), 2);
    }
}
