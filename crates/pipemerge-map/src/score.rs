//! Scoring of template slot / raw column pairs.
//!
//! Scores are additive integers: name equality dominates, shared domain
//! keywords add evidence, conflicting keywords subtract, and sampled values
//! can corroborate a candidate that already has name evidence.

use pipemerge_model::{CellValue, MappingOptions};
use rapidfuzz::distance::jaro_winkler;
use serde::Serialize;

use crate::patterns::{ContentCheck, conflicts, shared_groups};
use crate::utils::normalize_text;

pub const EXACT_MATCH: i32 = 100;
pub const SUBSTRING_MATCH: i32 = 10;
pub const KEYWORD_GROUP: i32 = 20;
pub const SIMILAR_SPELLING: i32 = 15;
pub const CONFLICT_PENALTY: i32 = -40;

/// Jaro-Winkler similarity needed for the spelling bonus.
const SIMILARITY_THRESHOLD: f64 = 0.9;

/// Score for a single slot / raw column pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnScore {
    pub score: i32,
    /// Breakdown of score components for explainability.
    pub explanation: Vec<ScoreComponent>,
}

impl ColumnScore {
    /// Human-readable explanation of the score.
    pub fn explain(&self) -> String {
        self.explanation
            .iter()
            .map(|c| format!("{} {:+} ({})", c.name, c.value, c.description))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A component contributing to the final score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreComponent {
    /// Component name (e.g., "Keyword").
    pub name: &'static str,
    /// Points added; negative for penalties.
    pub value: i32,
    pub description: String,
}

/// Scores slot names against raw headers.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    exclusion_terms: Vec<String>,
}

impl ScoringEngine {
    pub fn new(options: &MappingOptions) -> Self {
        Self {
            exclusion_terms: options
                .exclusion_terms
                .iter()
                .map(|term| term.to_lowercase())
                .collect(),
        }
    }

    /// True when a raw header can never be a candidate.
    ///
    /// Blank headers and filter-summary artifacts ("Stage equals ...") are
    /// excluded.
    pub fn is_excluded(&self, raw_header: &str) -> bool {
        let lower = raw_header.trim().to_lowercase();
        lower.is_empty()
            || self
                .exclusion_terms
                .iter()
                .any(|term| lower.contains(term.as_str()))
    }

    /// Score a slot against a raw column; `None` when the column is excluded.
    pub fn score(
        &self,
        slot_name: &str,
        raw_header: &str,
        samples: &[&CellValue],
    ) -> Option<ColumnScore> {
        if self.is_excluded(raw_header) {
            return None;
        }
        let slot = normalize_text(slot_name);
        let raw = normalize_text(raw_header);
        if slot.is_empty() || raw.is_empty() {
            return None;
        }

        let mut components = Vec::new();

        // 1. Name evidence
        if slot == raw {
            components.push(ScoreComponent {
                name: "Exact match",
                value: EXACT_MATCH,
                description: format!("'{slot}'"),
            });
        } else {
            if raw.contains(slot.as_str()) || slot.contains(raw.as_str()) {
                components.push(ScoreComponent {
                    name: "Substring",
                    value: SUBSTRING_MATCH,
                    description: format!("'{slot}' / '{raw}'"),
                });
            }
            let similarity = jaro_winkler::similarity(slot.chars(), raw.chars());
            if similarity >= SIMILARITY_THRESHOLD {
                components.push(ScoreComponent {
                    name: "Similar spelling",
                    value: SIMILAR_SPELLING,
                    description: format!("{:.0}% similar", similarity * 100.0),
                });
            }
        }

        // 2. Domain keywords
        for term in shared_groups(&slot, &raw) {
            components.push(ScoreComponent {
                name: "Keyword",
                value: KEYWORD_GROUP,
                description: term.to_string(),
            });
        }
        for (slot_term, raw_term) in conflicts(&slot, &raw) {
            components.push(ScoreComponent {
                name: "Conflict",
                value: CONFLICT_PENALTY,
                description: format!("'{slot_term}' slot vs '{raw_term}' column"),
            });
        }

        // 3. Content corroboration, only for candidates with name evidence
        let name_score: i32 = components.iter().map(|c| c.value).sum();
        if name_score > 0
            && let Some(check) = ContentCheck::for_slot(&slot)
            && samples.iter().any(|value| check.matches(value))
        {
            components.push(ScoreComponent {
                name: "Content",
                value: check.bonus(),
                description: check.label().to_string(),
            });
        }

        Some(ColumnScore {
            score: components.iter().map(|c| c.value).sum(),
            explanation: components,
        })
    }
}
