//! Domain keyword rules for pipeline reports.

use pipemerge_model::CellValue;

use crate::utils::{digit_run, mentions};

/// Terms that mean the same thing across exports.
///
/// A slot and a raw header that each mention a member of the same group earn
/// the group bonus once.
pub const SYNONYM_GROUPS: &[&[&str]] = &[
    &["govwin"],
    &["sf", "salesforce"],
    &["capture", "manager"],
    &["award", "date"],
    &["ceiling", "contract", "value"],
    &["opportunity"],
    &["stage"],
    &["positioning"],
    &["rfp"],
    &["mag"],
    &["anticipated"],
];

/// Term pairs that look related but name different fields.
///
/// Penalised unless both names mention both terms, so "MAG Ceiling" still
/// maps onto "MAG Ceiling" while "MAG" never lands on "Ceiling Value".
pub const CONFLICT_PAIRS: &[(&str, &str)] = &[
    ("mag", "ceiling"),
    ("mag", "contract"),
    ("ceiling", "mag"),
    ("anticipated", "award"),
    ("award", "anticipated"),
];

/// Group members mentioned by both names.
pub fn shared_groups(slot: &str, raw: &str) -> Vec<&'static str> {
    SYNONYM_GROUPS
        .iter()
        .filter_map(|group| {
            let slot_term = group.iter().find(|term| mentions(slot, term))?;
            group.iter().any(|term| mentions(raw, term)).then_some(*slot_term)
        })
        .collect()
}

/// Conflicting pairs triggered by this slot/raw combination.
pub fn conflicts(slot: &str, raw: &str) -> Vec<(&'static str, &'static str)> {
    CONFLICT_PAIRS
        .iter()
        .copied()
        .filter(|(slot_term, raw_term)| {
            let triggered = mentions(slot, slot_term) && mentions(raw, raw_term);
            let shared = mentions(slot, raw_term) && mentions(raw, slot_term);
            triggered && !shared
        })
        .collect()
}

/// Sample-value check applied to a slot family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCheck {
    /// GovWin ids are long digit strings.
    GovWinId,
    /// Dates are typed cells or slash-separated text.
    Date,
    /// Contract values are plain or currency-formatted numbers.
    Currency,
    /// Positioning vocabulary ("sub", "prime", "capture", "qualification").
    Positioning,
}

const POSITIONING_VOCABULARY: &[&str] = &["sub", "prime", "capture", "qualification"];

impl ContentCheck {
    /// Check that applies to a normalized slot name, if any.
    pub fn for_slot(slot: &str) -> Option<Self> {
        if mentions(slot, "govwin") {
            Some(Self::GovWinId)
        } else if mentions(slot, "date") || mentions(slot, "award") {
            Some(Self::Date)
        } else if ["value", "ceiling", "amount", "revenue"]
            .iter()
            .any(|term| mentions(slot, term))
        {
            Some(Self::Currency)
        } else if mentions(slot, "positioning") {
            Some(Self::Positioning)
        } else {
            None
        }
    }

    /// Score added when a sample matches.
    pub fn bonus(self) -> i32 {
        match self {
            Self::GovWinId | Self::Positioning => 30,
            Self::Date => 25,
            Self::Currency => 20,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::GovWinId => "numeric id",
            Self::Date => "date values",
            Self::Currency => "currency values",
            Self::Positioning => "positioning vocabulary",
        }
    }

    pub fn matches(self, value: &CellValue) -> bool {
        match self {
            Self::GovWinId => {
                let text = value.to_string();
                digit_run(&text).is_some_and(|digits| digits >= 5)
            }
            Self::Date => match value {
                CellValue::Date(_) => true,
                CellValue::Text(text) => {
                    text.contains('/') && text.chars().any(|c| c.is_ascii_digit())
                }
                _ => false,
            },
            Self::Currency => match value {
                CellValue::Number(_) => true,
                CellValue::Text(text) => {
                    let cleaned: String = text
                        .chars()
                        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
                        .collect();
                    !cleaned.is_empty() && cleaned.parse::<f64>().is_ok()
                }
                _ => false,
            },
            Self::Positioning => {
                let text = value.to_string().to_lowercase();
                POSITIONING_VOCABULARY.iter().any(|word| text.contains(word))
            }
        }
    }
}
