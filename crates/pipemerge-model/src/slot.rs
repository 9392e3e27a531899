//! Destination template columns.

use serde::{Deserialize, Serialize};

/// Whether a template column receives merged data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    /// Populated from the raw sheet.
    Data,
    /// Month/year forecast column; cleared but never populated.
    Calendar,
}

impl SlotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Calendar => "calendar",
        }
    }
}

/// Formatting and coercion class of a template column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    Text,
    TextWrapped,
    Currency,
    Date,
    Percentage,
    Number,
}

const CURRENCY_HINTS: &[&str] = &["$", "ceiling", "value", "revenue", "amount"];
const DATE_HINTS: &[&str] = &["date", "award"];
const PERCENTAGE_HINTS: &[&str] = &["%", "probability", "pwin", "percent"];
const NUMBER_HINTS: &[&str] = &["count", "qty", "quantity", "headcount", "fte"];
const WRAPPED_HINTS: &[&str] = &["opportunity", "description", "notes", "comments", "summary"];

impl ValueType {
    /// Infer the value type from a slot name.
    ///
    /// Checked in order: currency, date, percentage, number, wrapped text.
    /// "Opportunity Value" is therefore currency, not wrapped text.
    /// Word hints match whole words only, so "Account Name" stays text.
    pub fn infer(name: &str) -> Self {
        let lower = name.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let has = |hints: &[&str]| {
            hints.iter().any(|hint| {
                if hint.chars().all(char::is_alphanumeric) {
                    words.iter().any(|word| is_word_hint(word, hint))
                } else {
                    lower.contains(hint)
                }
            })
        };
        if has(CURRENCY_HINTS) {
            Self::Currency
        } else if has(DATE_HINTS) {
            Self::Date
        } else if has(PERCENTAGE_HINTS) {
            Self::Percentage
        } else if has(NUMBER_HINTS) {
            Self::Number
        } else if has(WRAPPED_HINTS) {
            Self::TextWrapped
        } else {
            Self::Text
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::TextWrapped => "text_wrapped",
            Self::Currency => "currency",
            Self::Date => "date",
            Self::Percentage => "percentage",
            Self::Number => "number",
        }
    }
}

/// `word` equals `hint` or its plural.
fn is_word_hint(word: &str, hint: &str) -> bool {
    word == hint || word.strip_suffix('s') == Some(hint)
}

/// A column of the destination template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSlot {
    /// Header text as it appears in the template.
    pub name: String,
    /// Zero-based physical column in the template sheet.
    pub position: u32,
    pub kind: SlotKind,
    pub value_type: ValueType,
}

impl ColumnSlot {
    /// Build a DATA slot, inferring its value type from the name.
    pub fn data(name: impl Into<String>, position: u32) -> Self {
        let name = name.into();
        let value_type = ValueType::infer(&name);
        Self {
            name,
            position,
            kind: SlotKind::Data,
            value_type,
        }
    }

    pub fn calendar(name: impl Into<String>, position: u32) -> Self {
        Self {
            name: name.into(),
            position,
            kind: SlotKind::Calendar,
            value_type: ValueType::Text,
        }
    }

    pub fn is_data(&self) -> bool {
        self.kind == SlotKind::Data
    }

    /// Spreadsheet column letters for [`Self::position`] ("A", "B", ..., "AA").
    pub fn column_letters(&self) -> String {
        column_letters(self.position)
    }
}

/// Convert a zero-based column index into spreadsheet letters.
pub fn column_letters(index: u32) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(char::from(b'A' + rem));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Parse spreadsheet column letters into a zero-based index.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(ch.to_ascii_uppercase() as u8 - b'A') + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

/// Only the DATA slots, in template order.
pub fn data_slots(slots: &[ColumnSlot]) -> Vec<&ColumnSlot> {
    slots.iter().filter(|slot| slot.is_data()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_inference() {
        assert_eq!(ValueType::infer("Ceiling Value"), ValueType::Currency);
        assert_eq!(ValueType::infer("Contract $"), ValueType::Currency);
        assert_eq!(ValueType::infer("Anticipated Award Date"), ValueType::Date);
        assert_eq!(ValueType::infer("PWin"), ValueType::Percentage);
        assert_eq!(ValueType::infer("FTE Count"), ValueType::Number);
        assert_eq!(ValueType::infer("Opportunity Name"), ValueType::TextWrapped);
        assert_eq!(ValueType::infer("Capture Manager"), ValueType::Text);
    }

    #[test]
    fn test_word_hints_need_whole_words() {
        assert_eq!(ValueType::infer("Account Name"), ValueType::Text);
        assert_eq!(ValueType::infer("Drafter"), ValueType::Text);
        assert_eq!(ValueType::infer("After Action Notes"), ValueType::TextWrapped);
        assert_eq!(ValueType::infer("Headcount"), ValueType::Number);
        assert_eq!(ValueType::infer("Qty."), ValueType::Number);
        assert_eq!(ValueType::infer("FTEs"), ValueType::Number);
        assert_eq!(ValueType::infer("Key Dates"), ValueType::Date);
        assert_eq!(ValueType::infer("Win %"), ValueType::Percentage);
    }

    #[test]
    fn test_currency_wins_over_wrapped() {
        assert_eq!(ValueType::infer("Opportunity Value"), ValueType::Currency);
    }

    #[test]
    fn test_column_letters_round_trip() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(1), "B");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(45), "AT");
        assert_eq!(column_index("AT"), Some(45));
        assert_eq!(column_index("b"), Some(1));
        assert_eq!(column_index("1"), None);
    }
}
