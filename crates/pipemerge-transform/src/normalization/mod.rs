//! Per-cell coercion to a slot's value type.

pub mod datetime;
pub mod numeric;

use pipemerge_model::{CellValue, ValueType};

/// A coerced value and whether coercion had to fall back to the raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub value: CellValue,
    pub fell_back: bool,
}

impl Coerced {
    fn converted(value: CellValue) -> Self {
        Self {
            value,
            fell_back: false,
        }
    }

    fn kept(value: CellValue) -> Self {
        Self {
            value,
            fell_back: true,
        }
    }
}

/// Coerce one value to `value_type`.
///
/// Failures never lose data: the raw value is returned with `fell_back` set.
pub fn coerce(value: CellValue, value_type: ValueType) -> Coerced {
    if value.is_empty() {
        return Coerced::converted(CellValue::Empty);
    }
    match value_type {
        ValueType::Text | ValueType::TextWrapped => Coerced::converted(value),
        ValueType::Currency => coerce_text(value, numeric::parse_currency),
        ValueType::Number => coerce_text(value, numeric::parse_number),
        ValueType::Percentage => coerce_text(value, numeric::parse_percentage),
        ValueType::Date => match value {
            CellValue::Date(_) => Coerced::converted(value),
            CellValue::Text(text) => match datetime::parse_date(&text) {
                Some(date) => Coerced::converted(CellValue::Date(date)),
                None => Coerced::kept(CellValue::Text(text)),
            },
            other => Coerced::kept(other),
        },
    }
}

/// Numbers pass through; text goes through `parse`.
fn coerce_text(value: CellValue, parse: fn(&str) -> Option<f64>) -> Coerced {
    match value {
        CellValue::Number(_) => Coerced::converted(value),
        CellValue::Text(text) => match parse(&text) {
            Some(number) => Coerced::converted(CellValue::Number(number)),
            None => Coerced::kept(CellValue::Text(text)),
        },
        other => Coerced::kept(other),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_currency_coercion() {
        let coerced = coerce(CellValue::text("$1,250,000"), ValueType::Currency);
        assert_eq!(coerced.value, CellValue::Number(1_250_000.0));
        assert!(!coerced.fell_back);

        let coerced = coerce(CellValue::text("N/A"), ValueType::Currency);
        assert_eq!(coerced.value, CellValue::text("N/A"));
        assert!(coerced.fell_back);
    }

    #[test]
    fn test_empty_is_not_a_fallback() {
        let coerced = coerce(CellValue::text("  "), ValueType::Date);
        assert_eq!(coerced.value, CellValue::Empty);
        assert!(!coerced.fell_back);
    }

    #[test]
    fn test_date_coercion() {
        let coerced = coerce(CellValue::text("06/30/2026"), ValueType::Date);
        assert_eq!(
            coerced.value,
            CellValue::Date(NaiveDate::from_ymd_opt(2026, 6, 30).expect("date"))
        );
        let coerced = coerce(CellValue::text("Q3 FY26"), ValueType::Date);
        assert!(coerced.fell_back);
    }

    #[test]
    fn test_text_untouched() {
        let coerced = coerce(CellValue::Number(12.0), ValueType::Text);
        assert_eq!(coerced.value, CellValue::Number(12.0));
        assert!(!coerced.fell_back);
    }
}
