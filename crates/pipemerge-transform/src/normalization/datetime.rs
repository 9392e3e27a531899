//! Calendar date parsing for pipeline exports.
//!
//! Exports come from US-locale CRM reports, so slash dates are read
//! month-first.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Years below this are treated as misparsed two-digit years.
const MIN_PLAUSIBLE_YEAR: i32 = 1900;

/// Parse a date or datetime string to a calendar date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    try_parse_datetime(trimmed)
        .map(|dt| dt.date())
        .or_else(|| try_parse_date(trimmed))
        .filter(|date| date.year() >= MIN_PLAUSIBLE_YEAR)
}

/// Try to parse full datetime formats.
fn try_parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%m/%d/%Y %I:%M %p",
        "%m/%d/%Y %I:%M:%S %p",
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Try to parse date-only formats.
fn try_parse_date(value: &str) -> Option<NaiveDate> {
    // Four-digit years first: "%y" would read "2026" as an invalid two-digit year
    // while "%Y" happily reads "26" as year 26.
    let four_digit = [
        "%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%m-%d-%Y", "%d-%b-%Y", "%b %d, %Y", "%B %d, %Y",
        "%d %b %Y", "%d %B %Y",
    ];
    let two_digit = ["%m/%d/%y", "%m-%d-%y", "%d-%b-%y"];

    four_digit
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .find(|date| date.year() >= MIN_PLAUSIBLE_YEAR)
        .or_else(|| {
            two_digit
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
}
