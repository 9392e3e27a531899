//! Numeric normalization utilities.

/// Parses a string as f64, returning None for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    if value.trim().is_empty() {
        return None;
    }
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a currency amount such as "$1,250,000" or "(5,000)".
///
/// Dollar signs, thousands separators and whitespace are stripped;
/// accounting-style parentheses mark a negative amount.
pub fn parse_currency(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let (negative, inner) = match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = inner
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    let amount = parse_f64(&cleaned)?;
    Some(if negative { -amount } else { amount })
}

/// Parses a plain number, allowing thousands separators.
pub fn parse_number(value: &str) -> Option<f64> {
    parse_f64(&value.replace(',', ""))
}

/// Parses a percentage; "45%" and "45 %" become 0.45, bare numbers pass through.
pub fn parse_percentage(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    match trimmed.strip_suffix('%') {
        Some(number) => parse_number(number).map(|v| v / 100.0),
        None => parse_number(trimmed),
    }
}
