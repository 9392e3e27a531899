//! Text helpers shared by the scoring rules.

/// Lower-case and turn every non-alphanumeric run into a single space.
///
/// "Capture Mgr." and "capture_mgr" both normalize to "capture mgr".
pub fn normalize_text(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when a normalized name mentions `term`.
///
/// Terms of three characters or fewer ("sf", "rfp", "mag") only match whole
/// tokens so "sf" does not fire on "transfer".
pub fn mentions(normalized: &str, term: &str) -> bool {
    if term.chars().count() <= 3 {
        normalized.split(' ').any(|token| token == term)
    } else {
        normalized.contains(term)
    }
}

/// Count of ASCII digits in `text` when it contains nothing else.
pub fn digit_run(text: &str) -> Option<usize> {
    let trimmed = text.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        Some(trimmed.len())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Capture_Mgr. "), "capture mgr");
        assert_eq!(normalize_text("SF #"), "sf");
        assert_eq!(normalize_text("Ceiling ($)"), "ceiling");
    }

    #[test]
    fn test_short_terms_match_tokens() {
        assert!(mentions("sf id", "sf"));
        assert!(!mentions("transfer date", "sf"));
        assert!(mentions("anticipated award date", "award"));
    }

    #[test]
    fn test_digit_run() {
        assert_eq!(digit_run("123456"), Some(6));
        assert_eq!(digit_run("12a"), None);
        assert_eq!(digit_run(""), None);
    }
}
