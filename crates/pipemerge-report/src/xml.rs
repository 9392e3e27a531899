//! Small helpers shared by the part rewriters.

use pipemerge_model::{column_index, column_letters};
use quick_xml::events::BytesStart;
use quick_xml::events::attributes::AttrError;
use thiserror::Error;

/// Low-level XML failure, attached to a part name by the caller.
#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct XmlError(String);

impl XmlError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<quick_xml::Error> for XmlError {
    fn from(err: quick_xml::Error) -> Self {
        Self(err.to_string())
    }
}

impl From<AttrError> for XmlError {
    fn from(err: AttrError) -> Self {
        Self(err.to_string())
    }
}

impl From<std::io::Error> for XmlError {
    fn from(err: std::io::Error) -> Self {
        Self(err.to_string())
    }
}

/// Strip a namespace prefix (`x:row` -> `row`).
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Namespace prefix of an element including the colon, or "".
pub(crate) fn prefix_of(start: &BytesStart<'_>) -> String {
    let name = start.name();
    let raw = name.as_ref();
    match raw.iter().rposition(|b| *b == b':') {
        Some(idx) => format!("{}:", String::from_utf8_lossy(&raw[..idx])),
        None => String::new(),
    }
}

/// Unescaped value of the attribute with local name `key`.
pub(crate) fn attribute(start: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, XmlError> {
    for attr in start.attributes() {
        let attr = attr?;
        if local_name(attr.key.as_ref()) == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Every attribute as an unescaped `(qualified name, value)` pair.
pub(crate) fn attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>, XmlError> {
    let mut out = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        out.push((key, attr.unescape_value()?.into_owned()));
    }
    Ok(out)
}

pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn needs_space_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

/// A1 reference for a 1-based row and 0-based column.
pub(crate) fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{row}", column_letters(col))
}

/// Parse an A1 reference into a 1-based row and 0-based column.
pub(crate) fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let col = column_index(letters)?;
    let row = digits.parse::<u32>().ok().filter(|row| *row > 0)?;
    Some((row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_refs() {
        assert_eq!(cell_ref(14, 1), "B14");
        assert_eq!(parse_cell_ref("AA102"), Some((102, 26)));
        assert_eq!(parse_cell_ref("$C$7"), Some((7, 2)));
        assert_eq!(parse_cell_ref("C0"), None);
        assert_eq!(parse_cell_ref("17"), None);
    }

    #[test]
    fn test_local_name_and_prefix() {
        assert_eq!(local_name(b"x:row"), b"row");
        assert_eq!(local_name(b"row"), b"row");
        assert_eq!(prefix_of(&BytesStart::new("x:sheetData")), "x:");
        assert_eq!(prefix_of(&BytesStart::new("sheetData")), "");
    }
}
