//! Cell formats (`xl/styles.xml`).
//!
//! New formats are derived from a cell's existing format so that fonts,
//! borders and fills from the template survive; only the number format
//! or alignment is changed.

use std::collections::HashMap;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::xml::{XmlError, attribute, attributes, local_name, prefix_of};

/// First id available for workbook-defined number formats.
const FIRST_CUSTOM_NUM_FMT: u32 = 164;

/// Built-in number formats that never appear in `numFmts`.
const BUILTIN_NUM_FMTS: &[(u32, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (14, "mm-dd-yy"),
    (49, "@"),
];

/// The formatting a written cell needs on top of its template style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CellFormat {
    pub number_format: Option<String>,
    pub wrap: bool,
}

impl CellFormat {
    pub fn number(code: impl Into<String>) -> Self {
        Self {
            number_format: Some(code.into()),
            wrap: false,
        }
    }

    /// Wrapped text aligned to the top of the cell.
    pub fn wrapped() -> Self {
        Self {
            number_format: None,
            wrap: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Xf {
    attrs: Vec<(String, String)>,
    alignment: Option<Vec<(String, String)>>,
    /// `protection` / `extLst` children, kept verbatim.
    extra: Vec<u8>,
}

impl Xf {
    fn plain() -> Self {
        Self {
            attrs: ["numFmtId", "fontId", "fillId", "borderId", "xfId"]
                .iter()
                .map(|key| ((*key).to_string(), "0".to_string()))
                .collect(),
            ..Self::default()
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        get(&self.attrs, key)
    }

    fn set(&mut self, key: &str, value: &str) {
        set(&mut self.attrs, key, value);
    }
}

fn get<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn set(attrs: &mut Vec<(String, String)>, key: &str, value: &str) {
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some(entry) => entry.1 = value.to_string(),
        None => attrs.push((key.to_string(), value.to_string())),
    }
}

/// Parsed number formats and cell formats of a workbook.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    num_fmts: Vec<(u32, String)>,
    xfs: Vec<Xf>,
    derived: HashMap<(u32, CellFormat), u32>,
    had_num_fmts: bool,
    dirty: bool,
}

impl StyleSheet {
    pub(crate) fn parse(xml: &[u8]) -> Result<Self, XmlError> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(false);

        let mut sheet = Self::default();
        let mut in_num_fmts = false;
        let mut in_cell_xfs = false;
        let mut current: Option<(Xf, Writer<Vec<u8>>)> = None;
        let mut child_depth = 0usize;
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf)?;
            match &event {
                Event::Start(e) | Event::Empty(e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    match local_name(e.name().as_ref()) {
                        b"numFmts" => {
                            sheet.had_num_fmts = true;
                            in_num_fmts = !is_empty;
                        }
                        b"numFmt" if in_num_fmts => {
                            let id = attribute(e, b"numFmtId")?.and_then(|id| id.parse().ok());
                            let code = attribute(e, b"formatCode")?;
                            if let (Some(id), Some(code)) = (id, code) {
                                sheet.num_fmts.push((id, code));
                            }
                        }
                        b"cellXfs" => in_cell_xfs = !is_empty,
                        b"xf" if in_cell_xfs && current.is_none() => {
                            let xf = Xf {
                                attrs: attributes(e)?,
                                ..Xf::default()
                            };
                            if is_empty {
                                sheet.xfs.push(xf);
                            } else {
                                current = Some((xf, Writer::new(Vec::new())));
                                child_depth = 0;
                            }
                        }
                        b"alignment" if child_depth == 0 => {
                            if let Some((xf, _)) = current.as_mut() {
                                xf.alignment = Some(attributes(e)?);
                            }
                            if !is_empty {
                                reader.read_to_end_into(e.name(), &mut Vec::new())?;
                            }
                        }
                        _ => {
                            if let Some((_, extra)) = current.as_mut() {
                                extra.write_event(event.borrow())?;
                                if !is_empty {
                                    child_depth += 1;
                                }
                            }
                        }
                    }
                }
                Event::End(e) => match local_name(e.name().as_ref()) {
                    b"numFmts" => in_num_fmts = false,
                    b"cellXfs" => in_cell_xfs = false,
                    b"xf" if child_depth == 0 && current.is_some() => {
                        if let Some((mut xf, extra)) = current.take() {
                            xf.extra = extra.into_inner();
                            sheet.xfs.push(xf);
                        }
                    }
                    _ => {
                        if let Some((_, extra)) = current.as_mut() {
                            extra.write_event(event.borrow())?;
                            child_depth = child_depth.saturating_sub(1);
                        }
                    }
                },
                Event::Eof => break,
                _ => {
                    if let Some((_, extra)) = current.as_mut() {
                        extra.write_event(event.borrow())?;
                    }
                }
            }
            buf.clear();
        }

        Ok(sheet)
    }

    pub fn xf_count(&self) -> usize {
        self.xfs.len()
    }

    /// Whether any format was added since parsing.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number format code used by cell format `index`.
    pub fn number_format(&self, index: u32) -> Option<&str> {
        let id: u32 = self.xfs.get(index as usize)?.get("numFmtId")?.parse().ok()?;
        self.num_fmts
            .iter()
            .find(|(fmt_id, _)| *fmt_id == id)
            .map(|(_, code)| code.as_str())
            .or_else(|| {
                BUILTIN_NUM_FMTS
                    .iter()
                    .find(|(fmt_id, _)| *fmt_id == id)
                    .map(|(_, code)| *code)
            })
    }

    /// Whether cell format `index` wraps text.
    pub fn is_wrapped(&self, index: u32) -> bool {
        self.xfs
            .get(index as usize)
            .and_then(|xf| xf.alignment.as_deref())
            .and_then(|alignment| get(alignment, "wrapText"))
            .is_some_and(|value| value == "1" || value == "true")
    }

    /// Index of a cell format equal to `base` with `format` applied.
    ///
    /// Identical requests share one derived format.
    pub fn derive(&mut self, base: Option<u32>, format: &CellFormat) -> u32 {
        let base = base.unwrap_or(0);
        if let Some(index) = self.derived.get(&(base, format.clone())) {
            return *index;
        }

        let mut xf = self
            .xfs
            .get(base as usize)
            .or_else(|| self.xfs.first())
            .cloned()
            .unwrap_or_else(Xf::plain);

        if let Some(code) = &format.number_format {
            let id = self.num_fmt_id(code);
            xf.set("numFmtId", &id.to_string());
            xf.set("applyNumberFormat", "1");
        }
        if format.wrap {
            let alignment = xf.alignment.get_or_insert_with(Vec::new);
            set(alignment, "vertical", "top");
            set(alignment, "wrapText", "1");
            xf.set("applyAlignment", "1");
        }

        if self.xfs.is_empty() {
            self.xfs.push(Xf::plain());
        }
        self.xfs.push(xf);
        let index = (self.xfs.len() - 1) as u32;
        self.derived.insert((base, format.clone()), index);
        self.dirty = true;
        index
    }

    fn num_fmt_id(&mut self, code: &str) -> u32 {
        if let Some((id, _)) = BUILTIN_NUM_FMTS.iter().find(|(_, c)| *c == code) {
            return *id;
        }
        if let Some((id, _)) = self.num_fmts.iter().find(|(_, c)| c == code) {
            return *id;
        }
        let id = self
            .num_fmts
            .iter()
            .map(|(id, _)| id + 1)
            .max()
            .unwrap_or(FIRST_CUSTOM_NUM_FMT)
            .max(FIRST_CUSTOM_NUM_FMT);
        self.num_fmts.push((id, code.to_string()));
        id
    }

    /// Rewrite `original` with the current `numFmts` and `cellXfs`.
    pub(crate) fn to_xml(&self, original: &[u8]) -> Result<Vec<u8>, XmlError> {
        let mut reader = Reader::from_reader(original);
        reader.config_mut().trim_text(false);
        let mut writer = Writer::new(Vec::with_capacity(original.len() + 256));
        let mut buf = Vec::new();
        let mut skip = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if local_name(e.name().as_ref()) == b"styleSheet" => {
                    let prefix = prefix_of(&e);
                    writer.write_event(Event::Start(e.into_owned()))?;
                    if !self.had_num_fmts {
                        self.write_num_fmts(&mut writer, &prefix)?;
                    }
                }
                Event::Start(e) if local_name(e.name().as_ref()) == b"numFmts" => {
                    reader.read_to_end_into(e.name(), &mut skip)?;
                    skip.clear();
                    self.write_num_fmts(&mut writer, &prefix_of(&e))?;
                }
                Event::Empty(e) if local_name(e.name().as_ref()) == b"numFmts" => {
                    self.write_num_fmts(&mut writer, &prefix_of(&e))?;
                }
                Event::Start(e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                    reader.read_to_end_into(e.name(), &mut skip)?;
                    skip.clear();
                    self.write_cell_xfs(&mut writer, &prefix_of(&e))?;
                }
                Event::Empty(e) if local_name(e.name().as_ref()) == b"cellXfs" => {
                    self.write_cell_xfs(&mut writer, &prefix_of(&e))?;
                }
                Event::Eof => break,
                ev => writer.write_event(ev.into_owned())?,
            }
            buf.clear();
        }

        Ok(writer.into_inner())
    }

    fn write_num_fmts(&self, writer: &mut Writer<Vec<u8>>, prefix: &str) -> Result<(), XmlError> {
        if self.num_fmts.is_empty() {
            return Ok(());
        }
        let name = format!("{prefix}numFmts");
        let mut start = BytesStart::new(name.as_str());
        start.push_attribute(("count", self.num_fmts.len().to_string().as_str()));
        writer.write_event(Event::Start(start))?;
        for (id, code) in &self.num_fmts {
            let mut fmt = BytesStart::new(format!("{prefix}numFmt"));
            fmt.push_attribute(("numFmtId", id.to_string().as_str()));
            fmt.push_attribute(("formatCode", code.as_str()));
            writer.write_event(Event::Empty(fmt))?;
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        Ok(())
    }

    fn write_cell_xfs(&self, writer: &mut Writer<Vec<u8>>, prefix: &str) -> Result<(), XmlError> {
        let name = format!("{prefix}cellXfs");
        let mut start = BytesStart::new(name.as_str());
        start.push_attribute(("count", self.xfs.len().to_string().as_str()));
        writer.write_event(Event::Start(start))?;

        let xf_name = format!("{prefix}xf");
        for xf in &self.xfs {
            let mut element = BytesStart::new(xf_name.as_str());
            for (key, value) in &xf.attrs {
                element.push_attribute((key.as_str(), value.as_str()));
            }
            if xf.alignment.is_none() && xf.extra.is_empty() {
                writer.write_event(Event::Empty(element))?;
                continue;
            }
            writer.write_event(Event::Start(element))?;
            if let Some(alignment) = &xf.alignment {
                let mut align = BytesStart::new(format!("{prefix}alignment"));
                for (key, value) in alignment {
                    align.push_attribute((key.as_str(), value.as_str()));
                }
                writer.write_event(Event::Empty(align))?;
            }
            writer.get_mut().extend_from_slice(&xf.extra);
            writer.write_event(Event::End(BytesEnd::new(xf_name.as_str())))?;
        }

        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="0.0%"/></numFmts><fonts count="2"><font><sz val="11"/></font><font><b/><sz val="11"/></font></fonts><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="1" xfId="0" applyFont="1"><alignment horizontal="center"/><protection locked="0"/></xf><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs></styleSheet>"#;

    fn sheet() -> StyleSheet {
        StyleSheet::parse(STYLES.as_bytes()).expect("parse")
    }

    #[test]
    fn test_parse_cell_xfs_only() {
        let styles = sheet();
        assert_eq!(styles.xf_count(), 3);
        assert_eq!(styles.number_format(2), Some("0.0%"));
        assert_eq!(styles.number_format(0), Some("General"));
        assert!(!styles.is_wrapped(1));
    }

    #[test]
    fn test_derive_keeps_base_and_dedupes() {
        let mut styles = sheet();
        let currency = styles.derive(Some(1), &CellFormat::number("$#,##0"));
        assert_eq!(currency, 3);
        assert_eq!(styles.number_format(currency), Some("$#,##0"));
        assert_eq!(styles.xfs[3].get("fontId"), Some("1"));
        assert_eq!(styles.xfs[3].get("borderId"), Some("1"));
        assert_eq!(styles.derive(Some(1), &CellFormat::number("$#,##0")), 3);

        let wrapped = styles.derive(None, &CellFormat::wrapped());
        assert_eq!(wrapped, 4);
        assert!(styles.is_wrapped(wrapped));
        assert!(styles.is_dirty());
    }

    #[test]
    fn test_custom_ids_and_builtins() {
        let mut styles = sheet();
        let date = styles.derive(None, &CellFormat::number("mm/dd/yyyy"));
        let plain = styles.derive(None, &CellFormat::number("#,##0"));
        assert_eq!(styles.xfs[date as usize].get("numFmtId"), Some("165"));
        assert_eq!(styles.xfs[plain as usize].get("numFmtId"), Some("3"));
    }

    #[test]
    fn test_rewrite_round_trips() {
        let mut styles = sheet();
        styles.derive(Some(1), &CellFormat::wrapped());
        styles.derive(None, &CellFormat::number("$#,##0"));
        let xml = String::from_utf8(styles.to_xml(STYLES.as_bytes()).expect("xml")).expect("utf8");

        assert!(xml.contains(r#"<numFmts count="2">"#));
        assert!(xml.contains(r#"<numFmt numFmtId="165" formatCode="$#,##0"/>"#));
        assert!(xml.contains(r#"<cellXfs count="5">"#));
        assert!(xml.contains(r#"<alignment horizontal="center" vertical="top" wrapText="1"/><protection locked="0"/>"#));
        assert!(xml.contains(r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#));

        let reparsed = StyleSheet::parse(xml.as_bytes()).expect("reparse");
        assert_eq!(reparsed.xf_count(), 5);
        assert!(reparsed.is_wrapped(3));
        assert_eq!(reparsed.number_format(4), Some("$#,##0"));
    }

    #[test]
    fn test_num_fmts_inserted_when_missing() {
        let xml = br#"<styleSheet><fonts count="1"><font/></fonts><cellXfs count="1"><xf numFmtId="0" fontId="0"/></cellXfs></styleSheet>"#;
        let mut styles = StyleSheet::parse(xml).expect("parse");
        styles.derive(Some(0), &CellFormat::number("mm/dd/yyyy"));
        let out = String::from_utf8(styles.to_xml(xml).expect("xml")).expect("utf8");
        assert!(out.starts_with(
            r#"<styleSheet><numFmts count="1"><numFmt numFmtId="164" formatCode="mm/dd/yyyy"/></numFmts><fonts"#
        ));
        assert!(out.contains(r#"<xf numFmtId="164" fontId="0" applyNumberFormat="1"/>"#));
    }
}
