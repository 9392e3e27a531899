//! An editable copy of a template workbook.
//!
//! The package is held in memory; only the target worksheet, the style
//! sheet and the calculation bookkeeping parts are rewritten on save.

use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::package::XlsxPackage;
use crate::shared_strings::parse_shared_strings;
use crate::sheet::{SheetCells, SheetPatch, patch_sheet_xml};
use crate::styles::StyleSheet;
use crate::xml::{XmlError, attribute, local_name};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// Template workbook opened for editing one worksheet.
#[derive(Debug, Clone)]
pub struct TemplateWorkbook {
    source: PathBuf,
    package: XlsxPackage,
    sheet_names: Vec<String>,
    sheet_name: String,
    sheet_part: String,
    shared_strings: Vec<String>,
    cells: SheetCells,
    styles: StyleSheet,
}

impl TemplateWorkbook {
    /// Load `path` and select the worksheet named `sheet_name`.
    pub fn open(path: &Path, sheet_name: &str) -> Result<Self> {
        let package = XlsxPackage::open(path)?;

        let workbook_xml = package.text(WORKBOOK_PART)?;
        let sheets =
            read_sheets(&workbook_xml).map_err(|e| ReportError::xml(WORKBOOK_PART, e))?;
        let sheet_names: Vec<String> = sheets.iter().map(|(name, _)| name.clone()).collect();
        let Some((_, rel_id)) = sheets.iter().find(|(name, _)| name == sheet_name) else {
            return Err(ReportError::SheetNotFound {
                sheet: sheet_name.to_string(),
                available: sheet_names.join(", "),
            });
        };

        let rels_xml = package.text(WORKBOOK_RELS_PART)?;
        let target = relationship_target(&rels_xml, rel_id)
            .map_err(|e| ReportError::xml(WORKBOOK_RELS_PART, e))?
            .ok_or_else(|| ReportError::MissingPart {
                part: format!("worksheet relationship {rel_id}"),
            })?;
        let sheet_part = resolve_target(&target);

        let shared_strings = match package.optional_text(SHARED_STRINGS_PART)? {
            Some(xml) => parse_shared_strings(xml.as_bytes())
                .map_err(|e| ReportError::xml(SHARED_STRINGS_PART, e))?,
            None => Vec::new(),
        };
        let styles = StyleSheet::parse(package.text(STYLES_PART)?.as_bytes())
            .map_err(|e| ReportError::xml(STYLES_PART, e))?;
        let cells = SheetCells::parse(package.text(&sheet_part)?.as_bytes(), &shared_strings)
            .map_err(|e| ReportError::xml(&sheet_part, e))?;

        debug!(
            path = %path.display(),
            sheet = sheet_name,
            part = %sheet_part,
            shared_strings = shared_strings.len(),
            cell_formats = styles.xf_count(),
            "opened template workbook"
        );

        Ok(Self {
            source: path.to_path_buf(),
            package,
            sheet_names,
            sheet_name: sheet_name.to_string(),
            sheet_part,
            shared_strings,
            cells,
            styles,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Package path of the selected worksheet, e.g. `xl/worksheets/sheet1.xml`.
    pub fn sheet_part(&self) -> &str {
        &self.sheet_part
    }

    /// Current cells of the selected worksheet.
    pub fn cells(&self) -> &SheetCells {
        &self.cells
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    pub fn styles_mut(&mut self) -> &mut StyleSheet {
        &mut self.styles
    }

    /// Apply cell edits to the selected worksheet.
    pub fn apply(&mut self, patch: &SheetPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let part = self.sheet_part.clone();
        let original = self.package.text(&part)?;
        let patched =
            patch_sheet_xml(original.as_bytes(), patch).map_err(|e| ReportError::xml(&part, e))?;
        self.cells = SheetCells::parse(&patched, &self.shared_strings)
            .map_err(|e| ReportError::xml(&part, e))?;
        self.package.set(&part, patched);
        Ok(())
    }

    /// Write the edited workbook to `path`.
    ///
    /// The calculation chain is dropped and a full recalculation is
    /// requested on load, since cleared cells may have held formulas.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if self.styles.is_dirty() {
            let original = self.package.text(STYLES_PART)?;
            let xml = self
                .styles
                .to_xml(original.as_bytes())
                .map_err(|e| ReportError::xml(STYLES_PART, e))?;
            self.package.set(STYLES_PART, xml);
        }

        self.drop_calc_chain()?;
        self.request_full_calc()?;

        self.package.save(path)?;
        debug!(path = %path.display(), "saved workbook");
        Ok(())
    }

    fn drop_calc_chain(&mut self) -> Result<()> {
        if !self.package.remove(CALC_CHAIN_PART) {
            return Ok(());
        }

        let types = self.package.text(CONTENT_TYPES_PART)?;
        let types = remove_empty_elements(types.as_bytes(), b"Override", |e| {
            Ok(attribute(e, b"PartName")?.as_deref() == Some("/xl/calcChain.xml"))
        })
        .map_err(|e| ReportError::xml(CONTENT_TYPES_PART, e))?;
        self.package.set(CONTENT_TYPES_PART, types);

        let rels = self.package.text(WORKBOOK_RELS_PART)?;
        let rels = remove_empty_elements(rels.as_bytes(), b"Relationship", |e| {
            Ok(attribute(e, b"Type")?.is_some_and(|kind| kind.ends_with("/calcChain")))
        })
        .map_err(|e| ReportError::xml(WORKBOOK_RELS_PART, e))?;
        self.package.set(WORKBOOK_RELS_PART, rels);

        debug!("dropped calculation chain");
        Ok(())
    }

    fn request_full_calc(&mut self) -> Result<()> {
        let original = self.package.text(WORKBOOK_PART)?;
        let xml = set_full_calc_on_load(original.as_bytes())
            .map_err(|e| ReportError::xml(WORKBOOK_PART, e))?;
        self.package.set(WORKBOOK_PART, xml);
        Ok(())
    }
}

/// `(name, relationship id)` of every sheet in workbook order.
fn read_sheets(xml: &str) -> std::result::Result<Vec<(String, String)>, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"sheet" => {
                let name = attribute(&e, b"name")?;
                let rel_id = attribute(&e, b"id")?;
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

fn relationship_target(xml: &str, rel_id: &str) -> std::result::Result<Option<String>, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e)
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                if attribute(&e, b"Id")?.as_deref() == Some(rel_id) {
                    return attribute(&e, b"Target");
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Package path for a workbook relationship target.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

/// Copy `xml`, leaving out empty `element`s matching `remove`.
fn remove_empty_elements(
    xml: &[u8],
    element: &[u8],
    remove: impl Fn(&BytesStart<'_>) -> std::result::Result<bool, XmlError>,
) -> std::result::Result<Vec<u8>, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) if local_name(e.name().as_ref()) == element => {
                if !remove(&e)? {
                    writer.write_event(Event::Empty(e.into_owned()))?;
                }
            }
            Event::Eof => break,
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

/// Set `fullCalcOnLoad="1"` on an existing `calcPr`.
fn set_full_calc_on_load(xml: &[u8]) -> std::result::Result<Vec<u8>, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 24));
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) if local_name(e.name().as_ref()) == b"calcPr" => {
                writer.write_event(Event::Empty(with_full_calc(&e)?))?;
            }
            Event::Start(e) if local_name(e.name().as_ref()) == b"calcPr" => {
                writer.write_event(Event::Start(with_full_calc(&e)?))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

fn with_full_calc(start: &BytesStart<'_>) -> std::result::Result<BytesStart<'static>, XmlError> {
    let mut out = BytesStart::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        if local_name(attr.key.as_ref()) != b"fullCalcOnLoad" {
            out.push_attribute(attr);
        }
    }
    out.push_attribute(("fullCalcOnLoad", "1"));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_sheets_and_targets() {
        let workbook = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Notes" sheetId="1" r:id="rId1"/><sheet name="Pipeline" sheetId="2" r:id="rId2"/></sheets></workbook>"#;
        let sheets = read_sheets(workbook).expect("sheets");
        assert_eq!(sheets[1], ("Pipeline".to_string(), "rId2".to_string()));

        let rels = r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Target="/xl/worksheets/sheet2.xml"/></Relationships>"#;
        let target = relationship_target(rels, "rId2").expect("rels");
        assert_eq!(target.as_deref(), Some("/xl/worksheets/sheet2.xml"));
        assert_eq!(resolve_target("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert!(relationship_target(rels, "rId9").expect("rels").is_none());
    }

    #[test]
    fn test_calc_chain_entries_removed() {
        let types = br#"<Types><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="a"/><Override PartName="/xl/calcChain.xml" ContentType="b"/></Types>"#;
        let out = remove_empty_elements(types, b"Override", |e| {
            Ok(attribute(e, b"PartName")?.as_deref() == Some("/xl/calcChain.xml"))
        })
        .expect("filter");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            r#"<Types><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="a"/></Types>"#
        );
    }

    #[test]
    fn test_full_calc_on_load() {
        let xml = br#"<workbook><calcPr calcId="191029" fullCalcOnLoad="0"/></workbook>"#;
        let out = String::from_utf8(set_full_calc_on_load(xml).expect("calc")).expect("utf8");
        assert_eq!(
            out,
            r#"<workbook><calcPr calcId="191029" fullCalcOnLoad="1"/></workbook>"#
        );
    }
}
