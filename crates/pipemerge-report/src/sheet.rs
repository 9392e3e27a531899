//! Worksheet cells: a read view for locating regions, and a streaming
//! patcher that rewrites only the cells being changed.
//!
//! Everything outside the patched cells (merged ranges, conditional
//! formats, drawings, untouched rows) passes through the rewrite as-is.

use std::collections::BTreeMap;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::xml::{
    XmlError, attribute, cell_ref, escape_text, local_name, needs_space_preserve, parse_cell_ref,
    prefix_of,
};

// =============================================================================
// READ VIEW
// =============================================================================

/// One existing cell: its style index and displayed text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetCell {
    pub style: Option<u32>,
    /// Shared strings resolved; empty when the cell holds no value.
    pub text: String,
}

/// Existing cells keyed by 1-based row, then 0-based column.
#[derive(Debug, Clone, Default)]
pub struct SheetCells {
    rows: BTreeMap<u32, BTreeMap<u32, SheetCell>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Value,
    InlineText,
}

impl SheetCells {
    pub(crate) fn parse(xml: &[u8], shared_strings: &[String]) -> Result<Self, XmlError> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(false);

        let mut rows: BTreeMap<u32, BTreeMap<u32, SheetCell>> = BTreeMap::new();
        let mut row_num = 0u32;
        let mut next_col = 0u32;
        let mut cell: Option<(u32, Option<String>, SheetCell)> = None;
        let mut capture: Option<Capture> = None;
        let mut phonetic_depth = 0usize;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match local_name(e.name().as_ref()) {
                    b"row" => {
                        row_num = row_number(&e, row_num)?;
                        next_col = 0;
                    }
                    b"c" => {
                        let (col, cell_type, style) = cell_attrs(&e, row_num, next_col)?;
                        next_col = col + 1;
                        cell = Some((
                            col,
                            cell_type,
                            SheetCell {
                                style,
                                text: String::new(),
                            },
                        ));
                    }
                    b"v" if cell.is_some() => capture = Some(Capture::Value),
                    b"rPh" => phonetic_depth += 1,
                    b"t" if cell.is_some() && phonetic_depth == 0 => {
                        capture = Some(Capture::InlineText);
                    }
                    _ => {}
                },
                Event::Empty(e) => match local_name(e.name().as_ref()) {
                    b"row" => {
                        row_num = row_number(&e, row_num)?;
                        next_col = 0;
                    }
                    b"c" => {
                        let (col, _, style) = cell_attrs(&e, row_num, next_col)?;
                        next_col = col + 1;
                        rows.entry(row_num).or_default().insert(
                            col,
                            SheetCell {
                                style,
                                text: String::new(),
                            },
                        );
                    }
                    _ => {}
                },
                Event::Text(e) if capture.is_some() => {
                    if let Some((_, _, current)) = cell.as_mut() {
                        current.text.push_str(&e.unescape()?);
                    }
                }
                Event::End(e) => match local_name(e.name().as_ref()) {
                    b"v" | b"t" => capture = None,
                    b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                    b"c" => {
                        if let Some((col, cell_type, mut current)) = cell.take() {
                            if cell_type.as_deref() == Some("s") {
                                current.text = current
                                    .text
                                    .trim()
                                    .parse::<usize>()
                                    .ok()
                                    .and_then(|index| shared_strings.get(index))
                                    .cloned()
                                    .unwrap_or_default();
                            }
                            rows.entry(row_num).or_default().insert(col, current);
                        }
                        capture = None;
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(Self { rows })
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&SheetCell> {
        self.rows.get(&row).and_then(|cells| cells.get(&col))
    }

    pub fn style(&self, row: u32, col: u32) -> Option<u32> {
        self.get(row, col).and_then(|cell| cell.style)
    }

    pub fn text(&self, row: u32, col: u32) -> &str {
        self.get(row, col).map_or("", |cell| cell.text.as_str())
    }

    /// Text of the leftmost non-blank cell in `row` at or before `label_col`.
    ///
    /// Cells right of the label column (opportunity names, notes) are never
    /// read as row labels.
    pub fn label_text(&self, row: u32, label_col: u32) -> Option<&str> {
        self.rows.get(&row)?.range(..=label_col).find_map(|(_, cell)| {
            let text = cell.text.trim();
            (!text.is_empty()).then_some(text)
        })
    }

    /// Last row holding at least one non-blank value.
    pub fn last_populated_row(&self) -> Option<u32> {
        self.rows
            .iter()
            .rev()
            .find(|(_, cells)| cells.values().any(|cell| !cell.text.trim().is_empty()))
            .map(|(row, _)| *row)
    }

    /// First row at or after `start` whose label mentions "total".
    pub fn find_total_row(&self, start: u32, label_col: u32) -> Option<u32> {
        self.rows.range(start..).map(|(row, _)| *row).find(|row| {
            self.label_text(*row, label_col)
                .is_some_and(|text| text.to_lowercase().contains("total"))
        })
    }
}

fn row_number(start: &BytesStart<'_>, previous: u32) -> Result<u32, XmlError> {
    Ok(attribute(start, b"r")?
        .and_then(|r| r.parse::<u32>().ok())
        .unwrap_or(previous + 1))
}

/// Column, type and style of a `<c>` element. Cells without `r` follow
/// the previous cell.
fn cell_attrs(
    start: &BytesStart<'_>,
    row_num: u32,
    next_col: u32,
) -> Result<(u32, Option<String>, Option<u32>), XmlError> {
    let mut col = next_col;
    let mut cell_type = None;
    let mut style = None;
    for attr in start.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match local_name(attr.key.as_ref()) {
            b"r" => {
                if let Some((row, parsed)) = parse_cell_ref(&value)
                    && row == row_num
                {
                    col = parsed;
                }
            }
            b"t" => cell_type = Some(value.into_owned()),
            b"s" => style = value.parse::<u32>().ok(),
            _ => {}
        }
    }
    Ok((col, cell_type, style))
}

// =============================================================================
// PATCHES
// =============================================================================

/// New content for a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchValue {
    /// Explicit empty cell.
    Clear,
    Number(f64),
    Text(String),
    Bool(bool),
}

/// A single cell edit. Without an explicit style the cell keeps the
/// style it already has.
#[derive(Debug, Clone, PartialEq)]
pub struct CellPatch {
    pub value: PatchValue,
    pub style: Option<u32>,
}

impl CellPatch {
    pub fn clear() -> Self {
        Self {
            value: PatchValue::Clear,
            style: None,
        }
    }

    pub fn value(value: PatchValue) -> Self {
        Self { value, style: None }
    }

    pub fn with_style(mut self, style: u32) -> Self {
        self.style = Some(style);
        self
    }
}

/// Pending edits for one worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetPatch {
    // (1-based row, 0-based col), row-major
    cells: BTreeMap<(u32, u32), CellPatch>,
    row_heights: BTreeMap<u32, f64>,
}

impl SheetPatch {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.row_heights.is_empty()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Insert or replace the edit for one cell.
    pub fn set(&mut self, row: u32, col: u32, patch: CellPatch) {
        self.cells.insert((row, col), patch);
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&CellPatch> {
        self.cells.get(&(row, col))
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_heights.insert(row, height);
    }

    fn by_row(&self) -> BTreeMap<u32, Vec<(u32, &CellPatch)>> {
        let mut out: BTreeMap<u32, Vec<(u32, &CellPatch)>> = BTreeMap::new();
        for (&(row, col), patch) in &self.cells {
            out.entry(row).or_default().push((col, patch));
        }
        for row in self.row_heights.keys() {
            out.entry(*row).or_default();
        }
        out
    }

    /// Bounding box of the patched cells as (min row, min col, max row, max col).
    fn extent(&self) -> Option<(u32, u32, u32, u32)> {
        self.cells.keys().fold(None, |acc, &(row, col)| {
            Some(match acc {
                None => (row, col, row, col),
                Some((r0, c0, r1, c1)) => (r0.min(row), c0.min(col), r1.max(row), c1.max(col)),
            })
        })
    }
}

// =============================================================================
// STREAMING REWRITE
// =============================================================================

struct PatchState<'a> {
    patch: &'a SheetPatch,
    rows: BTreeMap<u32, Vec<(u32, &'a CellPatch)>>,
    pending: Vec<u32>,
    next: usize,
    prefix: String,
}

impl PatchState<'_> {
    fn cells_for(&self, row: u32) -> &[(u32, &CellPatch)] {
        self.rows.get(&row).map(Vec::as_slice).unwrap_or_default()
    }

    /// Write every pending row numbered below `limit`.
    fn flush_before(&mut self, writer: &mut Writer<Vec<u8>>, limit: u32) -> Result<(), XmlError> {
        while self.next < self.pending.len() && self.pending[self.next] < limit {
            let row = self.pending[self.next];
            write_new_row(writer, &self.prefix, row, self.cells_for(row), self.height(row))?;
            self.next += 1;
        }
        Ok(())
    }

    /// Mark `row` as handled if it is the next pending row.
    fn take(&mut self, row: u32) -> bool {
        if self.next < self.pending.len() && self.pending[self.next] == row {
            self.next += 1;
            true
        } else {
            false
        }
    }

    fn height(&self, row: u32) -> Option<f64> {
        self.patch.row_heights.get(&row).copied()
    }
}

/// Apply `patch` to a worksheet part, returning the rewritten XML.
pub(crate) fn patch_sheet_xml(original: &[u8], patch: &SheetPatch) -> Result<Vec<u8>, XmlError> {
    let rows = patch.by_row();
    let mut state = PatchState {
        patch,
        pending: rows.keys().copied().collect(),
        rows,
        next: 0,
        prefix: String::new(),
    };

    let mut reader = Reader::from_reader(original);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(original.len() + patch.cells.len() * 48));
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) if local_name(e.name().as_ref()) == b"dimension" => {
                writer.write_event(Event::Empty(dimension(&e, patch.extent())?))?;
            }
            Event::Start(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                state.prefix = prefix_of(&e);
                writer.write_event(Event::Start(e.into_owned()))?;
                patch_sheet_data(&mut reader, &mut writer, &mut state)?;
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                if state.pending.is_empty() {
                    writer.write_event(Event::Empty(e.into_owned()))?;
                } else {
                    state.prefix = prefix_of(&e);
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    writer.write_event(Event::Start(e.into_owned()))?;
                    state.flush_before(&mut writer, u32::MAX)?;
                    writer.write_event(Event::End(BytesEnd::new(name)))?;
                }
            }
            Event::Eof => break,
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

fn patch_sheet_data<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    writer: &mut Writer<Vec<u8>>,
    state: &mut PatchState<'_>,
) -> Result<(), XmlError> {
    let mut buf = Vec::new();
    let mut last_row = 0u32;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"row" => {
                let row_num = row_number(&e, last_row)?;
                last_row = row_num;
                state.flush_before(writer, row_num)?;
                if state.take(row_num) {
                    let height = state.height(row_num);
                    writer.write_event(Event::Start(row_start(&e, height)?))?;
                    patch_row(reader, writer, &state.prefix, row_num, state.cells_for(row_num))?;
                } else {
                    writer.write_event(Event::Start(e.into_owned()))?;
                }
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"row" => {
                let row_num = row_number(&e, last_row)?;
                last_row = row_num;
                state.flush_before(writer, row_num)?;
                if state.take(row_num) {
                    let height = state.height(row_num);
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    writer.write_event(Event::Start(row_start(&e, height)?))?;
                    for (col, patch) in state.cells_for(row_num) {
                        write_cell(writer, &state.prefix, row_num, *col, patch, None)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(name)))?;
                } else {
                    writer.write_event(Event::Empty(e.into_owned()))?;
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                state.flush_before(writer, u32::MAX)?;
                writer.write_event(Event::End(e.into_owned()))?;
                break;
            }
            Event::Eof => return Err(XmlError::new("unexpected EOF inside sheetData")),
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }
    Ok(())
}

fn patch_row<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    row_num: u32,
    patches: &[(u32, &CellPatch)],
) -> Result<(), XmlError> {
    let mut buf = Vec::new();
    let mut skip = Vec::new();
    let mut next = 0usize;
    let mut next_col = 0u32;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"c" => {
                let (col, _, style) = cell_attrs(&e, row_num, next_col)?;
                next_col = col + 1;
                while next < patches.len() && patches[next].0 < col {
                    write_cell(writer, prefix, row_num, patches[next].0, patches[next].1, None)?;
                    next += 1;
                }
                if next < patches.len() && patches[next].0 == col {
                    reader.read_to_end_into(e.name(), &mut skip)?;
                    skip.clear();
                    write_cell(writer, prefix, row_num, col, patches[next].1, style)?;
                    next += 1;
                } else {
                    writer.write_event(Event::Start(e.into_owned()))?;
                }
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"c" => {
                let (col, _, style) = cell_attrs(&e, row_num, next_col)?;
                next_col = col + 1;
                while next < patches.len() && patches[next].0 < col {
                    write_cell(writer, prefix, row_num, patches[next].0, patches[next].1, None)?;
                    next += 1;
                }
                if next < patches.len() && patches[next].0 == col {
                    write_cell(writer, prefix, row_num, col, patches[next].1, style)?;
                    next += 1;
                } else {
                    writer.write_event(Event::Empty(e.into_owned()))?;
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"row" => {
                for (col, patch) in &patches[next..] {
                    write_cell(writer, prefix, row_num, *col, patch, None)?;
                }
                writer.write_event(Event::End(e.into_owned()))?;
                break;
            }
            Event::Eof => return Err(XmlError::new("unexpected EOF inside row")),
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }
    Ok(())
}

/// Row start tag with `spans` dropped and the height applied.
fn row_start(start: &BytesStart<'_>, height: Option<f64>) -> Result<BytesStart<'static>, XmlError> {
    let mut row = BytesStart::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        match local_name(attr.key.as_ref()) {
            b"spans" => {}
            b"ht" | b"customHeight" if height.is_some() => {}
            _ => row.push_attribute(attr),
        }
    }
    if let Some(height) = height {
        row.push_attribute(("ht", height.to_string().as_str()));
        row.push_attribute(("customHeight", "1"));
    }
    Ok(row)
}

fn write_new_row(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    row_num: u32,
    patches: &[(u32, &CellPatch)],
    height: Option<f64>,
) -> Result<(), XmlError> {
    let name = format!("{prefix}row");
    let mut row = BytesStart::new(name.as_str());
    row.push_attribute(("r", row_num.to_string().as_str()));
    if let Some(height) = height {
        row.push_attribute(("ht", height.to_string().as_str()));
        row.push_attribute(("customHeight", "1"));
    }
    if patches.is_empty() {
        writer.write_event(Event::Empty(row))?;
        return Ok(());
    }
    writer.write_event(Event::Start(row))?;
    for (col, patch) in patches {
        write_cell(writer, prefix, row_num, *col, patch, None)?;
    }
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}

fn write_cell(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    row_num: u32,
    col: u32,
    patch: &CellPatch,
    existing_style: Option<u32>,
) -> Result<(), XmlError> {
    let mut cell = format!(r#"<{prefix}c r="{}""#, cell_ref(row_num, col));
    if let Some(style) = patch.style.or(existing_style).filter(|s| *s != 0) {
        cell.push_str(&format!(r#" s="{style}""#));
    }

    let (cell_type, body) = match &patch.value {
        PatchValue::Clear => (None, String::new()),
        PatchValue::Number(n) => (None, format!("<{prefix}v>{n}</{prefix}v>")),
        PatchValue::Bool(b) => (
            Some("b"),
            format!("<{prefix}v>{}</{prefix}v>", if *b { 1 } else { 0 }),
        ),
        PatchValue::Text(text) => {
            let space = if needs_space_preserve(text) {
                r#" xml:space="preserve""#
            } else {
                ""
            };
            (
                Some("inlineStr"),
                format!(
                    "<{prefix}is><{prefix}t{space}>{}</{prefix}t></{prefix}is>",
                    escape_text(text)
                ),
            )
        }
    };

    if let Some(cell_type) = cell_type {
        cell.push_str(&format!(r#" t="{cell_type}""#));
    }
    if body.is_empty() {
        cell.push_str("/>");
    } else {
        cell.push('>');
        cell.push_str(&body);
        cell.push_str(&format!("</{prefix}c>"));
    }

    writer.get_mut().extend_from_slice(cell.as_bytes());
    Ok(())
}

/// `<dimension>` grown to cover the patched region.
fn dimension(
    start: &BytesStart<'_>,
    extent: Option<(u32, u32, u32, u32)>,
) -> Result<BytesStart<'static>, XmlError> {
    let original = attribute(start, b"ref")?.unwrap_or_default();
    let mut bounds = original.split_once(':').map_or_else(
        || parse_cell_ref(&original).map(|(r, c)| (r, c, r, c)),
        |(first, last)| {
            let (r0, c0) = parse_cell_ref(first)?;
            let (r1, c1) = parse_cell_ref(last)?;
            Some((r0, c0, r1, c1))
        },
    );
    if let Some((pr0, pc0, pr1, pc1)) = extent {
        bounds = Some(match bounds {
            Some((r0, c0, r1, c1)) => (r0.min(pr0), c0.min(pc0), r1.max(pr1), c1.max(pc1)),
            None => (pr0, pc0, pr1, pc1),
        });
    }

    let reference = match bounds {
        Some((r0, c0, r1, c1)) if (r0, c0) == (r1, c1) => cell_ref(r0, c0),
        Some((r0, c0, r1, c1)) => format!("{}:{}", cell_ref(r0, c0), cell_ref(r1, c1)),
        None => original,
    };

    let mut out = BytesStart::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        if local_name(attr.key.as_ref()) != b"ref" {
            out.push_attribute(attr);
        }
    }
    out.push_attribute(("ref", reference.as_str()));
    Ok(out)
}
