//! Raw header detection by keyword voting.
//!
//! Pipeline exports start with a variable preamble (report title, filter
//! summary, run date) so the header row moves between exports. Each early row
//! is scored by how many of its cells mention a pipeline keyword.

use pipemerge_model::{CellValue, HeaderSearchOptions, RawColumn, RawSheet};
use tracing::{debug, warn};

/// Keywords this short only match whole tokens ("sf" must not hit "pdf").
const SHORT_KEYWORD_LEN: usize = 3;

/// Where the raw header was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLocation {
    /// Zero-based header row.
    pub header_row: usize,
    /// Zero-based first data row.
    pub data_start_row: usize,
    /// Keyword hits on the chosen row.
    pub hits: usize,
    /// True when no row qualified and the fallback row was used.
    pub low_confidence: bool,
}

/// Find the header row of a raw sheet.
///
/// The row with the most keyword hits wins when it reaches
/// `min_keyword_hits`; the earliest such row breaks ties. Without a
/// qualifying row the configured fallback is returned as low confidence.
pub fn locate_header(sheet: &RawSheet, options: &HeaderSearchOptions) -> HeaderLocation {
    let window = options.scan_rows.min(sheet.row_count());
    let mut best: Option<(usize, usize)> = None;

    for row_index in 0..window {
        let cells = sheet.row(row_index).unwrap_or(&[]);
        let hits = keyword_hits(cells, options);
        debug!(row = row_index + 1, hits, "raw header candidate");
        if hits < options.min_keyword_hits {
            continue;
        }
        if best.is_none_or(|(_, best_hits)| hits > best_hits) {
            best = Some((row_index, hits));
        }
    }

    match best {
        Some((header_row, hits)) => HeaderLocation {
            header_row,
            data_start_row: header_row + 1,
            hits,
            low_confidence: false,
        },
        None => {
            let header_row = options.fallback_row.saturating_sub(1);
            warn!(
                fallback_row = options.fallback_row,
                scanned = window,
                "no raw header row reached the keyword threshold"
            );
            HeaderLocation {
                header_row,
                data_start_row: header_row + 1,
                hits: sheet
                    .row(header_row)
                    .map_or(0, |cells| keyword_hits(cells, options)),
                low_confidence: true,
            }
        }
    }
}

/// Number of cells in `cells` mentioning at least one keyword.
pub fn keyword_hits(cells: &[CellValue], options: &HeaderSearchOptions) -> usize {
    cells
        .iter()
        .filter(|cell| {
            let text = cell.display_trimmed().to_lowercase();
            !text.is_empty()
                && !options
                    .ignore_terms
                    .iter()
                    .any(|term| text.contains(&term.to_lowercase()))
                && options
                    .keywords
                    .iter()
                    .any(|keyword| contains_keyword(&text, &keyword.to_lowercase()))
        })
        .count()
}

/// Substring match, or whole-token match for short keywords.
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    if keyword.is_empty() {
        return false;
    }
    if keyword.len() <= SHORT_KEYWORD_LEN {
        text.split(|c: char| !c.is_alphanumeric())
            .any(|token| token == keyword)
    } else {
        text.contains(keyword)
    }
}

/// Raw columns at the located header row.
pub fn raw_columns(sheet: &RawSheet, location: &HeaderLocation) -> Vec<RawColumn> {
    sheet.columns_at(location.header_row)
}
