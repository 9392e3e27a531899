use pipemerge_ingest::locate_header;
use pipemerge_model::{CellValue, HeaderSearchOptions, RawSheet};
use proptest::prelude::*;

const PREAMBLE: &[&str] = &[
    "Pipeline Report",
    "Run on 10/01/2026",
    "Stage equals Capture, Qualify",
    "Region: East",
    "",
];

const HEADER: &[&str] = &["", "Capture Manager", "Opportunity", "SF ID", "Stage", "Ceiling"];
const DATA: &[&str] = &["", "Smith", "Alpha Recompete", "006A1", "Capture", "$1,000"];

fn row(cells: &[&str]) -> Vec<CellValue> {
    cells
        .iter()
        .map(|cell| {
            if cell.is_empty() {
                CellValue::Empty
            } else {
                CellValue::text(*cell)
            }
        })
        .collect()
}

fn sheet(preamble: &[usize], data_rows: usize) -> RawSheet {
    let mut rows: Vec<Vec<CellValue>> = preamble
        .iter()
        .map(|index| row(&["", PREAMBLE[*index]]))
        .collect();
    rows.push(row(HEADER));
    rows.extend((0..data_rows).map(|_| row(DATA)));
    RawSheet::new("Export", rows)
}

proptest! {
    #[test]
    fn header_is_found_below_any_preamble(
        preamble in prop::collection::vec(0..PREAMBLE.len(), 0..20),
        data_rows in 0usize..10,
    ) {
        let location = locate_header(&sheet(&preamble, data_rows), &HeaderSearchOptions::default());
        prop_assert!(!location.low_confidence);
        prop_assert_eq!(location.header_row, preamble.len());
        prop_assert_eq!(location.data_start_row, preamble.len() + 1);
        prop_assert_eq!(location.hits, 4);
    }
}

#[test]
fn header_outside_scan_window_falls_back() {
    let preamble = vec![0; 25];
    let location = locate_header(&sheet(&preamble, 3), &HeaderSearchOptions::default());
    assert!(location.low_confidence);
    assert_eq!(location.header_row, 13);
}
