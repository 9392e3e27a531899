use pipemerge_map::ColumnMapper;
use pipemerge_model::{CellValue, ColumnSlot, MappingOptions, RawColumn};
use proptest::prelude::*;

const TEMPLATE: &[&str] = &[
    "Capture Manager",
    "Opportunity Name",
    "SF Number",
    "GovWin ID",
    "Stage",
    "Positioning",
    "Ceiling Value",
    "Anticipated Award Date",
    "MAG",
];

const RAW_POOL: &[&str] = &[
    "Capture Manager",
    "Opportunity",
    "Opportunity Name",
    "SF ID",
    "Salesforce Opportunity ID",
    "GovWin IQ Opportunity ID",
    "Stage",
    "Positioning",
    "Contract Value",
    "Ceiling",
    "Award Date",
    "Anticipated Award Date",
    "MAG",
    "Probability (%)",
    "Owner",
    "",
];

fn template_slots() -> Vec<ColumnSlot> {
    TEMPLATE
        .iter()
        .enumerate()
        .map(|(offset, name)| ColumnSlot::data(*name, offset as u32 + 1))
        .collect()
}

fn raw_columns(headers: &[&str]) -> Vec<RawColumn> {
    headers
        .iter()
        .enumerate()
        .map(|(index, header)| RawColumn {
            index,
            header_text: (*header).to_string(),
        })
        .collect()
}

#[test]
fn maps_realistic_export() {
    let columns = raw_columns(&[
        "",
        "Capture Manager",
        "Opportunity",
        "SF ID",
        "GovWin IQ Opportunity ID",
        "Stage",
        "Positioning",
        "Contract Value",
        "Anticipated Award Date",
        "Probability (%)",
    ]);
    let rows = vec![vec![
        CellValue::Empty,
        CellValue::text("Smith"),
        CellValue::text("Alpha"),
        CellValue::text("006A000001"),
        CellValue::Number(1234567.0),
        CellValue::text("Qualify"),
        CellValue::text("Prime"),
        CellValue::text("$1,250,000"),
        CellValue::text("06/30/2026"),
        CellValue::text("50%"),
    ]];
    let mapping = ColumnMapper::new(&MappingOptions::default()).map(&template_slots(), &columns, &rows);

    let by_name = |name: &str| {
        mapping
            .entries
            .iter()
            .find(|entry| entry.slot_name == name)
            .and_then(|entry| entry.raw_header.clone())
    };
    assert_eq!(by_name("Capture Manager").as_deref(), Some("Capture Manager"));
    assert_eq!(by_name("Opportunity Name").as_deref(), Some("Opportunity"));
    assert_eq!(by_name("SF Number").as_deref(), Some("SF ID"));
    assert_eq!(by_name("GovWin ID").as_deref(), Some("GovWin IQ Opportunity ID"));
    assert_eq!(by_name("Stage").as_deref(), Some("Stage"));
    assert_eq!(by_name("Ceiling Value").as_deref(), Some("Contract Value"));
    assert_eq!(
        by_name("Anticipated Award Date").as_deref(),
        Some("Anticipated Award Date")
    );
    assert_eq!(by_name("MAG"), None);
    assert!(
        mapping
            .unused_columns
            .iter()
            .all(|header| header != "Capture Manager")
    );
}

proptest! {
    #[test]
    fn mapping_is_deterministic(picks in proptest::collection::vec(0..RAW_POOL.len(), 0..12)) {
        let headers: Vec<&str> = picks.iter().map(|i| RAW_POOL[*i]).collect();
        let columns = raw_columns(&headers);
        let mapper = ColumnMapper::new(&MappingOptions::default());
        let first = mapper.map(&template_slots(), &columns, &[]);
        let second = mapper.map(&template_slots(), &columns, &[]);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn raw_columns_are_never_shared(picks in proptest::collection::vec(0..RAW_POOL.len(), 0..12)) {
        let headers: Vec<&str> = picks.iter().map(|i| RAW_POOL[*i]).collect();
        let columns = raw_columns(&headers);
        let mapping = ColumnMapper::new(&MappingOptions::default()).map(&template_slots(), &columns, &[]);
        let mut used: Vec<usize> = mapping.entries.iter().filter_map(|entry| entry.raw_index).collect();
        let total = used.len();
        used.sort_unstable();
        used.dedup();
        prop_assert_eq!(used.len(), total);
        for entry in &mapping.entries {
            prop_assert_eq!(entry.accepted, entry.raw_index.is_some());
            if entry.accepted {
                prop_assert!(entry.score >= 10);
            }
        }
    }
}
