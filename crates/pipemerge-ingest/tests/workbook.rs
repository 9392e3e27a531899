use std::path::{Path, PathBuf};

use pipemerge_ingest::{
    IngestError, StructureError, locate_header, read_raw_sheet, read_template_structure,
};
use pipemerge_model::{CellValue, HeaderSearchOptions, SlotKind, TemplateLayout, ValueType};
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

fn write_template(dir: &Path) -> PathBuf {
    let path = dir.join("template.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Pipeline").expect("sheet name");
    sheet.write_string(0, 1, "Pipeline Report").expect("title");
    let headers = [
        "Capture Manager",
        "Opportunity Name",
        "SF Number",
        "Ceiling Value",
        "Award Date",
        "Jan 2025",
        "Feb 2025",
    ];
    for (offset, name) in headers.iter().enumerate() {
        sheet
            .write_string(3, 1 + offset as u16, *name)
            .expect("header");
    }
    workbook.save(&path).expect("save template");
    path
}

fn write_raw(dir: &Path) -> PathBuf {
    let path = dir.join("raw.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(2, 0, "Pipeline by Capture Manager").expect("title");
    sheet
        .write_string(4, 0, "Stage equals Capture, Qualification")
        .expect("filter");
    let headers = ["", "Capture Manager", "Opportunity", "SF ID", "Stage"];
    for (col, name) in headers.iter().enumerate() {
        if !name.is_empty() {
            sheet.write_string(13, col as u16, *name).expect("header");
        }
    }
    sheet.write_string(14, 1, "Smith").expect("value");
    sheet.write_string(14, 2, "Alpha Program").expect("value");
    sheet.write_number(14, 3, 1234567.0).expect("value");
    workbook.save(&path).expect("save raw");
    path
}

#[test]
fn reads_template_slots() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_template(dir.path());
    let structure =
        read_template_structure(&path, &TemplateLayout::new("Pipeline", 4, 5)).expect("structure");

    assert_eq!(structure.slots.len(), 7);
    assert_eq!(structure.data_slot_count(), 5);
    assert_eq!(structure.slots[0].position, 1);
    assert_eq!(structure.slots[3].value_type, ValueType::Currency);
    assert_eq!(structure.slots[4].value_type, ValueType::Date);
    assert_eq!(structure.slots[5].kind, SlotKind::Calendar);
}

#[test]
fn missing_template_sheet_is_a_structure_error() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_template(dir.path());
    let err = read_template_structure(&path, &TemplateLayout::new("Forecast", 4, 5))
        .expect_err("missing sheet");
    match err {
        IngestError::Structure { source, .. } => assert_eq!(
            source,
            StructureError::SheetNotFound {
                sheet: "Forecast".to_string()
            }
        ),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn raw_grid_keeps_physical_rows() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_raw(dir.path());
    let sheet = read_raw_sheet(&path, None).expect("raw sheet");

    assert_eq!(sheet.cell(13, 1), &CellValue::text("Capture Manager"));
    assert_eq!(sheet.cell(14, 3), &CellValue::Number(1234567.0));

    let location = locate_header(&sheet, &HeaderSearchOptions::default());
    assert_eq!(location.header_row, 13);
    assert_eq!(location.data_start_row, 14);
    assert!(!location.low_confidence);
}

#[test]
fn missing_file_is_reported() {
    let err = read_raw_sheet(Path::new("does-not-exist.xlsx"), None).expect_err("missing");
    assert!(matches!(err, IngestError::FileNotFound { .. }));
}
