use std::path::{Path, PathBuf};

use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::NaiveDate;
use pipemerge_model::{CellValue, ColumnSlot, Row, TemplateLayout, WriterOptions};
use pipemerge_report::{ReportError, TemplateWorkbook, TemplateWriter, date_serial};
use rust_xlsxwriter::{Format, FormatBorder, Workbook};
use tempfile::TempDir;

const HEADERS: [&str; 5] = [
    "Capture Manager",
    "Opportunity",
    "Ceiling Value",
    "Award Date",
    "Jan 2025",
];

fn slots() -> Vec<ColumnSlot> {
    vec![
        ColumnSlot::data(HEADERS[0], 1),
        ColumnSlot::data(HEADERS[1], 2),
        ColumnSlot::data(HEADERS[2], 3),
        ColumnSlot::data(HEADERS[3], 4),
        ColumnSlot::calendar(HEADERS[4], 5),
    ]
}

fn layout() -> TemplateLayout {
    TemplateLayout::new("Pipeline", 4, 5)
}

/// Template with old data in rows 5-7, a Total row at 9 and a footnote at 11.
fn write_template(dir: &Path, with_total: bool) -> PathBuf {
    let path = dir.join("template.xlsx");
    let bordered = Format::new().set_border(FormatBorder::Thin);
    let mut workbook = Workbook::new();

    let notes = workbook.add_worksheet();
    notes.set_name("Notes").expect("sheet name");
    notes.write_string(0, 0, "Read me").expect("note");

    let sheet = workbook.add_worksheet();
    sheet.set_name("Pipeline").expect("sheet name");
    sheet.write_string(0, 1, "Pipeline Report").expect("title");
    for (offset, name) in HEADERS.iter().enumerate() {
        sheet
            .write_string(3, 1 + offset as u16, *name)
            .expect("header");
    }
    for row in 4..7u32 {
        sheet
            .write_string_with_format(row, 1, format!("Old owner {row}"), &bordered)
            .expect("old owner");
        sheet
            .write_string_with_format(row, 2, "Old opportunity", &bordered)
            .expect("old opportunity");
        sheet
            .write_number_with_format(row, 3, 500.0, &bordered)
            .expect("old value");
        sheet
            .write_number_with_format(row, 5, 10.0, &bordered)
            .expect("old forecast");
    }
    if with_total {
        sheet.write_string(8, 1, "Total").expect("total");
        sheet.write_formula(8, 3, "=SUM(D5:D8)").expect("formula");
        sheet
            .write_string(10, 1, "Source: pipeline export")
            .expect("footnote");
    }
    workbook.save(&path).expect("save template");
    path
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
}

fn rows() -> Vec<Row> {
    vec![
        Row::new(vec![
            CellValue::text("Adams"),
            CellValue::text("Alpha Program Recompete"),
            CellValue::Number(1_250_000.0),
            CellValue::Date(date(2026, 6, 30)),
        ]),
        Row::new(vec![
            CellValue::text("Total"),
            CellValue::text("2"),
            CellValue::Empty,
            CellValue::Empty,
        ]),
    ]
}

fn write_output(template: &Path, output: &Path) -> pipemerge_report::WriteSummary {
    let mut workbook = TemplateWorkbook::open(template, "Pipeline").expect("open template");
    let summary = TemplateWriter::new(&WriterOptions::default())
        .write(&mut workbook, &layout(), &slots(), &rows())
        .expect("write rows");
    workbook.save(output).expect("save output");
    summary
}

fn read_pipeline(path: &Path) -> calamine::Range<Data> {
    let mut workbook: Xlsx<_> = open_workbook(path).expect("open output");
    workbook.worksheet_range("Pipeline").expect("pipeline sheet")
}

fn is_blank(range: &calamine::Range<Data>, row: u32, col: u32) -> bool {
    range
        .get_value((row, col))
        .is_none_or(|value| *value == Data::Empty)
}

#[test]
fn writes_rows_and_clears_old_region() {
    let dir = TempDir::new().expect("temp dir");
    let template = write_template(dir.path(), true);
    let output = dir.path().join("out.xlsx");
    let summary = write_output(&template, &output);

    assert_eq!(summary.first_row, 5);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.template_total_row, Some(9));
    assert_eq!(summary.clear_boundary, 8);

    let range = read_pipeline(&output);
    assert_eq!(
        range.get_value((4, 1)),
        Some(&Data::String("Adams".to_string()))
    );
    assert_eq!(range.get_value((4, 3)), Some(&Data::Float(1_250_000.0)));
    let award = match range.get_value((4, 4)) {
        Some(Data::DateTime(value)) => value.as_f64(),
        Some(Data::Float(value)) => *value,
        other => panic!("unexpected award date cell: {other:?}"),
    };
    assert_eq!(award, date_serial(date(2026, 6, 30)));
    assert!(is_blank(&range, 4, 5), "forecast cell cleared");

    assert_eq!(
        range.get_value((5, 1)),
        Some(&Data::String("Total".to_string()))
    );
    for col in 1..=5 {
        assert!(is_blank(&range, 6, col), "old row 7 cleared in column {col}");
    }

    assert_eq!(
        range.get_value((8, 1)),
        Some(&Data::String("Total".to_string()))
    );
    assert_eq!(
        range.get_value((10, 1)),
        Some(&Data::String("Source: pipeline export".to_string()))
    );
    assert_eq!(
        range.get_value((3, 3)),
        Some(&Data::String("Ceiling Value".to_string()))
    );
}

#[test]
fn applies_column_formats() {
    let dir = TempDir::new().expect("temp dir");
    let template = write_template(dir.path(), true);
    let output = dir.path().join("out.xlsx");
    write_output(&template, &output);

    let written = TemplateWorkbook::open(&output, "Pipeline").expect("reopen");
    let styles = written.styles();
    let style = |col| written.cells().style(5, col).expect("styled cell");

    assert_eq!(styles.number_format(style(3)), Some("$#,##0"));
    assert_eq!(styles.number_format(style(4)), Some("mm/dd/yyyy"));
    assert!(styles.is_wrapped(style(2)));
    assert!(!styles.is_wrapped(style(1)));
}

#[test]
fn leaves_other_sheets_alone() {
    let dir = TempDir::new().expect("temp dir");
    let template = write_template(dir.path(), true);
    let output = dir.path().join("out.xlsx");
    write_output(&template, &output);

    let mut workbook: Xlsx<_> = open_workbook(&output).expect("open output");
    assert_eq!(workbook.sheet_names(), vec!["Notes", "Pipeline"]);
    let notes = workbook.worksheet_range("Notes").expect("notes sheet");
    assert_eq!(
        notes.get_value((0, 0)),
        Some(&Data::String("Read me".to_string()))
    );
}

#[test]
fn clears_to_last_populated_row_without_total() {
    let dir = TempDir::new().expect("temp dir");
    let template = write_template(dir.path(), false);
    let output = dir.path().join("out.xlsx");

    let mut workbook = TemplateWorkbook::open(&template, "Pipeline").expect("open template");
    let summary = TemplateWriter::new(&WriterOptions::default())
        .write(&mut workbook, &layout(), &slots(), &rows()[..1])
        .expect("write rows");
    workbook.save(&output).expect("save output");

    assert_eq!(summary.template_total_row, None);
    assert_eq!(summary.clear_boundary, 7);
    assert_eq!(summary.cells_cleared, 15);

    let range = read_pipeline(&output);
    assert_eq!(
        range.get_value((4, 1)),
        Some(&Data::String("Adams".to_string()))
    );
    for row in 5..=6 {
        for col in 1..=5 {
            assert!(is_blank(&range, row, col), "cell ({row}, {col}) cleared");
        }
    }
}

#[test]
fn total_in_opportunity_name_does_not_stop_clearing() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("template.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Pipeline").expect("sheet name");
    for (offset, name) in HEADERS.iter().enumerate() {
        sheet
            .write_string(3, 1 + offset as u16, *name)
            .expect("header");
    }
    sheet.write_string(4, 1, "Old A").expect("old owner");
    sheet.write_string(4, 2, "Old opportunity").expect("old opportunity");
    sheet
        .write_string(5, 2, "Total Ship Support Services")
        .expect("owner-less opportunity");
    sheet.write_number(5, 3, 750.0).expect("old value");
    sheet.write_string(6, 1, "Old C").expect("old owner");
    sheet.write_string(6, 2, "Old opportunity").expect("old opportunity");
    sheet.write_string(8, 1, "Total").expect("total");
    workbook.save(&path).expect("save template");

    let output = dir.path().join("out.xlsx");
    let mut workbook = TemplateWorkbook::open(&path, "Pipeline").expect("open template");
    let summary = TemplateWriter::new(&WriterOptions::default())
        .write(&mut workbook, &layout(), &slots(), &rows()[..1])
        .expect("write rows");
    workbook.save(&output).expect("save output");

    assert_eq!(summary.template_total_row, Some(9));
    assert_eq!(summary.clear_boundary, 8);

    let range = read_pipeline(&output);
    assert_eq!(
        range.get_value((4, 1)),
        Some(&Data::String("Adams".to_string()))
    );
    for row in 5..=7 {
        for col in 1..=5 {
            assert!(is_blank(&range, row, col), "cell ({row}, {col}) cleared");
        }
    }
    assert_eq!(
        range.get_value((8, 1)),
        Some(&Data::String("Total".to_string()))
    );
}

#[test]
fn missing_sheet_is_reported() {
    let dir = TempDir::new().expect("temp dir");
    let template = write_template(dir.path(), true);
    let err = TemplateWorkbook::open(&template, "Forecast").expect_err("missing sheet");
    match err {
        ReportError::SheetNotFound { sheet, available } => {
            assert_eq!(sheet, "Forecast");
            assert_eq!(available, "Notes, Pipeline");
        }
        other => panic!("unexpected error: {other}"),
    }
}
