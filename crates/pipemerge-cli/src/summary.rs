use anyhow::{Context, Result};
use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};
use pipemerge_core::{HeaderReport, MergeAnalysis, MergeReport, ReplacementOutcome};
use pipemerge_ingest::TemplateStructure;
use pipemerge_map::ColumnMapping;
use pipemerge_model::{ColumnSlot, MergeWarning, SlotKind, column_letters};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize report")?;
    println!("{json}");
    Ok(())
}

pub fn print_merge_report(report: &MergeReport) {
    println!("Output: {}", report.output_path.display());
    println!("Raw: {}", report.raw_path.display());
    println!("Template: {}", report.template_path.display());
    print_header(&report.header);
    print_mapping_table(&report.mapping);

    let stats = &report.stats;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Input rows"),
        header_cell("Empty"),
        header_cell("No opportunity"),
        header_cell("Boilerplate"),
        header_cell("Written"),
        header_cell("Total row"),
        header_cell("Kept as-is"),
    ]);
    apply_table_style(&mut table);
    for index in 0..7 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    table.add_row(vec![
        Cell::new(stats.input_rows),
        count_cell(stats.dropped_empty, Color::DarkGrey),
        count_cell(stats.dropped_missing_key, Color::Yellow),
        count_cell(stats.dropped_boilerplate, Color::DarkGrey),
        Cell::new(report.rows_written).add_attribute(Attribute::Bold),
        flag_cell(report.has_total),
        count_cell(stats.coercion_fallbacks, Color::Yellow),
    ]);
    println!("{table}");
    println!(
        "Cleared template rows {}-{}",
        report.write.first_row, report.write.clear_boundary
    );
    print_warnings(&report.warnings);
}

pub fn print_analysis(analysis: &MergeAnalysis) {
    println!("Raw: {}", analysis.raw_path.display());
    println!("Template: {}", analysis.template_path.display());
    print_header(&analysis.header);
    print_mapping_table(&analysis.mapping);
    if !analysis.mapping.unused_columns.is_empty() {
        println!(
            "Unused raw columns: {}",
            analysis.mapping.unused_columns.join(", ")
        );
    }
    print_warnings(&analysis.warnings);
}

pub fn print_slots(structure: &TemplateStructure) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Name"),
        header_cell("Kind"),
        header_cell("Type"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    for slot in &structure.slots {
        table.add_row(slot_row(slot));
    }
    println!("{table}");
    println!(
        "{} data columns, {} forecast columns",
        structure.data_slot_count(),
        structure.calendar_slot_count()
    );
    for name in &structure.duplicate_names {
        eprintln!("warning: column name '{name}' appears more than once");
    }
}

pub fn print_replacement(outcome: &ReplacementOutcome) {
    println!("Installed: {}", outcome.template_path.display());
    match &outcome.backup_path {
        Some(path) => println!("Backup: {}", path.display()),
        None => println!("Backup: none (no previous template)"),
    }
    let data = outcome.slots.iter().filter(|slot| slot.is_data()).count();
    println!(
        "{data} data columns, {} forecast columns",
        outcome.slots.len() - data
    );
}

fn print_header(header: &HeaderReport) {
    if header.low_confidence {
        println!(
            "Raw header: row {} (fallback, {} keyword hits)",
            header.row, header.hits
        );
    } else {
        println!("Raw header: row {} ({} keyword hits)", header.row, header.hits);
    }
}

fn print_mapping_table(mapping: &ColumnMapping) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Col"),
        header_cell("Template column"),
        header_cell("Type"),
        header_cell("Raw column"),
        header_cell("Score"),
        header_cell("Explanation"),
    ]);
    apply_mapping_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Right);
    for entry in &mapping.entries {
        let raw = match (&entry.raw_header, entry.accepted) {
            (Some(header), true) => Cell::new(header).fg(Color::Green),
            _ => Cell::new("unmapped").fg(Color::Yellow),
        };
        table.add_row(vec![
            dim_cell(column_letters(entry.slot_position)),
            Cell::new(&entry.slot_name),
            dim_cell(entry.value_type.as_str()),
            raw,
            Cell::new(entry.score),
            dim_cell(&entry.explanation),
        ]);
    }
    println!("{table}");
    println!(
        "Mapped {}/{} template columns ({:.0}%)",
        mapping.accepted_count(),
        mapping.entries.len(),
        mapping.coverage() * 100.0
    );
}

fn print_warnings(warnings: &[MergeWarning]) {
    if warnings.is_empty() {
        return;
    }
    eprintln!("Warnings:");
    for warning in warnings {
        eprintln!("- {warning}");
    }
}

fn slot_row(slot: &ColumnSlot) -> Vec<Cell> {
    let kind = match slot.kind {
        SlotKind::Data => Cell::new(slot.kind.as_str()),
        SlotKind::Calendar => dim_cell(slot.kind.as_str()),
    };
    vec![
        Cell::new(slot.column_letters()),
        Cell::new(&slot.name),
        kind,
        dim_cell(slot.value_type.as_str()),
    ]
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_mapping_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
    if table.column_count() >= 6 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(5)),
            ColumnConstraint::UpperBoundary(Width::Percentage(25)),
            ColumnConstraint::UpperBoundary(Width::Fixed(14)),
            ColumnConstraint::UpperBoundary(Width::Percentage(25)),
            ColumnConstraint::LowerBoundary(Width::Fixed(5)),
            ColumnConstraint::UpperBoundary(Width::Percentage(40)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn flag_cell(value: bool) -> Cell {
    if value {
        Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
