use std::path::PathBuf;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cohort_model::{QualityReport, WarningKind};

use crate::types::RunResult;

pub fn print_summary(result: &RunResult) {
    println!("Config: {}", result.config_path.display());
    if result.dry_run {
        println!("Dry run: no files written");
    }
    println!(
        "Rows: {}  Snapshot columns: {}  Encoded columns: {}",
        result.rows, result.snapshot_columns, result.encoded_columns
    );
    print_source_table(&result.report);
    print_column_table(&result.report);
    print_warnings(&result.report);
    print_outputs(result);
}

fn print_source_table(report: &QualityReport) {
    if report.sources.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Selection"),
        header_cell("Input"),
        header_cell("Selected"),
        header_cell("No key"),
        header_cell("Matched"),
        header_cell("Unmatched"),
        header_cell("Columns"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 2..8 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for source in &report.sources {
        table.add_row(vec![
            Cell::new(&source.name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(&source.policy),
            Cell::new(source.input_rows),
            Cell::new(source.selected_rows),
            count_cell(source.missing_subject_rows, Color::Yellow),
            Cell::new(source.matched_rows),
            count_cell(source.unmatched_rows, Color::Yellow),
            Cell::new(source.columns_added),
        ]);
    }
    println!();
    println!("Sources:");
    println!("{table}");
}

fn print_column_table(report: &QualityReport) {
    if report.columns.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Blank"),
        header_cell("Censored"),
        header_cell("Coerced"),
        header_cell("Bucketed"),
        header_cell("Levels"),
        header_cell("Indicators"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..7 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let mut totals = [0usize; 4];
    for (name, quality) in &report.columns {
        totals[0] += quality.blanks_to_missing;
        totals[1] += quality.censor_marks_stripped;
        totals[2] += quality.coerced_to_missing;
        totals[3] += quality.bucketed;
        table.add_row(vec![
            Cell::new(name),
            count_cell(quality.blanks_to_missing, Color::DarkYellow),
            count_cell(quality.censor_marks_stripped, Color::DarkYellow),
            count_cell(quality.coerced_to_missing, Color::Yellow),
            count_cell(quality.bucketed, Color::Yellow),
            dim_or_value(quality.levels),
            dim_or_value(quality.indicators),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        count_cell(totals[0], Color::DarkYellow).add_attribute(Attribute::Bold),
        count_cell(totals[1], Color::DarkYellow).add_attribute(Attribute::Bold),
        count_cell(totals[2], Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(totals[3], Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    println!();
    println!("Column quality:");
    println!("{table}");
}

fn print_warnings(report: &QualityReport) {
    if report.warnings.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Kind"),
        header_cell("Column"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    for warning in &report.warnings {
        table.add_row(vec![
            Cell::new(warning_label(warning.kind)).fg(Color::Yellow),
            Cell::new(&warning.column),
            Cell::new(&warning.message),
        ]);
    }
    println!();
    println!("Warnings:");
    println!("{table}");
}

fn print_outputs(result: &RunResult) {
    if result.dry_run {
        return;
    }
    println!();
    print_output_line("Snapshot", result.outputs.snapshot.as_ref());
    print_output_line("Encoded", result.outputs.encoded.as_ref());
    print_output_line("Quality report", result.outputs.report.as_ref());
}

fn print_output_line(label: &str, path: Option<&PathBuf>) {
    if let Some(path) = path {
        println!("{label}: {}", path.display());
    }
}

fn warning_label(kind: WarningKind) -> &'static str {
    match kind {
        WarningKind::UnregisteredColumn => "unregistered",
        WarningKind::FlagConflict => "flag conflict",
        WarningKind::MissingColumn => "missing column",
        WarningKind::EmptyCategorical => "empty categorical",
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
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

fn dim_or_value(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count)
    } else {
        dim_cell("-")
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
