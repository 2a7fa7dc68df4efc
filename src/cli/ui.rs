use crate::core::{FetchReport, PriceSeries, ReturnsMatrix};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right aligned price, "N/A" when missing.
pub fn price_cell(value: f64) -> Cell {
    if value.is_finite() {
        Cell::new(format!("{value:.2}")).set_alignment(CellAlignment::Right)
    } else {
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right)
    }
}

/// Creates a cell for displaying percentage change with color coding.
pub fn change_cell(change: f64) -> Cell {
    let text = format!("{change:.2}%");
    if change >= 0.0 {
        Cell::new(text)
            .fg(Color::Green)
            .set_alignment(CellAlignment::Right)
    } else {
        Cell::new(text)
            .fg(Color::Red)
            .set_alignment(CellAlignment::Right)
    }
}

fn tail_start(len: usize, last: Option<usize>) -> usize {
    last.map_or(0, |n| len.saturating_sub(n))
}

/// Renders the returns matrix, optionally only its `last` rows.
pub fn returns_table(matrix: &ReturnsMatrix, last: Option<usize>) -> Table {
    let mut table = new_styled_table();

    let mut header = vec![header_cell("Date")];
    header.extend(matrix.columns.iter().map(|c| header_cell(c)));
    table.set_header(header);

    let start = tail_start(matrix.len(), last);
    for (date, row) in matrix.dates.iter().zip(&matrix.rows).skip(start) {
        let mut cells = vec![Cell::new(date.to_string())];
        cells.extend(row.iter().map(|v| change_cell(v * 100.0)));
        table.add_row(cells);
    }
    table
}

/// Renders one instrument's daily bars, optionally only its `last` rows.
pub fn series_table(series: &PriceSeries, last: Option<usize>) -> Table {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Date"),
        header_cell("Open"),
        header_cell("High"),
        header_cell("Low"),
        header_cell("Close"),
        header_cell("Volume"),
    ]);

    let start = tail_start(series.len(), last);
    for bar in series.bars().iter().skip(start) {
        let volume = bar
            .volume
            .map_or(Cell::new("N/A").fg(Color::DarkGrey), Cell::new);
        table.add_row(vec![
            Cell::new(bar.date.to_string()),
            price_cell(bar.open),
            price_cell(bar.high),
            price_cell(bar.low),
            price_cell(bar.close),
            volume.set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// One line per identifier that did not make it into the store.
pub fn report_lines(report: &FetchReport) -> Vec<String> {
    let skipped = report.skipped().map(|symbol| {
        style_text(
            &format!("{symbol}: no price data in window, skipped"),
            StyleType::Subtle,
        )
    });
    let failed = report.failures().map(|(symbol, reason)| {
        style_text(&format!("{symbol}: {reason}"), StyleType::Error)
    });
    skipped.chain(failed).collect()
}

/// Creates a new `indicatif::ProgressBar` with standard styling.
pub fn new_progress_bar(len: u64, with_message: bool) -> ProgressBar {
    let template = if with_message {
        "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    } else {
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    };

    let pb = ProgressBar::new(len);
    let progress_style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(progress_style);
    pb
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}
