use crate::core::{AttemptStatus, RateMethod};
use anyhow::Result;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

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

/// Rate cell; a zero rate means nothing was found and no fallback exists.
pub fn tna_cell(tna: f64) -> Cell {
    if tna > 0.0 {
        Cell::new(format!("{tna:.2}%"))
            .add_attribute(Attribute::Bold)
            .fg(Color::Green)
            .set_alignment(CellAlignment::Right)
    } else {
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right)
    }
}

pub fn method_cell(method: RateMethod) -> Cell {
    let color = match method {
        RateMethod::StructuredApi => Color::Green,
        RateMethod::ScrapingAverage => Color::Yellow,
        RateMethod::Fallback => Color::Red,
    };
    Cell::new(method.to_string()).fg(color)
}

pub fn status_cell(status: AttemptStatus) -> Cell {
    match status {
        AttemptStatus::Ok => Cell::new("ok").fg(Color::Green),
        AttemptStatus::Error => Cell::new("error").fg(Color::Red),
    }
}

/// Creates a spinner for work of unknown length.
pub fn new_spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}
