use super::ui;
use crate::core::{SourceAttemptReport, WalletRate};
use crate::updater::UpdateReport;
use comfy_table::Cell;

const UPDATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

pub fn wallets_table(wallets: &[WalletRate]) -> String {
    if wallets.is_empty() {
        return ui::style_text(
            "No wallet rates stored yet. Run `tasas update` first.",
            ui::StyleType::Subtle,
        );
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Wallet"),
        ui::header_cell("TNA"),
        ui::header_cell("Source"),
        ui::header_cell("Updated"),
    ]);
    for wallet in wallets {
        table.add_row(vec![
            Cell::new(&wallet.name),
            ui::tna_cell(wallet.tna),
            Cell::new(&wallet.source),
            Cell::new(wallet.updated_at.format(UPDATED_AT_FORMAT).to_string()),
        ]);
    }
    table.to_string()
}

pub fn update_table(report: &UpdateReport) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Wallet"),
        ui::header_cell("TNA"),
        ui::header_cell("Method"),
        ui::header_cell("Source"),
    ]);
    for wallet in &report.wallets {
        table.add_row(vec![
            Cell::new(&wallet.record.name),
            ui::tna_cell(wallet.record.tna),
            ui::method_cell(wallet.method),
            Cell::new(&wallet.record.source),
        ]);
    }

    let failed = report.sources.iter().filter(|r| !r.is_ok()).count();
    let mut output = format!(
        "{}\n\n{}",
        ui::style_text("Wallet rates", ui::StyleType::Title),
        table
    );
    if failed > 0 {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(
                &format!("{failed} of {} source attempts failed", report.sources.len()),
                ui::StyleType::Error
            )
        ));
    }
    output
}

pub fn reports_table(reports: &[SourceAttemptReport]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Wallet"),
        ui::header_cell("Source"),
        ui::header_cell("Status"),
        ui::header_cell("TNA"),
        ui::header_cell("Error"),
    ]);
    for report in reports {
        table.add_row(vec![
            Cell::new(report.wallet.as_deref().unwrap_or("-")),
            Cell::new(&report.source),
            ui::status_cell(report.status),
            report.tna.map_or(Cell::new(""), ui::tna_cell),
            Cell::new(report.error.as_deref().unwrap_or("")),
        ]);
    }
    table.to_string()
}
