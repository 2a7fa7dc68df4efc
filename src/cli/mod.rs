pub mod prices;
pub mod returns;
pub mod setup;
pub mod snapshot;
pub mod ui;

use crate::core::{DateWindow, FetchReport, HistoryProvider, SeriesStore};

/// Fetches `symbols` into `store` behind a progress bar.
pub async fn fetch_with_progress(
    store: &mut SeriesStore,
    provider: &dyn HistoryProvider,
    symbols: &[String],
    window: &DateWindow,
    concurrent: bool,
) -> FetchReport {
    let pb = ui::new_progress_bar(symbols.len() as u64, true);
    pb.set_message("Fetching price history...");

    let on_progress = || pb.inc(1);
    let report = if concurrent {
        store
            .fetch_all_concurrent(provider, symbols, window, &on_progress)
            .await
    } else {
        store
            .fetch_all(provider, symbols, window, &on_progress)
            .await
    };

    pb.finish_and_clear();
    report
}

/// Prints skipped and failed identifiers, if any.
pub fn print_report(report: &FetchReport) {
    let lines = ui::report_lines(report);
    if lines.is_empty() {
        return;
    }
    println!("{}", ui::style_text("Not included:", ui::StyleType::Title));
    for line in lines {
        println!("  {line}");
    }
    ui::print_separator();
}
