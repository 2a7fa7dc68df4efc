use super::{fetch_with_progress, print_report, ui};
use crate::core::{DateWindow, HistoryProvider, SeriesStore};
use anyhow::Result;
use tracing::info;

/// Fetches `symbols` and prints their aligned daily returns.
pub async fn run(
    provider: &dyn HistoryProvider,
    symbols: &[String],
    window: &DateWindow,
    concurrent: bool,
    last: Option<usize>,
) -> Result<()> {
    info!("Calculating returns for {} instruments...", symbols.len());

    let mut store = SeriesStore::new();
    let report = fetch_with_progress(&mut store, provider, symbols, window, concurrent).await;
    print_report(&report);

    display(&store, last);
    Ok(())
}

pub fn display(store: &SeriesStore, last: Option<usize>) {
    let matrix = store.returns_matrix();
    if matrix.is_empty() {
        println!("No dates with returns for every instrument.");
        return;
    }

    println!(
        "{} {}",
        ui::style_text("Daily returns", ui::StyleType::Title),
        ui::style_text(
            &format!(
                "({} dates, {} to {})",
                matrix.len(),
                matrix.dates[0],
                matrix.dates[matrix.len() - 1]
            ),
            ui::StyleType::Subtle
        )
    );
    println!("{}", ui::returns_table(&matrix, last));
}
