use super::ui;
use crate::core::{DateWindow, FetchOutcome, HistoryProvider, SeriesStore};
use anyhow::Result;

/// Fetches one instrument and prints its daily bars.
pub async fn run(
    provider: &dyn HistoryProvider,
    symbol: &str,
    window: &DateWindow,
    last: Option<usize>,
) -> Result<()> {
    let mut store = SeriesStore::new();
    let outcome = store.fetch_one(provider, symbol, window).await;

    match (outcome, store.get(symbol)) {
        (FetchOutcome::Stored { .. }, Some(series)) => {
            println!(
                "{}",
                ui::style_text(&format!("{symbol} daily prices"), ui::StyleType::Title)
            );
            println!("{}", ui::series_table(series, last));
        }
        (FetchOutcome::Failed { reason }, _) => {
            println!(
                "{}",
                ui::style_text(&format!("{symbol}: {reason}"), ui::StyleType::Error)
            );
        }
        _ => {
            println!(
                "{}",
                ui::style_text(
                    &format!("{symbol}: no price data between {} and {}", window.start, window.end),
                    ui::StyleType::Subtle
                )
            );
        }
    }
    Ok(())
}
