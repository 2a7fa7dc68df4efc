use super::{fetch_with_progress, print_report, returns};
use crate::core::{DateWindow, HistoryProvider, SeriesPersistence, SeriesStore};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Fetches `symbols` and saves them as the snapshot at `destination`.
pub async fn save(
    provider: &dyn HistoryProvider,
    persistence: &dyn SeriesPersistence,
    symbols: &[String],
    window: &DateWindow,
    concurrent: bool,
    destination: &Path,
) -> Result<()> {
    let mut store = SeriesStore::new();
    let report = fetch_with_progress(&mut store, provider, symbols, window, concurrent).await;
    print_report(&report);

    persistence
        .save(&store, destination)
        .await
        .with_context(|| format!("Failed to save snapshot to {}", destination.display()))?;

    info!("Saved {} instruments to {}", store.len(), destination.display());
    println!(
        "Saved {} instruments to {}",
        store.len(),
        destination.display()
    );
    Ok(())
}

/// Loads the snapshot at `source` and prints its returns.
pub async fn load(
    persistence: &dyn SeriesPersistence,
    source: &Path,
    last: Option<usize>,
) -> Result<SeriesStore> {
    let store = persistence
        .load(source)
        .await
        .with_context(|| format!("Failed to load snapshot from {}", source.display()))?;

    println!(
        "Loaded {} instruments: {}",
        store.len(),
        store.symbols().collect::<Vec<_>>().join(", ")
    );
    returns::display(&store, last);
    Ok(store)
}
