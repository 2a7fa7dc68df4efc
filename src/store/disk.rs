use crate::core::persistence::SeriesPersistence;
use crate::core::series::PriceSeries;
use crate::core::series_store::SeriesStore;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PersistMode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

const PARTITION: &str = "series";

/// Snapshots stored in a fjall keyspace: one key per instrument, the value is
/// the series as JSON.
#[derive(Default)]
pub struct DiskPersistence {
    // fjall keeps a keyspace open for the life of the handle, so reuse it
    keyspaces: Mutex<HashMap<PathBuf, Keyspace>>,
}

impl DiskPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    fn keyspace(&self, path: &Path) -> Result<Keyspace> {
        let mut keyspaces = self
            .keyspaces
            .lock()
            .map_err(|_| anyhow!("Keyspace registry lock poisoned"))?;
        if let Some(keyspace) = keyspaces.get(path) {
            return Ok(keyspace.clone());
        }
        let keyspace = Config::new(path)
            .open()
            .with_context(|| format!("Failed to open snapshot at {}", path.display()))?;
        keyspaces.insert(path.to_path_buf(), keyspace.clone());
        Ok(keyspace)
    }
}

#[async_trait]
impl SeriesPersistence for DiskPersistence {
    async fn save(&self, store: &SeriesStore, destination: &Path) -> Result<()> {
        std::fs::create_dir_all(destination)
            .with_context(|| format!("Failed to create directory: {}", destination.display()))?;

        let keyspace = self.keyspace(destination)?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;

        let stale = partition.keys().collect::<Result<Vec<_>, _>>()?;
        for key in stale {
            partition.remove(key)?;
        }
        for (symbol, series) in store.iter() {
            partition.insert(symbol.as_bytes(), serde_json::to_vec(series)?)?;
        }
        keyspace.persist(PersistMode::SyncAll)?;

        debug!(
            path = %destination.display(),
            count = store.len(),
            "Saved series snapshot"
        );
        Ok(())
    }

    async fn load(&self, source: &Path) -> Result<SeriesStore> {
        if !source.is_dir() {
            bail!("Snapshot not found at {}", source.display());
        }
        let keyspace = self.keyspace(source)?;
        if !keyspace.partition_exists(PARTITION) {
            bail!("Snapshot not found at {}", source.display());
        }
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;

        let mut store = SeriesStore::new();
        for item in partition.iter() {
            let (key, value) = item?;
            let symbol = String::from_utf8(key.to_vec())
                .context("Snapshot contains a non UTF-8 instrument key")?;
            let series: PriceSeries = serde_json::from_slice(&value)
                .with_context(|| format!("Failed to decode snapshot entry for {symbol}"))?;
            store.insert(symbol, series);
        }

        debug!(
            path = %source.display(),
            count = store.len(),
            "Loaded series snapshot"
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::PriceBar;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, close)| PriceBar {
                    date: NaiveDate::from_ymd_opt(2024, 5, 1 + i as u32).unwrap(),
                    open: *close,
                    high: *close + 1.0,
                    low: *close - 1.0,
                    close: *close,
                    volume: Some(10 * i as u64),
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_disk_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot");
        let persistence = DiskPersistence::new();

        let mut store = SeriesStore::new();
        store.insert("AAPL", series(&[1.0, 2.0, 3.0]));
        store.insert("META", series(&[4.0, 5.0]));

        persistence.save(&store, &path).await.unwrap();
        let loaded = persistence.load(&path).await.unwrap();

        assert_eq!(loaded, store);
        assert_eq!(loaded.returns_matrix(), store.returns_matrix());
    }

    #[tokio::test]
    async fn test_disk_round_trip_keeps_missing_prices() {
        let dir = tempdir().unwrap();
        let persistence = DiskPersistence::new();

        let mut bars = series(&[10.0, 11.0]).bars().to_vec();
        bars[0].high = f64::NAN;
        bars[1].close = f64::NAN;
        let mut store = SeriesStore::new();
        store.insert("A", PriceSeries::new(bars));

        persistence.save(&store, dir.path()).await.unwrap();
        let loaded = persistence.load(dir.path()).await.unwrap();

        let loaded = loaded.get("A").unwrap().bars();
        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].high.is_nan());
        assert_eq!(loaded[0].close, 10.0);
        assert_eq!(loaded[1].open, 11.0);
        assert!(loaded[1].close.is_nan());
    }

    #[tokio::test]
    async fn test_disk_save_replaces_previous_snapshot() {
        let dir = tempdir().unwrap();
        let persistence = DiskPersistence::new();

        let mut first = SeriesStore::new();
        first.insert("OLD", series(&[1.0]));
        persistence.save(&first, dir.path()).await.unwrap();

        let mut second = SeriesStore::new();
        second.insert("NEW", series(&[2.0, 3.0]));
        persistence.save(&second, dir.path()).await.unwrap();

        let loaded = persistence.load(dir.path()).await.unwrap();
        assert!(loaded.get("OLD").is_none());
        assert_eq!(loaded.get("NEW").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_disk_load_missing_snapshot() {
        let dir = tempdir().unwrap();
        let persistence = DiskPersistence::new();

        let missing = dir.path().join("nothing-here");
        let err = persistence.load(&missing).await.unwrap_err();
        assert!(err.to_string().starts_with("Snapshot not found at"));

        // an existing directory without a snapshot partition
        let err = persistence.load(dir.path()).await.unwrap_err();
        assert!(err.to_string().starts_with("Snapshot not found at"));
    }
}
