use crate::core::persistence::SeriesPersistence;
use crate::core::series_store::SeriesStore;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory snapshot store keyed by path. Snapshots live as long as the
/// instance.
#[derive(Clone, Default)]
pub struct MemoryPersistence {
    inner: Arc<Mutex<HashMap<PathBuf, SeriesStore>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeriesPersistence for MemoryPersistence {
    async fn save(&self, store: &SeriesStore, destination: &Path) -> Result<()> {
        let mut snapshots = self.inner.lock().await;
        debug!("Snapshot PUT for path: {:?}", destination);
        snapshots.insert(destination.to_path_buf(), store.clone());
        Ok(())
    }

    async fn load(&self, source: &Path) -> Result<SeriesStore> {
        let snapshots = self.inner.lock().await;
        snapshots
            .get(source)
            .cloned()
            .ok_or_else(|| anyhow!("Snapshot not found at {}", source.display()))
    }
}
