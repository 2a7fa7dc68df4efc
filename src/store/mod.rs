pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::persistence::SeriesPersistence;
use crate::core::series_store::SeriesStore;
use anyhow::{Result, bail};
use async_trait::async_trait;
use disk::DiskPersistence;
use std::path::Path;

/// Rejects every call. Used when persistence is turned off so that a save
/// or load never silently does nothing.
pub struct UnsupportedPersistence;

#[async_trait]
impl SeriesPersistence for UnsupportedPersistence {
    async fn save(&self, _store: &SeriesStore, _destination: &Path) -> Result<()> {
        bail!("Persistence is not supported: save")
    }

    async fn load(&self, _source: &Path) -> Result<SeriesStore> {
        bail!("Persistence is not supported: load")
    }
}

/// Picks the persistence backend configured for this run.
pub fn from_config(config: &AppConfig) -> Box<dyn SeriesPersistence> {
    if config.persist {
        Box::new(DiskPersistence::new())
    } else {
        Box::new(UnsupportedPersistence)
    }
}
