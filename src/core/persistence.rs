use crate::core::series_store::SeriesStore;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Saves and restores a full [`SeriesStore`] snapshot.
#[async_trait]
pub trait SeriesPersistence: Send + Sync {
    /// Replaces whatever snapshot exists at `destination`.
    async fn save(&self, store: &SeriesStore, destination: &Path) -> Result<()>;

    async fn load(&self, source: &Path) -> Result<SeriesStore>;
}
