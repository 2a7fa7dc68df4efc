//! Core pipeline: fetch daily history, keep it in memory, derive returns

pub mod config;
pub mod frame;
pub mod history;
pub mod log;
pub mod persistence;
pub mod returns;
pub mod series;
pub mod series_store;

// Re-export main types for cleaner imports
pub use frame::HistoryFrame;
pub use history::{HistoryProvider, HistoryRequest};
pub use persistence::SeriesPersistence;
pub use returns::{ReturnsMatrix, returns_matrix};
pub use series::{DateWindow, PriceBar, PriceSeries};
pub use series_store::{FetchOutcome, FetchReport, SeriesStore};
