//! Historical price provider abstraction

use crate::core::frame::HistoryFrame;
use crate::core::series::DateWindow;
use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: String,
    pub window: DateWindow,
    /// Apply split/dividend adjustment to all prices.
    pub adjust: bool,
}

impl HistoryRequest {
    pub fn adjusted(symbol: &str, window: DateWindow) -> Self {
        Self {
            symbol: symbol.to_string(),
            window,
            adjust: true,
        }
    }
}

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Daily bars for one instrument. An instrument with no data in the
    /// window yields an empty frame rather than an error.
    async fn fetch_history(&self, request: &HistoryRequest) -> Result<HistoryFrame>;
}
