//! In-memory store of fetched price series, keyed by instrument.

use crate::core::history::{HistoryProvider, HistoryRequest};
use crate::core::returns::{self, ReturnsMatrix};
use crate::core::series::{DateWindow, PriceSeries};
use anyhow::Result;
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// What happened to one identifier during a fetch batch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Stored { rows: usize },
    /// Provider had no data in the window; nothing stored.
    Empty,
    Failed { reason: String },
}

/// Per-identifier outcomes, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchReport {
    pub outcomes: Vec<(String, FetchOutcome)>,
}

impl FetchReport {
    pub fn stored(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|(symbol, outcome)| match outcome {
            FetchOutcome::Stored { .. } => Some(symbol.as_str()),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|(symbol, outcome)| match outcome {
            FetchOutcome::Empty => Some(symbol.as_str()),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|(symbol, outcome)| match outcome {
            FetchOutcome::Failed { reason } => Some((symbol.as_str(), reason.as_str())),
            _ => None,
        })
    }

    pub fn outcome(&self, symbol: &str) -> Option<&FetchOutcome> {
        self.outcomes
            .iter()
            .rev()
            .find(|(s, _)| s == symbol)
            .map(|(_, outcome)| outcome)
    }

    /// Every identifier in the batch was stored.
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, outcome)| matches!(outcome, FetchOutcome::Stored { .. }))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesStore {
    series: BTreeMap<String, PriceSeries>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.get(symbol)
    }

    /// Stores `series` under `symbol`, replacing any previous entry.
    pub fn insert(&mut self, symbol: impl Into<String>, series: PriceSeries) {
        self.series.insert(symbol.into(), series);
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PriceSeries)> {
        self.series.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn returns_matrix(&self) -> ReturnsMatrix {
        returns::returns_matrix(self)
    }

    /// Fetches adjusted daily history for each identifier, one at a time and
    /// in order. Failures and empty results are recorded in the report and
    /// never stop the batch. Refetching an identifier overwrites its entry.
    pub async fn fetch_all(
        &mut self,
        provider: &dyn HistoryProvider,
        symbols: &[String],
        window: &DateWindow,
        on_progress: &dyn Fn(),
    ) -> FetchReport {
        info!(
            count = symbols.len(),
            start = %window.start,
            end = %window.end,
            "Fetching price history"
        );
        let mut report = FetchReport::default();
        for symbol in symbols {
            let result = fetch_series(provider, symbol, window).await;
            let outcome = self.apply(symbol, result);
            report.outcomes.push((symbol.clone(), outcome));
            on_progress();
        }
        report
    }

    /// Like [`SeriesStore::fetch_all`] but issues all requests at once.
    /// Results are applied in request order, so the final store matches the
    /// sequential version.
    pub async fn fetch_all_concurrent(
        &mut self,
        provider: &dyn HistoryProvider,
        symbols: &[String],
        window: &DateWindow,
        on_progress: &dyn Fn(),
    ) -> FetchReport {
        info!(
            count = symbols.len(),
            start = %window.start,
            end = %window.end,
            "Fetching price history concurrently"
        );
        let futures = symbols.iter().map(|symbol| async move {
            let result = fetch_series(provider, symbol, window).await;
            on_progress();
            result
        });
        let results = join_all(futures).await;

        let mut report = FetchReport::default();
        for (symbol, result) in symbols.iter().zip(results) {
            let outcome = self.apply(symbol, result);
            report.outcomes.push((symbol.clone(), outcome));
        }
        report
    }

    pub async fn fetch_one(
        &mut self,
        provider: &dyn HistoryProvider,
        symbol: &str,
        window: &DateWindow,
    ) -> FetchOutcome {
        let result = fetch_series(provider, symbol, window).await;
        self.apply(symbol, result)
    }

    fn apply(&mut self, symbol: &str, result: Result<Option<PriceSeries>>) -> FetchOutcome {
        match result {
            Ok(Some(series)) => {
                let rows = series.len();
                debug!(symbol, rows, "Stored price history");
                self.series.insert(symbol.to_string(), series);
                FetchOutcome::Stored { rows }
            }
            Ok(None) => {
                info!(symbol, "No price data in window, skipping");
                FetchOutcome::Empty
            }
            Err(e) => {
                warn!(symbol, error = %e, "Error fetching price history");
                FetchOutcome::Failed {
                    reason: format!("{e:#}"),
                }
            }
        }
    }
}

async fn fetch_series(
    provider: &dyn HistoryProvider,
    symbol: &str,
    window: &DateWindow,
) -> Result<Option<PriceSeries>> {
    let request = HistoryRequest::adjusted(symbol, *window);
    let frame = provider.fetch_history(&request).await?;
    if frame.is_empty() {
        return Ok(None);
    }
    let series = frame.into_series()?;
    Ok((!series.is_empty()).then_some(series))
}
