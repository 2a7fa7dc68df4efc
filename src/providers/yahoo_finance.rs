use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::frame::{CLOSE, HIGH, HistoryFrame, LOW, OPEN, VOLUME};
use crate::core::history::{HistoryProvider, HistoryRequest};

const NOT_FOUND: &str = "Not Found";

fn to_unix(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

// YahooHistoryProvider implementation for HistoryProvider
pub struct YahooHistoryProvider {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooHistoryProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("xret/0.1")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid Yahoo base URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid Yahoo base URL: {base_url}");
        }
        Ok(YahooHistoryProvider { base_url, client })
    }

    /// The symbol is pushed as a single path segment, so characters such as
    /// `/`, `?` or `#` are percent-encoded instead of reshaping the request.
    fn chart_url(&self, request: &HistoryRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid Yahoo base URL: {}", self.base_url))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", request.symbol.as_str()]);
        url.query_pairs_mut()
            .append_pair("period1", &to_unix(request.window.start).to_string())
            .append_pair("period2", &to_unix(request.window.end).to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "div,splits")
            .append_pair("includeAdjustedClose", "true");
        Ok(url)
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    #[serde(default)]
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug, Default)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Deserialize, Debug, Default)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

fn column(values: &[Option<f64>], len: usize) -> Vec<Option<f64>> {
    (0..len).map(|i| values.get(i).copied().flatten()).collect()
}

/// Rescales open/high/low by `adjclose / close` and replaces close with the
/// adjusted close, so prices are comparable across splits and dividends.
fn adjust_prices(quote: &mut Quote, adjclose: &[Option<f64>]) {
    for i in 0..quote.close.len() {
        let ratio = match (quote.close[i], adjclose.get(i).copied().flatten()) {
            (Some(close), Some(adj)) if close != 0.0 => adj / close,
            _ => continue,
        };
        for field in [&mut quote.open, &mut quote.high, &mut quote.low] {
            if let Some(Some(v)) = field.get_mut(i) {
                *v *= ratio;
            }
        }
        quote.close[i] = adjclose.get(i).copied().flatten();
    }
}

fn build_frame(symbol: &str, item: ChartItem, adjust: bool) -> Result<HistoryFrame> {
    let timestamps = match item.timestamp {
        Some(ts) if !ts.is_empty() => ts,
        _ => return Ok(HistoryFrame::default()),
    };
    let indicators = item
        .indicators
        .ok_or_else(|| anyhow!("No indicators in price history for symbol: {}", symbol))?;

    let mut quote = indicators.quote.into_iter().next().unwrap_or_default();
    if adjust {
        match indicators.adjclose.and_then(|a| a.into_iter().next()) {
            Some(adj) => adjust_prices(&mut quote, &adj.adjclose),
            None => debug!(symbol, "No adjusted close in response, using raw prices"),
        }
    }

    let offset = item.meta.gmtoffset;
    let index = timestamps
        .iter()
        .map(|ts| {
            DateTime::from_timestamp(ts + offset, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| anyhow!("Invalid timestamp {} for symbol: {}", ts, symbol))
        })
        .collect::<Result<Vec<_>>>()?;

    let len = index.len();
    let mut frame = HistoryFrame::new(index);
    for (field, values) in [
        (OPEN, &quote.open),
        (HIGH, &quote.high),
        (LOW, &quote.low),
        (CLOSE, &quote.close),
        (VOLUME, &quote.volume),
    ] {
        frame.push_column([field, symbol], column(values, len))?;
    }
    Ok(frame)
}

#[async_trait]
impl HistoryProvider for YahooHistoryProvider {
    #[instrument(
        name = "YahooHistoryFetch",
        skip(self, request),
        fields(symbol = %request.symbol)
    )]
    async fn fetch_history(&self, request: &HistoryRequest) -> Result<HistoryFrame> {
        let symbol = request.symbol.as_str();
        let url = self.chart_url(request)?;
        debug!("Requesting price history from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;
        let status = response.status();
        let text = response.text().await?;

        let data = match serde_json::from_str::<YahooChartResponse>(&text) {
            Ok(data) => data,
            Err(_) if !status.is_success() => {
                return Err(anyhow!("HTTP error: {} for symbol: {}", status, symbol));
            }
            Err(e) => {
                return Err(anyhow!(
                    "Failed to parse JSON response for {}: {}",
                    symbol,
                    e
                ));
            }
        };

        if let Some(error) = data.chart.error {
            if error.code == NOT_FOUND {
                debug!(description = %error.description, "Symbol not found");
                return Ok(HistoryFrame::default());
            }
            return Err(anyhow!(
                "Yahoo error {}: {} for symbol: {}",
                error.code,
                error.description,
                symbol
            ));
        }
        if !status.is_success() {
            return Err(anyhow!("HTTP error: {} for symbol: {}", status, symbol));
        }

        match data.chart.result.and_then(|r| r.into_iter().next()) {
            Some(item) => build_frame(symbol, item, request.adjust),
            None => Ok(HistoryFrame::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::DateWindow;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn request(symbol: &str) -> HistoryRequest {
        HistoryRequest::adjusted(
            symbol,
            DateWindow::new(date("2024-01-01"), date("2024-01-10")).unwrap(),
        )
    }

    fn provider(uri: &str) -> YahooHistoryProvider {
        YahooHistoryProvider::new(uri, Duration::from_secs(5)).unwrap()
    }

    pub async fn create_mock_server(
        symbol: &str,
        status: u16,
        mock_response: &str,
    ) -> wiremock::MockServer {
        let mock_server = wiremock::MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    // 2024-01-02 and 2024-01-03 14:30 UTC, i.e. 09:30 New York
    const HISTORY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"currency": "USD", "symbol": "AAPL", "gmtoffset": -18000},
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open":   [100.0, 110.0, null],
                        "high":   [102.0, 112.0, null],
                        "low":    [99.0, 108.0, null],
                        "close":  [100.0, 110.0, null],
                        "volume": [1000, 2000, null]
                    }],
                    "adjclose": [{"adjclose": [50.0, 55.0, null]}]
                }
            }],
            "error": null
        }
    }"#;

    #[tokio::test]
    async fn test_request_carries_window_and_adjustment() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("period1", "1704067200"))
            .and(query_param("period2", "1704844800"))
            .and(query_param("interval", "1d"))
            .and(query_param("includeAdjustedClose", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_string(HISTORY))
            .expect(1)
            .mount(&mock_server)
            .await;

        let frame = provider(&mock_server.uri())
            .fetch_history(&request("AAPL"))
            .await
            .unwrap();
        assert_eq!(frame.index().len(), 3);
    }

    #[tokio::test]
    async fn test_symbol_is_encoded_as_one_path_segment() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/A%2FB%3FC%23D"))
            .and(query_param("period1", "1704067200"))
            .and(query_param("interval", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(HISTORY))
            .expect(1)
            .mount(&mock_server)
            .await;

        // trailing slash on the base URL must not produce an empty segment
        let base = format!("{}/", mock_server.uri());
        let frame = provider(&base)
            .fetch_history(&request("A/B?C#D"))
            .await
            .unwrap();
        assert_eq!(frame.index().len(), 3);
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = YahooHistoryProvider::new("not a url", Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("Invalid Yahoo base URL"));
    }

    #[tokio::test]
    async fn test_successful_history_fetch_is_adjusted() {
        let mock_server = create_mock_server("AAPL", 200, HISTORY).await;
        let frame = provider(&mock_server.uri())
            .fetch_history(&request("AAPL"))
            .await
            .unwrap();

        assert!(frame.is_multi_level());
        assert_eq!(
            frame.index(),
            &[date("2024-01-02"), date("2024-01-03"), date("2024-01-04")]
        );

        let series = frame.into_series().unwrap();
        // the trailing all-null bar is dropped
        assert_eq!(series.len(), 2);
        let first = series.bars()[0];
        assert_eq!(first.close, 50.0);
        assert_eq!(first.open, 50.0);
        assert_eq!(first.high, 51.0);
        assert_eq!(first.low, 49.5);
        assert_eq!(first.volume, Some(1000));
        assert_eq!(series.bars()[1].close, 55.0);
    }

    #[tokio::test]
    async fn test_unadjusted_history_keeps_raw_prices() {
        let mock_server = create_mock_server("AAPL", 200, HISTORY).await;
        let mut req = request("AAPL");
        req.adjust = false;
        let series = provider(&mock_server.uri())
            .fetch_history(&req)
            .await
            .unwrap()
            .into_series()
            .unwrap();
        assert_eq!(series.bars()[0].close, 100.0);
        assert_eq!(series.bars()[1].open, 110.0);
    }

    #[tokio::test]
    async fn test_no_timestamps_is_empty() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {"currency": "USD", "gmtoffset": 0},
                    "indicators": {"quote": [{}], "adjclose": [{}]}
                }],
                "error": null
            }
        }"#;
        let mock_server = create_mock_server("DELISTED", 200, mock_response).await;
        let frame = provider(&mock_server.uri())
            .fetch_history(&request("DELISTED"))
            .await
            .unwrap();
        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn test_symbol_not_found_is_empty() {
        let mock_response = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        }"#;
        let mock_server = create_mock_server("INVALID", 404, mock_response).await;
        let frame = provider(&mock_server.uri())
            .fetch_history(&request("INVALID"))
            .await
            .unwrap();
        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_is_reported() {
        let mock_response = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Bad Request", "description": "Invalid input"}
            }
        }"#;
        let mock_server = create_mock_server("AAPL", 400, mock_response).await;
        let result = provider(&mock_server.uri())
            .fetch_history(&request("AAPL"))
            .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Yahoo error Bad Request: Invalid input for symbol: AAPL"
        );
    }

    #[tokio::test]
    async fn test_http_error_response() {
        let mock_server = create_mock_server("AAPL", 500, "").await;
        let result = provider(&mock_server.uri())
            .fetch_history(&request("AAPL"))
            .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for symbol: AAPL"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_response = r#"{"charts": {"result": []}}"#; // "charts" instead of "chart"
        let mock_server = create_mock_server("AAPL", 200, mock_response).await;
        let result = provider(&mock_server.uri())
            .fetch_history(&request("AAPL"))
            .await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for AAPL")
        );
    }
}
