//! Daily price series and the date window they are requested over

use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default lookback used when no start date is given (three years).
pub const DEFAULT_LOOKBACK_DAYS: i64 = 3 * 365;

/// One trading day of adjusted prices. Missing prices are `NaN` in memory
/// and `null` when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    #[serde(with = "missing_price")]
    pub open: f64,
    #[serde(with = "missing_price")]
    pub high: f64,
    #[serde(with = "missing_price")]
    pub low: f64,
    #[serde(with = "missing_price")]
    pub close: f64,
    pub volume: Option<u64>,
}

// JSON has no NaN, so non-finite prices go out as null and come back as NaN
mod missing_price {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

/// Daily bars for one instrument, strictly increasing by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PriceBar>", into = "Vec<PriceBar>")]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Builds a series from bars in any order. When a date repeats, the last
    /// bar given for it wins.
    pub fn new(mut bars: Vec<PriceBar>) -> Self {
        // stable sort keeps input order within a date
        bars.sort_by_key(|bar| bar.date);
        let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self { bars: deduped }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|bar| bar.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|bar| bar.date)
    }

    /// Closing prices keyed by date, in date order.
    pub fn closes(&self) -> Vec<(NaiveDate, f64)> {
        self.bars.iter().map(|bar| (bar.date, bar.close)).collect()
    }
}

impl From<Vec<PriceBar>> for PriceSeries {
    fn from(bars: Vec<PriceBar>) -> Self {
        Self::new(bars)
    }
}

impl From<PriceSeries> for Vec<PriceBar> {
    fn from(series: PriceSeries) -> Self {
        series.bars
    }
}

/// Calendar date range for a history request. The provider decides whether
/// `end` is inclusive; Yahoo treats it as exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            bail!("Start date {} is after end date {}", start, end);
        }
        Ok(Self { start, end })
    }

    /// Resolves optional `YYYY-MM-DD` bounds against `today`. A missing end
    /// defaults to `today`, a missing start to three years before `today`.
    pub fn resolve(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> Result<Self> {
        let end = match end {
            Some(s) => parse_date(s)?,
            None => today,
        };
        let start = match start {
            Some(s) => parse_date(s)?,
            None => today - Duration::days(DEFAULT_LOOKBACK_DAYS),
        };
        Self::new(start, end)
    }

    /// Same as [`DateWindow::resolve`] with the local calendar date as `today`.
    pub fn resolve_from_today(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        Self::resolve(start, end, chrono::Local::now().date_naive())
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .with_context(|| format!("Invalid date '{s}', expected YYYY-MM-DD"))
}
