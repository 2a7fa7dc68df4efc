//! Tabular history as returned by a provider, before normalization.
//!
//! Providers hand back a date-indexed table whose column labels may carry
//! several levels (for example `["Close", "AAPL"]` when a download is keyed
//! by field and symbol). The fetcher flattens those labels to their
//! outermost level and maps the known field names onto [`PriceBar`]s; the
//! rest of the pipeline only ever sees [`PriceSeries`].

use crate::core::series::{PriceBar, PriceSeries};
use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;

pub const OPEN: &str = "Open";
pub const HIGH: &str = "High";
pub const LOW: &str = "Low";
pub const CLOSE: &str = "Close";
pub const VOLUME: &str = "Volume";

#[derive(Debug, Clone, PartialEq)]
pub struct FrameColumn {
    pub label: Vec<String>,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFrame {
    index: Vec<NaiveDate>,
    columns: Vec<FrameColumn>,
}

impl HistoryFrame {
    pub fn new(index: Vec<NaiveDate>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Adds a column. `values` must line up with the date index.
    pub fn push_column<L, S>(&mut self, label: L, values: Vec<Option<f64>>) -> Result<()>
    where
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let label: Vec<String> = label.into_iter().map(Into::into).collect();
        if label.is_empty() {
            bail!("Column label must have at least one level");
        }
        if values.len() != self.index.len() {
            bail!(
                "Column {:?} has {} values but the index has {} dates",
                label,
                values.len(),
                self.index.len()
            );
        }
        self.columns.push(FrameColumn { label, values });
        Ok(())
    }

    pub fn with_column<L, S>(mut self, label: L, values: Vec<Option<f64>>) -> Result<Self>
    where
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_column(label, values)?;
        Ok(self)
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn columns(&self) -> &[FrameColumn] {
        &self.columns
    }

    /// No trading data at all.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.columns.is_empty()
    }

    pub fn is_multi_level(&self) -> bool {
        self.columns.iter().any(|c| c.label.len() > 1)
    }

    /// Reduces every column label to its outermost level.
    pub fn flatten(mut self) -> Self {
        for column in &mut self.columns {
            column.label.truncate(1);
        }
        self
    }

    fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.label.first().is_some_and(|l| l == name))
            .map(|c| c.values.as_slice())
    }

    /// Flattens the labels and converts the table into a [`PriceSeries`].
    ///
    /// `Open` and `Close` are required; `High`, `Low` and `Volume` are
    /// optional. Rows where every price is missing are dropped.
    pub fn into_series(self) -> Result<PriceSeries> {
        let frame = self.flatten();

        let open = frame
            .column(OPEN)
            .ok_or_else(|| anyhow!("History is missing the {} column", OPEN))?;
        let close = frame
            .column(CLOSE)
            .ok_or_else(|| anyhow!("History is missing the {} column", CLOSE))?;
        let high = frame.column(HIGH);
        let low = frame.column(LOW);
        let volume = frame.column(VOLUME);

        let mut bars = Vec::with_capacity(frame.index.len());
        for (i, date) in frame.index.iter().enumerate() {
            let (o, h, l, c) = (
                open[i],
                value_at(high, i),
                value_at(low, i),
                close[i],
            );
            if o.is_none() && h.is_none() && l.is_none() && c.is_none() {
                continue;
            }
            bars.push(PriceBar {
                date: *date,
                open: o.unwrap_or(f64::NAN),
                high: h.unwrap_or(f64::NAN),
                low: l.unwrap_or(f64::NAN),
                close: c.unwrap_or(f64::NAN),
                volume: value_at(volume, i)
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .map(|v| v as u64),
            });
        }

        Ok(PriceSeries::new(bars))
    }
}

fn value_at(column: Option<&[Option<f64>]>, i: usize) -> Option<f64> {
    column.and_then(|values| values[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: u32) -> Vec<NaiveDate> {
        (1..=n)
            .map(|d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap())
            .collect()
    }

    #[test]
    fn test_flatten_multi_level_columns() {
        let frame = HistoryFrame::new(dates(2))
            .with_column([CLOSE, "AAPL"], vec![Some(1.0), Some(2.0)])
            .unwrap()
            .with_column([OPEN, "AAPL"], vec![Some(1.0), Some(2.0)])
            .unwrap();
        assert!(frame.is_multi_level());

        let flat = frame.flatten();
        assert!(!flat.is_multi_level());
        let labels: Vec<_> = flat.columns().iter().map(|c| c.label.clone()).collect();
        assert_eq!(labels, vec![vec![CLOSE.to_string()], vec![OPEN.to_string()]]);
    }

    #[test]
    fn test_into_series_maps_fields() {
        let series = HistoryFrame::new(dates(3))
            .with_column([OPEN, "X"], vec![Some(9.0), None, Some(11.0)])
            .unwrap()
            .with_column([HIGH, "X"], vec![Some(10.5), None, Some(12.0)])
            .unwrap()
            .with_column([LOW, "X"], vec![Some(8.5), None, Some(10.0)])
            .unwrap()
            .with_column([CLOSE, "X"], vec![Some(10.0), None, Some(11.5)])
            .unwrap()
            .with_column([VOLUME, "X"], vec![Some(100.0), None, None])
            .unwrap()
            .into_series()
            .unwrap();

        // the all-missing middle row is dropped
        assert_eq!(series.len(), 2);
        let first = series.bars()[0];
        assert_eq!(first.open, 9.0);
        assert_eq!(first.high, 10.5);
        assert_eq!(first.low, 8.5);
        assert_eq!(first.close, 10.0);
        assert_eq!(first.volume, Some(100));
        assert_eq!(series.bars()[1].volume, None);
    }

    #[test]
    fn test_into_series_single_level_without_high_low() {
        let series = HistoryFrame::new(dates(2))
            .with_column([OPEN], vec![Some(1.0), Some(2.0)])
            .unwrap()
            .with_column([CLOSE], vec![Some(1.5), None])
            .unwrap()
            .into_series()
            .unwrap();

        assert_eq!(series.len(), 2);
        assert!(series.bars()[0].high.is_nan());
        assert!(series.bars()[1].close.is_nan());
    }

    #[test]
    fn test_into_series_requires_close() {
        let err = HistoryFrame::new(dates(1))
            .with_column([OPEN], vec![Some(1.0)])
            .unwrap()
            .into_series()
            .unwrap_err();
        assert_eq!(err.to_string(), "History is missing the Close column");
    }

    #[test]
    fn test_push_column_length_mismatch() {
        let mut frame = HistoryFrame::new(dates(2));
        let err = frame.push_column([CLOSE], vec![Some(1.0)]).unwrap_err();
        assert!(err.to_string().contains("has 1 values but the index has 2 dates"));
    }

    #[test]
    fn test_empty_frame() {
        assert!(HistoryFrame::new(vec![]).is_empty());
        assert!(HistoryFrame::new(dates(2)).is_empty());
    }
}
