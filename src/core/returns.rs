//! Day-over-day returns aligned across instruments.
use crate::core::series_store::SeriesStore;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Dates by instruments, every cell a finite percent change in close.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnsMatrix {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl ReturnsMatrix {
    /// True when no date survived alignment.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn row(&self, date: NaiveDate) -> Option<&[f64]> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.rows[i].as_slice())
    }

    pub fn column(&self, symbol: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == symbol)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }
}

/// Percent change between consecutive closes. The first date has no
/// predecessor and is omitted; a zero or missing previous close yields a
/// non-finite value.
pub fn pct_change(closes: &[(NaiveDate, f64)]) -> Vec<(NaiveDate, f64)> {
    closes
        .windows(2)
        .map(|w| {
            let (_, prev) = w[0];
            let (date, curr) = w[1];
            (date, (curr - prev) / prev)
        })
        .collect()
}

/// Builds the aligned returns matrix over every instrument in `store`.
///
/// Dates are the union of all instruments' return dates; any date where some
/// instrument lacks a finite return is dropped.
pub fn returns_matrix(store: &SeriesStore) -> ReturnsMatrix {
    let columns: Vec<String> = store.symbols().map(str::to_string).collect();
    if columns.is_empty() {
        return ReturnsMatrix::default();
    }

    let per_symbol: Vec<BTreeMap<NaiveDate, f64>> = store
        .iter()
        .map(|(_, series)| pct_change(&series.closes()).into_iter().collect())
        .collect();

    let all_dates: BTreeSet<NaiveDate> = per_symbol
        .iter()
        .flat_map(|changes| changes.keys().copied())
        .collect();

    let mut dates = Vec::new();
    let mut rows = Vec::new();
    for date in all_dates {
        let row: Option<Vec<f64>> = per_symbol
            .iter()
            .map(|changes| changes.get(&date).copied().filter(|v| v.is_finite()))
            .collect();
        if let Some(row) = row {
            dates.push(date);
            rows.push(row);
        }
    }

    ReturnsMatrix {
        dates,
        columns,
        rows,
    }
}
