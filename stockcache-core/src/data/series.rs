//! Daily price series keyed by calendar date.
//!
//! A `Series` holds bars in strictly increasing date order with no duplicate
//! dates. Each cell is an `Option<f64>`; `None` is the missing-value marker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The numeric columns of a daily bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl Column {
    /// All columns in storage order.
    pub const ALL: [Column; 6] = [
        Column::Open,
        Column::High,
        Column::Low,
        Column::Close,
        Column::AdjClose,
        Column::Volume,
    ];

    /// Header name used in CSV files.
    pub fn header(self) -> &'static str {
        match self {
            Column::Open => "Open",
            Column::High => "High",
            Column::Low => "Low",
            Column::Close => "Close",
            Column::AdjClose => "Adj Close",
            Column::Volume => "Volume",
        }
    }

    /// Column name used in Parquet files.
    pub fn field_name(self) -> &'static str {
        match self {
            Column::Open => "open",
            Column::High => "high",
            Column::Low => "low",
            Column::Close => "close",
            Column::AdjClose => "adj_close",
            Column::Volume => "volume",
        }
    }

    /// Position of the column in `Column::ALL`.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// One daily row. Missing cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<f64>,
}

impl Bar {
    /// A bar with every cell missing.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close: None,
            adj_close: None,
            volume: None,
        }
    }

    pub fn get(&self, column: Column) -> Option<f64> {
        match column {
            Column::Open => self.open,
            Column::High => self.high,
            Column::Low => self.low,
            Column::Close => self.close,
            Column::AdjClose => self.adj_close,
            Column::Volume => self.volume,
        }
    }

    pub fn set(&mut self, column: Column, value: Option<f64>) {
        let cell = match column {
            Column::Open => &mut self.open,
            Column::High => &mut self.high,
            Column::Low => &mut self.low,
            Column::Close => &mut self.close,
            Column::AdjClose => &mut self.adj_close,
            Column::Volume => &mut self.volume,
        };
        *cell = value;
    }

    /// Per cell: keep `self`'s present values, take `other`'s where `self` is missing.
    pub fn fill_from(&mut self, other: &Bar) {
        for column in Column::ALL {
            if self.get(column).is_none() {
                self.set(column, other.get(column));
            }
        }
    }

    /// True when no column has a value.
    pub fn is_void(&self) -> bool {
        Column::ALL.iter().all(|c| self.get(*c).is_none())
    }
}

/// Date-ordered daily series with unique dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from bars in any order.
    ///
    /// Bars are sorted by date; when a date appears more than once the last
    /// occurrence wins.
    pub fn from_bars(bars: impl IntoIterator<Item = Bar>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Bar> = BTreeMap::new();
        for bar in bars {
            by_date.insert(bar.date, bar);
        }
        Self {
            bars: by_date.into_values().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|b| b.date)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Bar> {
        self.bars
            .binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|i| &self.bars[i])
    }

    pub fn get_mut(&mut self, date: NaiveDate) -> Option<&mut Bar> {
        match self.bars.binary_search_by_key(&date, |b| b.date) {
            Ok(i) => Some(&mut self.bars[i]),
            Err(_) => None,
        }
    }

    pub fn last_mut(&mut self) -> Option<&mut Bar> {
        self.bars.last_mut()
    }

    /// Value of one cell, `None` when the date is absent or the cell is missing.
    pub fn value(&self, date: NaiveDate, column: Column) -> Option<f64> {
        self.get(date).and_then(|b| b.get(column))
    }

    /// Rows with `start <= date <= end`. Empty when `start > end`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Series {
        if start > end {
            return Series::new();
        }
        self.filtered(|d| d >= start && d <= end)
    }

    /// Rows dated on or before `end`.
    pub fn up_to(&self, end: NaiveDate) -> Series {
        self.filtered(|d| d <= end)
    }

    /// Rows dated on or after `start`.
    pub fn since(&self, start: NaiveDate) -> Series {
        self.filtered(|d| d >= start)
    }

    fn filtered(&self, keep: impl Fn(NaiveDate) -> bool) -> Series {
        Series {
            bars: self.bars.iter().filter(|b| keep(b.date)).cloned().collect(),
        }
    }

    /// Union of both indices. For each cell, `self`'s present value wins and
    /// `other` only fills cells that are missing (or dates absent) in `self`.
    pub fn combine_first(&self, other: &Series) -> Series {
        let mut merged: BTreeMap<NaiveDate, Bar> =
            self.bars.iter().map(|b| (b.date, b.clone())).collect();
        for bar in &other.bars {
            merged
                .entry(bar.date)
                .and_modify(|existing| existing.fill_from(bar))
                .or_insert_with(|| bar.clone());
        }
        Series {
            bars: merged.into_values().collect(),
        }
    }

    /// Apply `f` to every cell of one column.
    pub fn map_column(&mut self, column: Column, mut f: impl FnMut(&Bar) -> Option<f64>) {
        for bar in &mut self.bars {
            let value = f(bar);
            bar.set(column, value);
        }
    }

    /// Fill missing AdjClose cells from Close.
    pub fn fill_adj_close_from_close(&mut self) {
        self.map_column(Column::AdjClose, |b| b.adj_close.or(b.close));
    }
}

impl FromIterator<Bar> for Series {
    fn from_iter<I: IntoIterator<Item = Bar>>(iter: I) -> Self {
        Series::from_bars(iter)
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn bar(date: &str, close: Option<f64>, volume: Option<f64>) -> Bar {
        Bar {
            close,
            adj_close: close,
            volume,
            ..Bar::empty(d(date))
        }
    }

    #[test]
    fn from_bars_sorts_and_dedupes() {
        let s = Series::from_bars(vec![
            bar("2024-01-03", Some(2.0), None),
            bar("2024-01-02", Some(1.0), None),
            bar("2024-01-03", Some(3.0), None),
        ]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.first_date(), Some(d("2024-01-02")));
        assert_eq!(s.value(d("2024-01-03"), Column::Close), Some(3.0));
    }

    #[test]
    fn window_is_inclusive_and_empty_when_reversed() {
        let s = Series::from_bars(vec![
            bar("2024-01-02", Some(1.0), None),
            bar("2024-01-03", Some(2.0), None),
            bar("2024-01-04", Some(3.0), None),
        ]);
        let w = s.window(d("2024-01-03"), d("2024-01-04"));
        assert_eq!(w.dates().collect::<Vec<_>>(), vec![d("2024-01-03"), d("2024-01-04")]);
        assert!(s.window(d("2024-01-04"), d("2024-01-02")).is_empty());
        assert_eq!(s.up_to(d("2024-01-03")).len(), 2);
        assert_eq!(s.since(d("2024-01-03")).len(), 2);
    }

    #[test]
    fn combine_first_prefers_self_and_fills_gaps() {
        let left = Series::from_bars(vec![
            bar("2024-01-02", Some(10.0), None),
            bar("2024-01-03", None, Some(5.0)),
        ]);
        let right = Series::from_bars(vec![
            bar("2024-01-02", Some(99.0), Some(7.0)),
            bar("2024-01-03", Some(11.0), Some(99.0)),
            bar("2024-01-04", Some(12.0), None),
        ]);

        let merged = left.combine_first(&right);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.value(d("2024-01-02"), Column::Close), Some(10.0));
        assert_eq!(merged.value(d("2024-01-02"), Column::Volume), Some(7.0));
        assert_eq!(merged.value(d("2024-01-03"), Column::Close), Some(11.0));
        assert_eq!(merged.value(d("2024-01-03"), Column::Volume), Some(5.0));
        assert_eq!(merged.value(d("2024-01-04"), Column::Close), Some(12.0));
    }

    #[test]
    fn fill_adj_close_only_touches_missing_cells() {
        let mut s = Series::from_bars(vec![
            Bar {
                close: Some(10.0),
                adj_close: Some(9.5),
                ..Bar::empty(d("2024-01-02"))
            },
            Bar {
                close: Some(11.0),
                ..Bar::empty(d("2024-01-03"))
            },
        ]);
        s.fill_adj_close_from_close();
        assert_eq!(s.value(d("2024-01-02"), Column::AdjClose), Some(9.5));
        assert_eq!(s.value(d("2024-01-03"), Column::AdjClose), Some(11.0));
    }

    #[test]
    fn void_bar_detection() {
        assert!(Bar::empty(d("2024-01-02")).is_void());
        assert!(!bar("2024-01-02", Some(1.0), None).is_void());
    }
}
