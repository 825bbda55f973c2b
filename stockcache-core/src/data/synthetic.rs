//! Deterministic synthetic bars for development without network access.
//!
//! Each (ticker, vendor) pair gets its own random walk, seeded from the
//! BLAKE3 hash of `ticker/vendor`. The walk always starts at a fixed anchor
//! date, so overlapping requests return identical bars and the incremental
//! fetch sees a consistent history.

use super::provider::{DataError, HistoricalProvider};
use super::series::{Bar, Series};
use super::source::Source;
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// First date a synthetic walk can produce.
pub fn synthetic_anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn new() -> Self {
        Self
    }
}

impl HistoricalProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        source: Source,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, DataError> {
        Ok(generate_synthetic_series(symbol, source, start, end))
    }
}

/// Random walk from 100.0, weekdays only, restricted to `[start, end]`.
pub fn generate_synthetic_series(
    symbol: &str,
    source: Source,
    start: NaiveDate,
    end: NaiveDate,
) -> Series {
    let seed_bytes = blake3::hash(format!("{symbol}/{}", source.id()).as_bytes());
    let seed: [u8; 32] = *seed_bytes.as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = synthetic_anchor();

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        // Draw every day so the walk is independent of the requested window
        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        if current >= start {
            bars.push(Bar {
                date: current,
                open: Some(open),
                high: Some(high),
                low: Some(low),
                close: Some(close),
                adj_close: Some(close),
                volume: Some(volume as f64),
            });
        }

        price = close;
        current += chrono::Duration::days(1);
    }

    Series::from_bars(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn overlapping_requests_agree() {
        let wide = generate_synthetic_series("SPY", Source::Yahoo, d("2017-01-01"), d("2017-11-02"));
        let narrow = generate_synthetic_series("SPY", Source::Yahoo, d("2017-09-01"), d("2017-11-02"));
        assert_eq!(wide.window(d("2017-09-01"), d("2017-11-02")), narrow);
    }

    #[test]
    fn skips_weekends() {
        // 2024-01-06/07 is a weekend
        let s = generate_synthetic_series("SPY", Source::Yahoo, d("2024-01-05"), d("2024-01-08"));
        assert_eq!(s.dates().collect::<Vec<_>>(), vec![d("2024-01-05"), d("2024-01-08")]);
    }

    #[test]
    fn vendors_get_different_walks() {
        let a = generate_synthetic_series("SPY", Source::Yahoo, d("2017-11-01"), d("2017-11-02"));
        let b = generate_synthetic_series("SPY", Source::Quandl, d("2017-11-01"), d("2017-11-02"));
        assert_eq!(a.len(), b.len());
        assert_ne!(a, b);
    }

    #[test]
    fn bars_are_consistent() {
        let s = generate_synthetic_series("QQQ", Source::Google, d("2020-01-01"), d("2020-03-01"));
        for bar in &s {
            let (o, h, l, c) = (
                bar.open.unwrap(),
                bar.high.unwrap(),
                bar.low.unwrap(),
                bar.close.unwrap(),
            );
            assert!(h >= o.max(c));
            assert!(l <= o.min(c));
            assert_eq!(bar.adj_close, bar.close);
        }
    }
}
