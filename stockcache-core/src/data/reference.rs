//! Folds a freshly read vendor series into the long-lived reference series.

use super::series::{Column, Series};

/// Combine the stored reference with a raw vendor series.
///
/// With no reference (or an empty one) the raw series is returned as is.
/// Otherwise:
/// 1. raw rows up to the reference's first date backfill the reference, and
///    raw rows on dates inside its span that it lacks are added;
/// 2. on every row up to the reference's last date, AdjClose takes the raw
///    value where raw has one;
/// 3. raw rows from the reference's last date onward extend it.
///
/// Only AdjClose is ever overwritten; other present reference cells are kept.
pub fn combine_reference(reference: Option<Series>, raw: &Series) -> Series {
    let reference = match reference {
        Some(r) if !r.is_empty() => r,
        _ => return raw.clone(),
    };
    let (Some(ref_first), Some(ref_last)) = (reference.first_date(), reference.last_date()) else {
        return raw.clone();
    };

    let inside_gaps = raw
        .iter()
        .filter(|b| b.date > ref_first && b.date < ref_last && reference.get(b.date).is_none())
        .cloned();
    let backfill: Series = raw.up_to(ref_first).into_bars().into_iter().chain(inside_gaps).collect();
    let mut combined = reference.combine_first(&backfill);

    combined.map_column(Column::AdjClose, |bar| {
        if bar.date > ref_last {
            return bar.adj_close;
        }
        raw.value(bar.date, Column::AdjClose).or(bar.adj_close)
    });

    combined.combine_first(&raw.since(ref_last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::series::Bar;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn row(date: &str, close: f64, adj_close: Option<f64>) -> Bar {
        Bar {
            close: Some(close),
            adj_close,
            ..Bar::empty(d(date))
        }
    }

    #[test]
    fn no_reference_returns_raw() {
        let raw = Series::from_bars(vec![row("2017-11-01", 1.0, Some(1.0))]);
        assert_eq!(combine_reference(None, &raw), raw);
        assert_eq!(combine_reference(Some(Series::new()), &raw), raw);
    }

    #[test]
    fn backfills_overrides_adj_close_and_extends() {
        let reference = Series::from_bars(vec![
            row("2017-11-02", 10.0, Some(10.0)),
            row("2017-11-03", 11.0, Some(11.0)),
        ]);
        let raw = Series::from_bars(vec![
            row("2017-11-01", 90.0, Some(9.0)),
            row("2017-11-02", 99.0, Some(9.5)),
            row("2017-11-03", 99.0, None),
            row("2017-11-06", 12.0, Some(12.0)),
        ]);

        let out = combine_reference(Some(reference), &raw);

        assert_eq!(
            out.dates().collect::<Vec<_>>(),
            vec![d("2017-11-01"), d("2017-11-02"), d("2017-11-03"), d("2017-11-06")]
        );
        // backfilled row
        assert_eq!(out.value(d("2017-11-01"), Column::Close), Some(90.0));
        // close kept, adj close taken from raw
        assert_eq!(out.value(d("2017-11-02"), Column::Close), Some(10.0));
        assert_eq!(out.value(d("2017-11-02"), Column::AdjClose), Some(9.5));
        // raw adj close missing: existing value kept
        assert_eq!(out.value(d("2017-11-03"), Column::AdjClose), Some(11.0));
        // extension
        assert_eq!(out.value(d("2017-11-06"), Column::Close), Some(12.0));
    }

    #[test]
    fn raw_dates_inside_reference_span_are_added() {
        let reference = Series::from_bars(vec![
            row("2017-11-01", 10.0, Some(10.0)),
            row("2017-11-03", 11.0, Some(11.0)),
        ]);
        let raw = Series::from_bars(vec![row("2017-11-02", 50.0, Some(5.0))]);

        let out = combine_reference(Some(reference), &raw);
        assert_eq!(out.len(), 3);
        assert_eq!(out.value(d("2017-11-02"), Column::Close), Some(50.0));
        assert_eq!(out.value(d("2017-11-02"), Column::AdjClose), Some(5.0));
    }

    #[test]
    fn boundary_day_gets_raw_gaps_filled() {
        let reference = Series::from_bars(vec![Bar {
            close: Some(10.0),
            ..Bar::empty(d("2017-11-02"))
        }]);
        let raw = Series::from_bars(vec![Bar {
            close: Some(50.0),
            volume: Some(1000.0),
            adj_close: Some(9.9),
            ..Bar::empty(d("2017-11-02"))
        }]);

        let out = combine_reference(Some(reference), &raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out.value(d("2017-11-02"), Column::Close), Some(10.0));
        assert_eq!(out.value(d("2017-11-02"), Column::Volume), Some(1000.0));
        assert_eq!(out.value(d("2017-11-02"), Column::AdjClose), Some(9.9));
    }
}
