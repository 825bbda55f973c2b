//! Property tests for aggregation and reference combination.
//!
//! Uses proptest to verify:
//! 1. Aggregation idempotence: aggregating one series returns it unchanged
//! 2. Aggregation symmetry: the order of two inputs does not matter
//! 3. Aggregation cell law: each cell is the mean of the present inputs
//! 4. Reference coverage: the combined index is the union of both indices
//! 5. Reference priority: present non-AdjClose reference cells survive

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::BTreeSet;
use stockcache_core::data::{
    combine_reference, AggregationStrategy, AverageStrategy, Bar, Column, PriorityStrategy, Series,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 1, 2).unwrap()
}

fn arb_cell() -> impl Strategy<Value = Option<f64>> {
    prop::option::weighted(0.8, (1.0..2000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0))
}

fn arb_bar() -> impl Strategy<Value = Bar> {
    (0..60i64, prop::collection::vec(arb_cell(), 6)).prop_map(|(offset, cells)| {
        let mut bar = Bar::empty(base_date() + chrono::Duration::days(offset));
        for (column, value) in Column::ALL.iter().zip(cells) {
            bar.set(*column, value);
        }
        bar
    })
}

fn arb_series() -> impl Strategy<Value = Series> {
    prop::collection::vec(arb_bar(), 0..30).prop_map(Series::from_bars)
}

fn arb_nonempty_series() -> impl Strategy<Value = Series> {
    prop::collection::vec(arb_bar(), 1..30).prop_map(Series::from_bars)
}

fn index(series: &Series) -> BTreeSet<NaiveDate> {
    series.dates().collect()
}

// ── 1-3. Aggregation ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn aggregating_one_series_is_identity(s in arb_series()) {
        let out = AverageStrategy.aggregate(std::slice::from_ref(&s)).unwrap();
        prop_assert_eq!(out, s);
    }

    #[test]
    fn aggregation_of_two_is_symmetric(a in arb_series(), b in arb_series()) {
        let ab = AverageStrategy.aggregate(&[a.clone(), b.clone()]).unwrap();
        let ba = AverageStrategy.aggregate(&[b, a]).unwrap();
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn aggregation_cell_law(inputs in prop::collection::vec(arb_series(), 1..5)) {
        let out = AverageStrategy.aggregate(&inputs).unwrap();

        let all_dates: BTreeSet<NaiveDate> = inputs.iter().flat_map(index).collect();
        prop_assert_eq!(index(&out), all_dates.clone());

        for date in all_dates {
            for column in Column::ALL {
                let present: Vec<f64> = inputs
                    .iter()
                    .filter_map(|s| s.value(date, column))
                    .collect();
                let cell = out.value(date, column);
                match present.len() {
                    0 => prop_assert_eq!(cell, None),
                    1 => prop_assert_eq!(cell, Some(present[0])),
                    k => {
                        let mean = present.iter().sum::<f64>() / k as f64;
                        let got = cell.unwrap();
                        prop_assert!((got - mean).abs() <= 1e-9 * mean.abs().max(1.0),
                            "cell {date} {column}: got {got}, expected {mean}");
                    }
                }
            }
        }
    }

    #[test]
    fn priority_aggregation_covers_union(a in arb_series(), b in arb_series()) {
        let out = PriorityStrategy.aggregate(&[a.clone(), b.clone()]).unwrap();
        let expected: BTreeSet<NaiveDate> = index(&a).union(&index(&b)).copied().collect();
        prop_assert_eq!(index(&out), expected);
        for bar in &a {
            for column in Column::ALL {
                if let Some(v) = bar.get(column) {
                    prop_assert_eq!(out.value(bar.date, column), Some(v));
                }
            }
        }
    }
}

// ── 4-5. Reference combiner ──────────────────────────────────────────

proptest! {
    #[test]
    fn reference_coverage_is_union(reference in arb_nonempty_series(), raw in arb_series()) {
        let out = combine_reference(Some(reference.clone()), &raw);
        let expected: BTreeSet<NaiveDate> = index(&reference).union(&index(&raw)).copied().collect();

        let dates: Vec<NaiveDate> = out.dates().collect();
        prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(dates.into_iter().collect::<BTreeSet<_>>(), expected);
    }

    #[test]
    fn reference_values_win_outside_adj_close(
        reference in arb_nonempty_series(),
        raw in arb_series(),
    ) {
        let out = combine_reference(Some(reference.clone()), &raw);
        for bar in &reference {
            for column in Column::ALL.into_iter().filter(|c| *c != Column::AdjClose) {
                if let Some(v) = bar.get(column) {
                    prop_assert_eq!(out.value(bar.date, column), Some(v));
                }
            }
        }
    }

    #[test]
    fn raw_adj_close_wins_inside_reference_span(
        reference in arb_nonempty_series(),
        raw in arb_series(),
    ) {
        let out = combine_reference(Some(reference.clone()), &raw);
        let last = reference.last_date().unwrap();
        for bar in raw.iter().filter(|b| b.date <= last) {
            if let Some(v) = bar.adj_close {
                prop_assert_eq!(out.value(bar.date, Column::AdjClose), Some(v));
            }
        }
    }

    #[test]
    fn absent_reference_yields_raw(raw in arb_series()) {
        prop_assert_eq!(combine_reference(None, &raw), raw);
    }
}
