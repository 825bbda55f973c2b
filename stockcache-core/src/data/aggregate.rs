//! Multi-source aggregation: many vendor series in, one series out.

use super::series::{Bar, Column, Series};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Combines several series into one. `None` for an empty input list.
pub trait AggregationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn aggregate(&self, series: &[Series]) -> Option<Series>;
}

/// Configurable choice of aggregation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    #[default]
    Average,
    Priority,
}

impl AggregationKind {
    pub fn strategy(self) -> Box<dyn AggregationStrategy> {
        match self {
            AggregationKind::Average => Box::new(AverageStrategy),
            AggregationKind::Priority => Box::new(PriorityStrategy),
        }
    }
}

impl std::str::FromStr for AggregationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "average" => Ok(AggregationKind::Average),
            "priority" => Ok(AggregationKind::Priority),
            other => Err(format!("unknown aggregation '{other}' (expected average or priority)")),
        }
    }
}

/// Per-cell mean of the present values across all inputs.
///
/// Dates cover the union of the input indices. A cell with no present value
/// stays missing; a cell with exactly one present value keeps it exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageStrategy;

impl AggregationStrategy for AverageStrategy {
    fn name(&self) -> &'static str {
        "average"
    }

    fn aggregate(&self, series: &[Series]) -> Option<Series> {
        if series.is_empty() {
            return None;
        }

        // (sum, count) per date and column
        let mut acc: BTreeMap<NaiveDate, [(f64, u32); 6]> = BTreeMap::new();
        for s in series {
            for bar in s {
                let cells = acc.entry(bar.date).or_insert([(0.0, 0); 6]);
                for column in Column::ALL {
                    if let Some(v) = bar.get(column) {
                        let cell = &mut cells[column.index()];
                        cell.0 += v;
                        cell.1 += 1;
                    }
                }
            }
        }

        let bars = acc.into_iter().map(|(date, cells)| {
            let mut bar = Bar::empty(date);
            for column in Column::ALL {
                let (sum, count) = cells[column.index()];
                let value = match count {
                    0 => None,
                    1 => Some(sum),
                    n => Some(sum / f64::from(n)),
                };
                bar.set(column, value);
            }
            bar
        });

        Some(Series::from_bars(bars))
    }
}

/// First input wins per cell; later inputs only fill gaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityStrategy;

impl AggregationStrategy for PriorityStrategy {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn aggregate(&self, series: &[Series]) -> Option<Series> {
        let (first, rest) = series.split_first()?;
        Some(rest.iter().fold(first.clone(), |acc, s| acc.combine_first(s)))
    }
}
