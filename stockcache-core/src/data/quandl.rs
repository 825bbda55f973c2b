//! Quandl (Nasdaq Data Link) provider for the `WIKI` end-of-day dataset.
//!
//! Columns are located by name in `column_names`; AdjClose comes from
//! `Adj. Close` when the dataset has it, otherwise from Close.

use super::provider::{DataError, HistoricalProvider};
use super::series::{Bar, Column, Series};
use super::source::Source;
use crate::config::HttpConfig;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://data.nasdaq.com/api/v3/datasets/WIKI";

#[derive(Debug, Deserialize)]
struct DatasetResponse {
    dataset: Dataset,
}

#[derive(Debug, Deserialize)]
struct Dataset {
    column_names: Vec<String>,
    data: Vec<Vec<Value>>,
}

pub struct QuandlProvider {
    client: reqwest::blocking::Client,
}

impl QuandlProvider {
    pub fn new(http: &HttpConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .user_agent(http.user_agent.as_str())
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn dataset_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{BASE_URL}/{symbol}.json?start_date={}&end_date={}&order=asc",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        )
    }

    fn parse_response(resp: DatasetResponse) -> Result<Series, DataError> {
        let names = &resp.dataset.column_names;
        let find = |name: &str| names.iter().position(|n| n == name);

        let date_idx = find("Date")
            .ok_or_else(|| DataError::ResponseFormatChanged("no 'Date' column".into()))?;
        let mut column_idx: Vec<(Column, usize)> = [
            (Column::Open, "Open"),
            (Column::High, "High"),
            (Column::Low, "Low"),
            (Column::Close, "Close"),
            (Column::Volume, "Volume"),
        ]
        .into_iter()
        .filter_map(|(c, name)| find(name).map(|i| (c, i)))
        .collect();
        let adj_idx = find("Adj. Close");
        if let Some(i) = adj_idx {
            column_idx.push((Column::AdjClose, i));
        }

        let mut bars = Vec::with_capacity(resp.dataset.data.len());
        for row in &resp.dataset.data {
            let raw_date = row.get(date_idx).and_then(Value::as_str).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("row without date: {row:?}"))
            })?;
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
                DataError::ResponseFormatChanged(format!("bad date '{raw_date}': {e}"))
            })?;

            let mut bar = Bar::empty(date);
            for (column, idx) in &column_idx {
                bar.set(*column, row.get(*idx).and_then(Value::as_f64));
            }
            bars.push(bar);
        }

        let mut series = Series::from_bars(bars);
        if adj_idx.is_none() {
            series.fill_adj_close_from_close();
        }
        Ok(series)
    }
}

impl HistoricalProvider for QuandlProvider {
    fn name(&self) -> &str {
        "quandl"
    }

    fn fetch(
        &self,
        symbol: &str,
        _source: Source,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, DataError> {
        let url = Self::dataset_url(symbol, start, end);
        debug!(%symbol, %start, %end, "requesting Quandl dataset");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                provider: self.name().to_string(),
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let dataset: DatasetResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;
        Self::parse_response(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    const WIKI: &str = r#"{
        "dataset": {
            "dataset_code": "GOOG",
            "column_names": ["Date","Open","High","Low","Close","Volume","Ex-Dividend",
                             "Split Ratio","Adj. Open","Adj. High","Adj. Low","Adj. Close","Adj. Volume"],
            "data": [
                ["2017-11-02", 1021.76, 1032.65, 1020.31, 1032.48, 1076300.0, 0.0, 1.0,
                 1021.76, 1032.65, 1020.31, 1032.48, 1076300.0],
                ["2017-11-01", 1017.21, 1029.67, 1016.95, 1025.5, 1373400.0, 0.0, 1.0,
                 1017.21, 1029.67, 1016.95, null, 1373400.0]
            ]
        }
    }"#;

    #[test]
    fn parses_wiki_dataset_in_date_order() {
        let resp: DatasetResponse = serde_json::from_str(WIKI).unwrap();
        let series = QuandlProvider::parse_response(resp).unwrap();

        assert_eq!(series.first_date(), Some(d("2017-11-01")));
        assert_eq!(series.value(d("2017-11-02"), Column::AdjClose), Some(1032.48));
        assert_eq!(series.value(d("2017-11-01"), Column::Volume), Some(1373400.0));
        // explicit null adj close is kept missing
        assert_eq!(series.value(d("2017-11-01"), Column::AdjClose), None);
    }

    #[test]
    fn dataset_without_adj_close_uses_close() {
        let json = r#"{"dataset":{"column_names":["Date","Close"],"data":[["2017-11-01",5.0]]}}"#;
        let resp: DatasetResponse = serde_json::from_str(json).unwrap();
        let series = QuandlProvider::parse_response(resp).unwrap();
        assert_eq!(series.value(d("2017-11-01"), Column::AdjClose), Some(5.0));
    }

    #[test]
    fn url_carries_range() {
        let url = QuandlProvider::dataset_url("GOOG", d("2017-09-01"), d("2017-11-02"));
        assert!(url.ends_with("/WIKI/GOOG.json?start_date=2017-09-01&end_date=2017-11-02&order=asc"));
    }
}
