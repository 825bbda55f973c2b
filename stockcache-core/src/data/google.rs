//! Google Finance daily history from the `getprices` endpoint.
//!
//! The response is a header block followed by data rows. A row whose first
//! field starts with `a` carries an absolute epoch timestamp; other rows
//! carry an offset, in `INTERVAL` units, from the last absolute one.
//! `TIMEZONE_OFFSET` (minutes) may change mid-stream and applies to the rows
//! after it.

use super::cache::parse_cell;
use super::provider::{DataError, HistoricalProvider};
use super::series::{Bar, Column, Series};
use super::source::Source;
use crate::config::HttpConfig;
use chrono::NaiveDate;
use std::time::Duration;
use tracing::debug;

const PRICES_URL: &str = "https://finance.google.com/finance/getprices";
const DAY_SECONDS: i64 = 86_400;

pub struct GoogleProvider {
    client: reqwest::blocking::Client,
}

impl GoogleProvider {
    pub fn new(http: &HttpConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .user_agent(http.user_agent.as_str())
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Look-back period covering `start`, in whole years.
    fn period(start: NaiveDate, end: NaiveDate) -> String {
        let years = (end - start).num_days() / 365 + 1;
        format!("{}Y", years.clamp(1, 100))
    }
}

impl HistoricalProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        _source: Source,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, DataError> {
        let period = Self::period(start, end);
        debug!(%symbol, %start, %end, %period, "requesting Google prices");

        let resp = self
            .client
            .get(PRICES_URL)
            .query(&[
                ("q", symbol),
                ("i", "86400"),
                ("p", period.as_str()),
                ("f", "d,o,h,l,c,v"),
            ])
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                provider: self.name().to_string(),
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::ResponseFormatChanged(format!("unreadable body: {e}")))?;
        let series = parse_getprices(&body)?;
        if series.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(series.window(start, end))
    }
}

/// Parse a daily `getprices` body. AdjClose is taken from Close.
pub fn parse_getprices(text: &str) -> Result<Series, DataError> {
    let mut columns: Vec<Option<Column>> = Vec::new();
    let mut interval = DAY_SECONDS;
    let mut tz_offset_secs = 0_i64;
    let mut base_ts: Option<i64> = None;
    let mut bars = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(names) = line.strip_prefix("COLUMNS=") {
            columns = names
                .split(',')
                .map(|n| match n {
                    "OPEN" => Some(Column::Open),
                    "HIGH" => Some(Column::High),
                    "LOW" => Some(Column::Low),
                    "CLOSE" => Some(Column::Close),
                    "VOLUME" => Some(Column::Volume),
                    _ => None,
                })
                .collect();
            continue;
        }
        if let Some(v) = line.strip_prefix("INTERVAL=") {
            interval = v.parse().unwrap_or(DAY_SECONDS);
            continue;
        }
        if let Some(v) = line.strip_prefix("TIMEZONE_OFFSET=") {
            tz_offset_secs = v.parse::<i64>().unwrap_or(0) * 60;
            continue;
        }

        let mut fields = line.split(',');
        let stamp = fields.next().unwrap_or_default();
        let ts = if let Some(abs) = stamp.strip_prefix('a') {
            let ts: i64 = abs.parse().map_err(|_| bad_row(line))?;
            base_ts = Some(ts);
            ts
        } else if stamp.bytes().all(|b| b.is_ascii_digit()) && !stamp.is_empty() {
            let steps: i64 = stamp.parse().map_err(|_| bad_row(line))?;
            base_ts.ok_or_else(|| bad_row(line))? + steps * interval
        } else {
            // header line such as EXCHANGE or MARKET_OPEN_MINUTE
            continue;
        };

        let date = chrono::DateTime::from_timestamp(ts + tz_offset_secs, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| bad_row(line))?;

        let mut bar = Bar::empty(date);
        // COLUMNS starts with DATE, which is the stamp field
        for (column, raw) in columns.iter().skip(1).zip(fields) {
            if let Some(column) = column {
                bar.set(*column, parse_cell(raw).ok().flatten());
            }
        }
        bars.push(bar);
    }

    let mut series = Series::from_bars(bars);
    series.fill_adj_close_from_close();
    Ok(series)
}

fn bad_row(line: &str) -> DataError {
    DataError::ResponseFormatChanged(format!("unexpected getprices row: {line}"))
}
