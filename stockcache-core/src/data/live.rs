//! Same-day live quotes and splicing them onto a daily series.
//!
//! A live quote only ever replaces the AdjClose of the last row, and only
//! when the quote is dated on that row's day.

use super::provider::DataError;
use super::series::Series;
use crate::config::HttpConfig;
use chrono::{NaiveDate, NaiveDateTime};
use std::time::Duration;
use tracing::{debug, warn};

/// A delayed intraday quote, stamped in exchange-local time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveQuote {
    pub timestamp: NaiveDateTime,
    pub price: f64,
}

impl LiveQuote {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Source of live quotes. Unavailability is `None`, never an error.
pub trait LiveQuoteProvider: Send + Sync {
    fn fetch(&self, ticker: &str) -> Option<LiveQuote>;
}

/// What happened to the series during a splice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpliceOutcome {
    /// The requested end is not today.
    NotRequested,
    /// The provider had no quote.
    NoQuote,
    /// The quote is not dated on the last row's day.
    Stale {
        quote_date: NaiveDate,
        last_date: Option<NaiveDate>,
    },
    Applied { date: NaiveDate, price: f64 },
}

/// Overwrite the last row's AdjClose with the quote price when the dates match.
pub fn apply_quote(series: &mut Series, quote: &LiveQuote) -> SpliceOutcome {
    let quote_date = quote.date();
    match series.last_mut() {
        Some(last) if last.date == quote_date => {
            last.adj_close = Some(quote.price);
            SpliceOutcome::Applied {
                date: quote_date,
                price: quote.price,
            }
        }
        last => SpliceOutcome::Stale {
            quote_date,
            last_date: last.map(|b| b.date),
        },
    }
}

/// Splice a live quote for `ticker` when `requested_end` is `today`.
pub fn splice_live_quote(
    series: &mut Series,
    ticker: &str,
    requested_end: NaiveDate,
    today: NaiveDate,
    provider: &dyn LiveQuoteProvider,
) -> SpliceOutcome {
    if requested_end != today {
        return SpliceOutcome::NotRequested;
    }
    let outcome = match provider.fetch(ticker) {
        Some(quote) => apply_quote(series, &quote),
        None => SpliceOutcome::NoQuote,
    };
    debug!(%ticker, ?outcome, "live quote splice");
    outcome
}

const GOOGLE_PRICES_URL: &str = "https://finance.google.com/finance/getprices";
const GOOGLE_QUOTE_URL: &str = "https://finance.google.com/finance";

/// Google Finance delayed quotes: timestamp from the `getprices` text
/// endpoint, price from the JSON quote endpoint.
pub struct GoogleQuoteProvider {
    client: reqwest::blocking::Client,
}

impl GoogleQuoteProvider {
    pub fn new(http: &HttpConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .user_agent(http.user_agent.as_str())
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, DataError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                provider: "google_quotes".into(),
                symbol: query.first().map(|(_, v)| v.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            });
        }
        resp.text()
            .map_err(|e| DataError::ResponseFormatChanged(format!("unreadable body: {e}")))
    }

    fn try_fetch(&self, ticker: &str) -> Result<LiveQuote, DataError> {
        let prices = self.get_text(
            GOOGLE_PRICES_URL,
            &[("q", ticker), ("p", "1d"), ("f", "d,o,h,l,c,v")],
        )?;
        let timestamp = parse_quote_timestamp(&prices).ok_or_else(|| {
            DataError::ResponseFormatChanged("no timestamp after TIMEZONE_OFFSET".into())
        })?;

        let quote = self.get_text(GOOGLE_QUOTE_URL, &[("q", ticker), ("output", "json")])?;
        let price = parse_quote_price(&quote)
            .ok_or_else(|| DataError::ResponseFormatChanged("no price in quote JSON".into()))?;

        Ok(LiveQuote { timestamp, price })
    }
}

impl LiveQuoteProvider for GoogleQuoteProvider {
    fn fetch(&self, ticker: &str) -> Option<LiveQuote> {
        match self.try_fetch(ticker) {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!(%ticker, error = %e, "live quote unavailable");
                None
            }
        }
    }
}

/// Exchange-local timestamp of the first data line of a `getprices` response.
///
/// That line follows the `TIMEZONE_OFFSET=<minutes>` line; its first field,
/// minus a one-character marker, is epoch seconds. The offset is applied as
/// in [`parse_getprices`](super::google::parse_getprices).
pub fn parse_quote_timestamp(text: &str) -> Option<NaiveDateTime> {
    let mut lines = text.lines().map(str::trim);
    let offset_minutes: i64 = lines
        .by_ref()
        .find_map(|l| l.strip_prefix("TIMEZONE_OFFSET="))?
        .parse()
        .unwrap_or(0);
    let line = lines.next()?;
    let field = line.get(1..)?.split(',').next()?;
    let secs: i64 = field.trim().parse().ok()?;
    chrono::DateTime::from_timestamp(secs + offset_minutes * 60, 0).map(|dt| dt.naive_utc())
}

/// Last price (`l`) of the first element of a `//`-prefixed quote JSON body.
pub fn parse_quote_price(body: &str) -> Option<f64> {
    let json = body.trim().strip_prefix("//").unwrap_or(body).trim();
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    value.get(0)?.get("l")?.as_str()?.replace(',', "").trim().parse().ok()
}
