//! Known market data sources.

use super::provider::DataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A historical data vendor, or the locally curated reference series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Yahoo,
    Google,
    GoogleRealtime,
    Quandl,
    /// The combined best-estimate series. Never fetched remotely.
    Reference,
}

impl Source {
    /// Vendors queried by a multi-source read when no list is configured.
    pub const DEFAULT_VENDORS: [Source; 3] =
        [Source::Yahoo, Source::GoogleRealtime, Source::Quandl];

    pub fn id(self) -> &'static str {
        match self {
            Source::Yahoo => "yahoo",
            Source::Google => "google",
            Source::GoogleRealtime => "google-realtime",
            Source::Quandl => "quandl",
            Source::Reference => "reference",
        }
    }

    /// The vendor whose historical endpoint serves this source.
    ///
    /// `GoogleRealtime` reads its history from `Google`; `Reference` has no
    /// remote vendor.
    pub fn remote_vendor(self) -> Option<Source> {
        match self {
            Source::Reference => None,
            Source::GoogleRealtime => Some(Source::Google),
            other => Some(other),
        }
    }

    /// Whether a live intraday quote may be spliced onto this source's series.
    pub fn supports_live_quotes(self) -> bool {
        matches!(self, Source::GoogleRealtime)
    }

    pub fn is_reference(self) -> bool {
        self == Source::Reference
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Source {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(Source::Yahoo),
            "google" => Ok(Source::Google),
            "google-realtime" => Ok(Source::GoogleRealtime),
            "quandl" => Ok(Source::Quandl),
            "reference" => Ok(Source::Reference),
            other => Err(DataError::UnknownSource(other.to_string())),
        }
    }
}

/// Which sources a read should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelection {
    One(Source),
    /// Every configured vendor, aggregated into the reference.
    All,
}

impl FromStr for SourceSelection {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(SourceSelection::All)
        } else {
            s.parse().map(SourceSelection::One)
        }
    }
}
