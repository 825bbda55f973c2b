//! Historical data provider trait, provider registry and structured error types.
//!
//! The HistoricalProvider trait abstracts over data vendors (Yahoo Finance,
//! Quandl, CSV import, synthetic) so we can swap implementations and mock for
//! tests. The cache layer sits above this trait: providers don't know about
//! the cache.

use super::series::Series;
use super::source::Source;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI contexts.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {provider} for {symbol}")]
    HttpStatus {
        provider: String,
        symbol: String,
        status: u16,
    },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("the reference series is built locally and cannot be fetched remotely")]
    ReferenceNotRemote,

    #[error("no historical provider registered for source '{0}'")]
    NoProvider(Source),

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("CSV error: {0}")]
    CsvError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for historical data providers.
///
/// Implementations handle the specifics of fetching daily bars from a
/// particular vendor. Failures are reported once; callers do not retry.
pub trait HistoricalProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for `symbol` from `source` over `[start, end]`.
    fn fetch(
        &self,
        symbol: &str,
        source: Source,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, DataError>;
}

/// Lookup table from vendor source to the provider that serves it.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<Source, Arc<dyn HistoricalProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` for `vendor`, replacing any previous one.
    ///
    /// Sources that delegate to another vendor (`GoogleRealtime`) resolve
    /// through that vendor, so register the vendor itself.
    pub fn register(&mut self, vendor: Source, provider: Arc<dyn HistoricalProvider>) {
        self.providers.insert(vendor, provider);
    }

    /// Builder-style `register`.
    pub fn with(mut self, vendor: Source, provider: Arc<dyn HistoricalProvider>) -> Self {
        self.register(vendor, provider);
        self
    }

    /// Register `provider` for every vendor that has no provider yet.
    pub fn fill_missing(&mut self, provider: Arc<dyn HistoricalProvider>) {
        for vendor in [Source::Yahoo, Source::Google, Source::Quandl] {
            self.providers
                .entry(vendor)
                .or_insert_with(|| Arc::clone(&provider));
        }
    }

    /// Find the provider for `source`, following vendor delegation.
    pub fn resolve(&self, source: Source) -> Result<(Source, &dyn HistoricalProvider), DataError> {
        let vendor = source.remote_vendor().ok_or(DataError::ReferenceNotRemote)?;
        self.providers
            .get(&vendor)
            .map(|p| (vendor, p.as_ref()))
            .ok_or(DataError::NoProvider(vendor))
    }

    /// Vendors with a registered provider.
    pub fn vendors(&self) -> impl Iterator<Item = Source> + '_ {
        self.providers.keys().copied()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.providers.iter().map(|(s, p)| (s.id(), p.name())))
            .finish()
    }
}
