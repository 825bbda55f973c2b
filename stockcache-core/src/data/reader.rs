//! `DataReader`: the read API over cache, providers and live quotes.
//!
//! One read cycle for a single source:
//! 1. incremental fetch of `[origin, end]`
//! 2. live quote splice when the source supports it and `end` is today
//! 3. save the merged history for (ticker, source)
//! 4. optionally fold the result into the stored reference series
//!
//! Any error aborts the cycle before the first cache write.

use super::aggregate::AggregationStrategy;
use super::cache::{CacheStore, FileCache};
use super::csv_import::CsvImportProvider;
use super::fetch::{FetchPlan, IncrementalFetcher};
use super::google::GoogleProvider;
use super::live::{splice_live_quote, GoogleQuoteProvider, LiveQuoteProvider, SpliceOutcome};
use super::provider::{DataError, ProviderRegistry};
use super::quandl::QuandlProvider;
use super::reference::combine_reference;
use super::series::Series;
use super::source::{Source, SourceSelection};
use super::yahoo::YahooProvider;
use crate::config::ReaderConfig;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

/// Source of the current date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock stuck on one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// End of a read range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestedEnd {
    /// Whatever the clock says today is.
    #[default]
    Today,
    Date(NaiveDate),
}

impl RequestedEnd {
    pub fn resolve(self, today: NaiveDate) -> NaiveDate {
        match self {
            RequestedEnd::Today => today,
            RequestedEnd::Date(date) => date,
        }
    }
}

impl From<Option<NaiveDate>> for RequestedEnd {
    fn from(date: Option<NaiveDate>) -> Self {
        date.map_or(RequestedEnd::Today, RequestedEnd::Date)
    }
}

impl From<NaiveDate> for RequestedEnd {
    fn from(date: NaiveDate) -> Self {
        RequestedEnd::Date(date)
    }
}

/// Network providers for every vendor, or the CSV import directory when one
/// is configured.
pub fn default_registry(config: &ReaderConfig) -> Result<ProviderRegistry, DataError> {
    if let Some(dir) = &config.import_dir {
        let mut registry = ProviderRegistry::new();
        registry.fill_missing(Arc::new(CsvImportProvider::new(dir)));
        return Ok(registry);
    }

    Ok(ProviderRegistry::new()
        .with(Source::Yahoo, Arc::new(YahooProvider::new(&config.http)?))
        .with(Source::Google, Arc::new(GoogleProvider::new(&config.http)?))
        .with(Source::Quandl, Arc::new(QuandlProvider::new(&config.http)?)))
}

pub struct DataReader {
    config: ReaderConfig,
    cache: Box<dyn CacheStore>,
    providers: ProviderRegistry,
    live: Option<Box<dyn LiveQuoteProvider>>,
    clock: Box<dyn Clock>,
}

impl DataReader {
    /// A reader without live quotes, on the system clock.
    pub fn new(config: ReaderConfig, cache: Box<dyn CacheStore>, providers: ProviderRegistry) -> Self {
        Self {
            config,
            cache,
            providers,
            live: None,
            clock: Box::new(SystemClock),
        }
    }

    /// File cache and default registry from `config`. Google live quotes are
    /// attached unless an import directory replaces the network vendors.
    pub fn from_config(config: ReaderConfig) -> Result<Self, DataError> {
        let cache = FileCache::new(config.cache.clone());
        let providers = default_registry(&config)?;
        let live = match config.import_dir {
            Some(_) => None,
            None => Some(GoogleQuoteProvider::new(&config.http)?),
        };
        let reader = Self::new(config, Box::new(cache), providers);
        Ok(match live {
            Some(live) => reader.with_live_quotes(Box::new(live)),
            None => reader,
        })
    }

    pub fn with_live_quotes(mut self, live: Box<dyn LiveQuoteProvider>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn without_live_quotes(mut self) -> Self {
        self.live = None;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cache(mut self, cache: Box<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    pub fn has_live_quotes(&self) -> bool {
        self.live.is_some()
    }

    fn fetcher(&self) -> IncrementalFetcher<'_> {
        IncrementalFetcher::new(self.cache.as_ref(), &self.providers)
            .use_cache(self.config.enable_cache)
    }

    /// Read one vendor series over `[origin, end]`.
    ///
    /// With `use_reference` on, the result is the updated reference series;
    /// otherwise it is the vendor window itself.
    pub fn read(&self, ticker: &str, source: Source, end: RequestedEnd) -> Result<Series, DataError> {
        if source.is_reference() {
            return Err(DataError::ReferenceNotRemote);
        }

        let today = self.clock.today();
        let end_date = end.resolve(today);
        let origin = self.config.origin;

        let outcome = self.fetcher().fetch_outcome(ticker, source, origin, end_date)?;
        if outcome.plan == FetchPlan::Empty {
            debug!(%ticker, %source, %end_date, "empty range, nothing to store");
            return Ok(Series::new());
        }
        let mut history = outcome.history;
        let mut window = history.window(origin, end_date);

        if source.supports_live_quotes() {
            if let Some(live) = &self.live {
                let splice = splice_live_quote(&mut window, ticker, end_date, today, live.as_ref());
                if let SpliceOutcome::Applied { date, price } = splice {
                    info!(%ticker, %date, price, "spliced live quote");
                    if let Some(bar) = history.get_mut(date) {
                        bar.adj_close = Some(price);
                    }
                }
            }
        }

        self.cache.save(ticker, source, &history)?;
        info!(%ticker, %source, bars = history.len(), "saved source series");

        if !self.config.use_reference {
            return Ok(window);
        }

        let reference = self.cache.load(ticker, Source::Reference)?;
        let combined = combine_reference(reference, &window);
        self.cache.save(ticker, Source::Reference, &combined)?;
        info!(%ticker, bars = combined.len(), "saved reference series");
        Ok(combined)
    }

    /// Read every source in `sources` and aggregate them into the reference.
    ///
    /// All sources are fetched before anything is written, so one failing
    /// vendor leaves the whole cache untouched.
    pub fn read_multi_sources(
        &self,
        ticker: &str,
        sources: &[Source],
        end: RequestedEnd,
        strategy: &dyn AggregationStrategy,
    ) -> Result<Option<Series>, DataError> {
        if sources.contains(&Source::Reference) {
            return Err(DataError::ReferenceNotRemote);
        }

        let end_date = end.resolve(self.clock.today());
        let origin = self.config.origin;
        let fetcher = self.fetcher();

        let mut fetched = Vec::with_capacity(sources.len());
        for &source in sources {
            let outcome = fetcher.fetch_outcome(ticker, source, origin, end_date)?;
            fetched.push((source, outcome));
        }
        // every source shares the range, so one empty plan means all are
        if fetched.iter().any(|(_, o)| o.plan == FetchPlan::Empty) {
            debug!(%ticker, %end_date, "empty range, nothing to store");
            return Ok(Some(Series::new()));
        }

        for (source, outcome) in &fetched {
            self.cache.save(ticker, *source, &outcome.history)?;
        }

        let windows: Vec<Series> = fetched
            .iter()
            .map(|(_, outcome)| outcome.window(origin, end_date))
            .collect();
        let aggregate = strategy.aggregate(&windows);

        if let Some(reference) = &aggregate {
            self.cache.save(ticker, Source::Reference, reference)?;
            info!(
                %ticker,
                sources = sources.len(),
                strategy = strategy.name(),
                bars = reference.len(),
                "saved aggregated reference"
            );
        }
        Ok(aggregate)
    }

    /// `All` aggregates the configured sources with the configured strategy;
    /// `One` is a single-source `read`.
    pub fn read_selection(
        &self,
        ticker: &str,
        selection: SourceSelection,
        end: RequestedEnd,
    ) -> Result<Option<Series>, DataError> {
        match selection {
            SourceSelection::One(source) => self.read(ticker, source, end).map(Some),
            SourceSelection::All => {
                let strategy = self.config.aggregation.strategy();
                self.read_multi_sources(ticker, &self.config.sources, end, strategy.as_ref())
            }
        }
    }
}

impl std::fmt::Debug for DataReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataReader")
            .field("config", &self.config)
            .field("providers", &self.providers)
            .field("live_quotes", &self.live.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn requested_end_resolution() {
        assert_eq!(RequestedEnd::Today.resolve(d("2017-11-02")), d("2017-11-02"));
        assert_eq!(
            RequestedEnd::from(Some(d("2017-10-31"))).resolve(d("2017-11-02")),
            d("2017-10-31")
        );
        assert_eq!(RequestedEnd::from(None), RequestedEnd::Today);
    }

    #[test]
    fn from_config_attaches_live_quotes_only_for_network_vendors() {
        let config = ReaderConfig::new("unused");
        assert!(DataReader::from_config(config.clone()).unwrap().has_live_quotes());

        let mut offline = config;
        offline.import_dir = Some("fixtures".into());
        assert!(!DataReader::from_config(offline).unwrap().has_live_quotes());
    }

    #[test]
    fn import_dir_routes_every_vendor_to_csv() {
        let mut config = ReaderConfig::new("unused");
        config.import_dir = Some("fixtures".into());
        let registry = default_registry(&config).unwrap();
        for source in [Source::Yahoo, Source::GoogleRealtime, Source::Quandl] {
            assert_eq!(registry.resolve(source).unwrap().1.name(), "csv_import");
        }
    }
}
