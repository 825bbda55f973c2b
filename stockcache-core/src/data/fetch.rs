//! Incremental fetch: serve from cache, fetch only the missing tail.
//!
//! Given a cached series ending at `cache_last` and a request for
//! `[start, end]`:
//! - no cache (or an empty one): fetch `[start, end]`
//! - `cache_last >= end`: no remote call
//! - otherwise: fetch `[cache_last, end]` and merge, remote values winning
//!   on the shared boundary date

use super::cache::CacheStore;
use super::provider::{DataError, ProviderRegistry};
use super::series::Series;
use super::source::Source;
use chrono::NaiveDate;
use tracing::{debug, info};

/// What a fetch cycle has to do for one (ticker, source).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    /// `start > end`: nothing to return.
    Empty,
    /// The cache already reaches `end`.
    CachedOnly,
    /// Nothing usable cached; fetch the whole range.
    Full { start: NaiveDate, end: NaiveDate },
    /// Fetch from the last cached date (inclusive) to `end`.
    Gap { start: NaiveDate, end: NaiveDate },
}

impl FetchPlan {
    /// Range requested from the vendor, if any.
    pub fn remote_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            FetchPlan::Full { start, end } | FetchPlan::Gap { start, end } => Some((start, end)),
            FetchPlan::Empty | FetchPlan::CachedOnly => None,
        }
    }
}

/// Decide what to fetch for `[start, end]` given the cached series.
pub fn plan_fetch(cached: Option<&Series>, start: NaiveDate, end: NaiveDate) -> FetchPlan {
    if start > end {
        return FetchPlan::Empty;
    }
    match cached.and_then(Series::last_date) {
        None => FetchPlan::Full { start, end },
        Some(cache_last) if cache_last >= end => FetchPlan::CachedOnly,
        Some(cache_last) => FetchPlan::Gap {
            start: cache_last,
            end,
        },
    }
}

/// Result of one fetch cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub plan: FetchPlan,
    /// Cached rows merged with the remote rows: what the cache should hold next.
    pub history: Series,
}

impl FetchOutcome {
    /// The requested `[start, end]` slice of the merged history.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Series {
        self.history.window(start, end)
    }
}

/// Cache-aware fetcher over a provider registry.
pub struct IncrementalFetcher<'a> {
    cache: &'a dyn CacheStore,
    providers: &'a ProviderRegistry,
    use_cache: bool,
}

impl<'a> IncrementalFetcher<'a> {
    pub fn new(cache: &'a dyn CacheStore, providers: &'a ProviderRegistry) -> Self {
        Self {
            cache,
            providers,
            use_cache: true,
        }
    }

    /// When disabled the cache is never read and every fetch covers the full range.
    pub fn use_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    /// Exactly the `[start, end]` window for (ticker, source).
    pub fn fetch(
        &self,
        ticker: &str,
        source: Source,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, DataError> {
        Ok(self.fetch_outcome(ticker, source, start, end)?.window(start, end))
    }

    /// Run one fetch cycle and return the plan with the merged history.
    ///
    /// Nothing is written to the cache here.
    pub fn fetch_outcome(
        &self,
        ticker: &str,
        source: Source,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchOutcome, DataError> {
        let cached = if self.use_cache {
            self.cache.load(ticker, source)?
        } else {
            None
        };

        let plan = plan_fetch(cached.as_ref(), start, end);
        debug!(%ticker, %source, ?plan, "fetch plan");

        let history = match plan.remote_range() {
            None => cached.unwrap_or_default(),
            Some((start, end)) => {
                let remote = self.fetch_remote(ticker, source, start, end)?;
                match cached {
                    Some(cached) => remote.combine_first(&cached),
                    None => remote,
                }
            }
        };

        Ok(FetchOutcome { plan, history })
    }

    fn fetch_remote(
        &self,
        ticker: &str,
        source: Source,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, DataError> {
        let (vendor, provider) = self.providers.resolve(source)?;
        info!(%ticker, %source, %vendor, provider = provider.name(), %start, %end, "fetching remote data");
        let remote = provider.fetch(ticker, vendor, start, end)?;
        Ok(remote.window(start, end))
    }
}
