//! stockcache core: daily market data with a local cache.
//!
//! This crate contains:
//! - The daily series model (bars with missing-value cells)
//! - Historical providers (Yahoo, Google, Quandl, CSV import, synthetic)
//! - The per-(ticker, source) cache store, CSV or Parquet on disk
//! - Incremental fetch: only the tail the cache lacks is requested
//! - Multi-source aggregation and the reference series combiner
//! - Same-day live quote splicing
//! - The `DataReader` facade and its TOML configuration

pub mod config;
pub mod data;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the reader and its collaborators are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<data::Series>();
        require_sync::<data::Series>();
        require_send::<data::Source>();
        require_sync::<data::Source>();
        require_send::<data::FileCache>();
        require_sync::<data::FileCache>();
        require_send::<data::MemoryCache>();
        require_sync::<data::MemoryCache>();
        require_send::<data::ProviderRegistry>();
        require_sync::<data::ProviderRegistry>();
        require_send::<data::DataReader>();
        require_sync::<data::DataReader>();
        require_send::<config::ReaderConfig>();
        require_sync::<config::ReaderConfig>();
    }

    /// Architecture contract: providers never see the cache.
    ///
    /// `HistoricalProvider::fetch` takes only the symbol, source and range.
    #[test]
    fn provider_trait_has_no_cache_parameter() {
        fn _check_trait_object_builds(
            provider: &dyn data::HistoricalProvider,
            start: chrono::NaiveDate,
            end: chrono::NaiveDate,
        ) -> Result<data::Series, data::DataError> {
            provider.fetch("SPY", data::Source::Yahoo, start, end)
        }
    }
}
