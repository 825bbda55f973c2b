//! Market data retrieval, caching and reconciliation

pub mod aggregate;
pub mod cache;
pub mod csv_import;
pub mod fetch;
pub mod google;
pub mod live;
pub mod parquet_io;
pub mod provider;
pub mod quandl;
pub mod reader;
pub mod reference;
pub mod series;
pub mod source;
pub mod synthetic;
pub mod yahoo;

pub use aggregate::{AggregationKind, AggregationStrategy, AverageStrategy, PriorityStrategy};
pub use cache::{CacheConfig, CacheFormat, CacheMeta, CacheStore, FileCache, MemoryCache};
pub use csv_import::CsvImportProvider;
pub use fetch::{plan_fetch, FetchOutcome, FetchPlan, IncrementalFetcher};
pub use google::GoogleProvider;
pub use live::{
    apply_quote, splice_live_quote, GoogleQuoteProvider, LiveQuote, LiveQuoteProvider,
    SpliceOutcome,
};
pub use provider::{DataError, HistoricalProvider, ProviderRegistry};
pub use quandl::QuandlProvider;
pub use reader::{default_registry, Clock, DataReader, FixedClock, RequestedEnd, SystemClock};
pub use reference::combine_reference;
pub use series::{Bar, Column, Series};
pub use source::{Source, SourceSelection};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
