//! Serializable reader configuration.
//!
//! Loaded from TOML or built in code. The cache directory is always given
//! explicitly; nothing here resolves a default location on its own.

use crate::data::aggregate::AggregationKind;
use crate::data::cache::{CacheConfig, CacheFormat};
use crate::data::source::Source;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// HTTP client settings shared by the network providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
        }
    }
}

/// Everything a `DataReader` needs besides its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReaderConfig {
    /// First date requested from a vendor on a cold cache.
    #[serde(default = "default_origin")]
    pub origin: NaiveDate,

    /// When false, cached history is ignored and the full range is refetched.
    #[serde(default = "default_true")]
    pub enable_cache: bool,

    /// When true, single-source reads are folded into the reference series.
    #[serde(default = "default_true")]
    pub use_reference: bool,

    /// Vendors covered by a multi-source read.
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,

    #[serde(default)]
    pub aggregation: AggregationKind,

    /// Directory of `<ticker>.<vendor>.csv` files served by the CSV import provider.
    #[serde(default)]
    pub import_dir: Option<PathBuf>,

    pub cache: CacheConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

fn default_origin() -> NaiveDate {
    NaiveDate::from_ymd_opt(1926, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_true() -> bool {
    true
}

fn default_sources() -> Vec<Source> {
    Source::DEFAULT_VENDORS.to_vec()
}

impl ReaderConfig {
    /// Defaults with the given cache directory and CSV storage.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            origin: default_origin(),
            enable_cache: true,
            use_reference: true,
            sources: default_sources(),
            aggregation: AggregationKind::default(),
            import_dir: None,
            cache: CacheConfig {
                dir: cache_dir.into(),
                format: CacheFormat::default(),
            },
            http: HttpConfig::default(),
        }
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no reader could serve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("sources must not be empty".into()));
        }
        if self.sources.contains(&Source::Reference) {
            return Err(ConfigError::Invalid(
                "'reference' is built locally and cannot be listed as a source".into(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ReaderConfig::from_toml(
            r#"
[cache]
dir = "/tmp/stock-data"
"#,
        )
        .unwrap();

        assert_eq!(config, ReaderConfig::new("/tmp/stock-data"));
        assert_eq!(config.origin, NaiveDate::from_ymd_opt(1926, 1, 1).unwrap());
        assert_eq!(
            config.sources,
            vec![Source::Yahoo, Source::GoogleRealtime, Source::Quandl]
        );
        assert_eq!(config.cache.format, CacheFormat::Csv);
    }

    #[test]
    fn full_toml_overrides_everything() {
        let config = ReaderConfig::from_toml(
            r#"
origin = "2000-01-03"
enable_cache = false
use_reference = false
sources = ["yahoo", "quandl"]
aggregation = "priority"
import_dir = "fixtures"

[cache]
dir = "data"
format = "parquet"

[http]
timeout_secs = 5
user_agent = "stockcache-test"
"#,
        )
        .unwrap();

        assert_eq!(config.origin, NaiveDate::from_ymd_opt(2000, 1, 3).unwrap());
        assert!(!config.enable_cache);
        assert!(!config.use_reference);
        assert_eq!(config.sources, vec![Source::Yahoo, Source::Quandl]);
        assert_eq!(config.aggregation, AggregationKind::Priority);
        assert_eq!(config.cache.format, CacheFormat::Parquet);
        assert_eq!(config.http.timeout_secs, 5);
        assert_eq!(config.import_dir, Some(PathBuf::from("fixtures")));
    }

    #[test]
    fn reference_in_sources_is_rejected() {
        let err = ReaderConfig::from_toml(
            r#"
sources = ["yahoo", "reference"]
[cache]
dir = "data"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_cache_section_is_a_parse_error() {
        let err = ReaderConfig::from_toml("use_reference = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config = ReaderConfig::new("data");
        let text = toml::to_string(&config).unwrap();
        assert_eq!(ReaderConfig::from_toml(&text).unwrap(), config);
    }
}
