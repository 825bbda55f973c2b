//! Series cache: one record per (ticker, source).
//!
//! Layout: `{cache_dir}/{TICKER}.{source}.{csv|parquet}`, and
//! `{cache_dir}/{TICKER}.{csv|parquet}` for the reference series.
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Whole-record overwrite on every save, never partial updates
//! - Quarantine for corrupt files ({filename}.quarantined)
//! - Metadata sidecar per record (hash, date range, source)

use super::parquet_io;
use super::provider::DataError;
use super::series::{Bar, Column, Series};
use super::source::Source;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// On-disk encoding of a cache record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheFormat {
    #[default]
    Csv,
    Parquet,
}

impl CacheFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CacheFormat::Csv => "csv",
            CacheFormat::Parquet => "parquet",
        }
    }
}

impl std::str::FromStr for CacheFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(CacheFormat::Csv),
            "parquet" => Ok(CacheFormat::Parquet),
            other => Err(format!("unknown cache format '{other}' (expected csv or parquet)")),
        }
    }
}

/// Where and how cache records are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: PathBuf,
    #[serde(default)]
    pub format: CacheFormat,
}

/// Key-value persistence for series.
pub trait CacheStore: Send + Sync {
    /// The stored series for (ticker, source), `None` if there is none.
    fn load(&self, ticker: &str, source: Source) -> Result<Option<Series>, DataError>;

    /// Replace the record for (ticker, source) with `series`.
    fn save(&self, ticker: &str, source: Source, series: &Series) -> Result<(), DataError>;
}

/// Metadata sidecar for a cached record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub ticker: String,
    pub source: Source,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: usize,
    pub data_hash: String,
    pub format: CacheFormat,
    pub cached_at: chrono::NaiveDateTime,
}

/// Filename-safe, injective encoding of a ticker.
///
/// ASCII alphanumerics and `-`, `_`, `^`, `=` are kept; every other byte is
/// written as `%XX`.
pub fn encode_ticker(ticker: &str) -> String {
    let mut out = String::with_capacity(ticker.len());
    for byte in ticker.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'^' | b'=' => {
                out.push(byte as char)
            }
            other => {
                let _ = write!(out, "%{other:02X}");
            }
        }
    }
    out
}

/// File stem of the record for (ticker, source).
pub fn cache_file_stem(ticker: &str, source: Source) -> String {
    let ticker = encode_ticker(ticker);
    if source.is_reference() {
        ticker
    } else {
        format!("{ticker}.{}", source.id())
    }
}

/// File-backed cache in an explicit directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    config: CacheConfig,
}

impl FileCache {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.config.dir
    }

    /// Path of the data file for (ticker, source).
    pub fn record_path(&self, ticker: &str, source: Source) -> PathBuf {
        self.config.dir.join(format!(
            "{}.{}",
            cache_file_stem(ticker, source),
            self.config.format.extension()
        ))
    }

    /// Path to the metadata sidecar for (ticker, source).
    fn meta_path(&self, ticker: &str, source: Source) -> PathBuf {
        self.config
            .dir
            .join(format!("{}.meta.json", cache_file_stem(ticker, source)))
    }

    /// Metadata of a cached record, if any.
    pub fn get_meta(&self, ticker: &str, source: Source) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(ticker, source)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Metadata of every record in the cache directory, sorted by ticker then source.
    pub fn status(&self) -> Result<Vec<CacheMeta>, DataError> {
        if !self.config.dir.exists() {
            return Ok(Vec::new());
        }

        let mut metas = Vec::new();
        for entry in fs::read_dir(&self.config.dir)? {
            let path = entry?.path();
            let is_meta = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".meta.json"));
            if !is_meta {
                continue;
            }
            match fs::read_to_string(&path)
                .ok()
                .and_then(|c| serde_json::from_str::<CacheMeta>(&c).ok())
            {
                Some(meta) => metas.push(meta),
                None => warn!(path = %path.display(), "skipping unreadable cache metadata"),
            }
        }

        metas.sort_by(|a, b| (&a.ticker, a.source).cmp(&(&b.ticker, b.source)));
        Ok(metas)
    }

    fn read_record(&self, path: &Path) -> Result<Series, DataError> {
        match self.config.format {
            CacheFormat::Csv => read_csv(fs::File::open(path)?),
            CacheFormat::Parquet => parquet_io::read_parquet(path),
        }
    }

    fn write_record(&self, path: &Path, series: &Series) -> Result<(), DataError> {
        match self.config.format {
            CacheFormat::Csv => {
                let file = fs::File::create(path)?;
                write_csv(file, series)
            }
            CacheFormat::Parquet => parquet_io::write_parquet(path, series),
        }
    }

    fn write_meta(&self, ticker: &str, source: Source, series: &Series) -> Result<(), DataError> {
        let meta = CacheMeta {
            ticker: ticker.to_string(),
            source,
            start_date: series.first_date(),
            end_date: series.last_date(),
            bar_count: series.len(),
            data_hash: data_hash(series)?,
            format: self.config.format,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(ticker, source), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))
    }
}

impl CacheStore for FileCache {
    fn load(&self, ticker: &str, source: Source) -> Result<Option<Series>, DataError> {
        let path = self.record_path(ticker, source);
        if !path.exists() {
            debug!(%ticker, %source, "no cache record");
            return Ok(None);
        }

        match self.read_record(&path) {
            Ok(series) => {
                debug!(%ticker, %source, bars = series.len(), "cache hit");
                Ok(Some(series))
            }
            // an unreadable file is not a corrupt one
            Err(e @ DataError::Io(_)) => Err(e),
            Err(e) => {
                let quarantine = path.with_extension(format!(
                    "{}.quarantined",
                    self.config.format.extension()
                ));
                warn!(
                    path = %path.display(),
                    error = %e,
                    "quarantining corrupt cache file"
                );
                let _ = fs::rename(&path, &quarantine);
                Ok(None)
            }
        }
    }

    fn save(&self, ticker: &str, source: Source, series: &Series) -> Result<(), DataError> {
        fs::create_dir_all(&self.config.dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let path = self.record_path(ticker, source);
        let tmp_path = path.with_extension(format!("{}.tmp", self.config.format.extension()));

        if let Err(e) = self.write_record(&tmp_path, series) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        self.write_meta(ticker, source, series)?;
        debug!(%ticker, %source, bars = series.len(), path = %path.display(), "cache record written");
        Ok(())
    }
}

/// In-process cache. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    records: Mutex<HashMap<(String, Source), Series>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn load(&self, ticker: &str, source: Source) -> Result<Option<Series>, DataError> {
        let records = self
            .records
            .lock()
            .map_err(|_| DataError::CacheError("memory cache lock poisoned".into()))?;
        Ok(records.get(&(ticker.to_string(), source)).cloned())
    }

    fn save(&self, ticker: &str, source: Source, series: &Series) -> Result<(), DataError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| DataError::CacheError("memory cache lock poisoned".into()))?;
        records.insert((ticker.to_string(), source), series.clone());
        Ok(())
    }
}

/// BLAKE3 hash over the serialized bars.
fn data_hash(series: &Series) -> Result<String, DataError> {
    let bytes = serde_json::to_vec(series.bars())
        .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// ── CSV I/O helpers ─────────────────────────────────────────────────

const DATE_HEADER: &str = "Date";

/// Write a series as CSV: `Date,Open,High,Low,Close,Adj Close,Volume`,
/// missing cells as empty fields.
pub fn write_csv<W: Write>(writer: W, series: &Series) -> Result<(), DataError> {
    let map_err = |e: csv::Error| DataError::CsvError(format!("write: {e}"));
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![DATE_HEADER];
    header.extend(Column::ALL.iter().map(|c| c.header()));
    wtr.write_record(&header).map_err(map_err)?;

    for bar in series {
        let mut record = Vec::with_capacity(Column::ALL.len() + 1);
        record.push(bar.date.format("%Y-%m-%d").to_string());
        for column in Column::ALL {
            record.push(bar.get(column).map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record).map_err(map_err)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Read a CSV series with a `Date` column and any subset of the value
/// columns. A file without an `Adj Close` column gets AdjClose from Close.
pub fn read_csv<R: Read>(reader: R) -> Result<Series, DataError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().map_err(|e| csv_read_error("header", e))?.clone();

    let date_idx = headers
        .iter()
        .position(|h| h.trim() == DATE_HEADER)
        .ok_or_else(|| DataError::CsvError("missing 'Date' column".into()))?;
    let column_idx: Vec<(Column, usize)> = Column::ALL
        .iter()
        .filter_map(|c| headers.iter().position(|h| h.trim() == c.header()).map(|i| (*c, i)))
        .collect();
    let has_adj_close = column_idx.iter().any(|(c, _)| *c == Column::AdjClose);

    let mut bars = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| csv_read_error(&format!("row {row}"), e))?;
        let raw_date = record.get(date_idx).unwrap_or_default().trim();
        let date = parse_date(raw_date)
            .ok_or_else(|| DataError::CsvError(format!("row {row}: bad date '{raw_date}'")))?;

        let mut bar = Bar::empty(date);
        for (column, idx) in &column_idx {
            let raw = record.get(*idx).unwrap_or_default();
            let value = parse_cell(raw).map_err(|_| {
                DataError::CsvError(format!("row {row}: bad {column} value '{raw}'"))
            })?;
            bar.set(*column, value);
        }
        bars.push(bar);
    }

    let mut series = Series::from_bars(bars);
    if !has_adj_close {
        series.fill_adj_close_from_close();
    }
    Ok(series)
}

/// I/O failures under the CSV reader stay `Io`; everything else is a decode error.
fn csv_read_error(context: &str, e: csv::Error) -> DataError {
    if !e.is_io_error() {
        return DataError::CsvError(format!("{context}: {e}"));
    }
    match e.into_kind() {
        csv::ErrorKind::Io(io) => DataError::Io(io),
        other => DataError::CsvError(format!("{context}: {other:?}")),
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// One numeric cell. Empty, `NaN` and `null` are missing values.
pub(crate) fn parse_cell(raw: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    let value: f64 = raw.parse()?;
    Ok(if value.is_nan() { None } else { Some(value) })
}
