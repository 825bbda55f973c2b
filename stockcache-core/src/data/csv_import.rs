//! Offline provider over a directory of CSV files.
//!
//! Files use the cache CSV layout and naming, `<TICKER>.<vendor>.csv`, so a
//! copied cache directory (or a test fixture directory) can serve as a vendor.

use super::cache::{cache_file_stem, read_csv};
use super::provider::{DataError, HistoricalProvider};
use super::series::Series;
use super::source::Source;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvImportProvider {
    dir: PathBuf,
}

impl CsvImportProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file serving (symbol, vendor).
    pub fn file_path(&self, symbol: &str, vendor: Source) -> PathBuf {
        self.dir
            .join(format!("{}.csv", cache_file_stem(symbol, vendor)))
    }
}

impl HistoricalProvider for CsvImportProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        source: Source,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, DataError> {
        let path = self.file_path(symbol, source);
        if !path.is_file() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        debug!(%symbol, %source, path = %path.display(), "importing CSV");
        let series = read_csv(fs::File::open(&path)?)
            .map_err(|e| DataError::CsvError(format!("{}: {e}", path.display())))?;
        Ok(series.window(start, end))
    }
}
