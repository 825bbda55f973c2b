//! Parquet encoding of a series for the file cache.
//!
//! Schema: `date` (Date) plus one nullable Float64 column per bar column,
//! named by `Column::field_name`.

use super::provider::DataError;
use super::series::{Bar, Column as Field, Series as PriceSeries};
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::Path;

fn epoch() -> Result<NaiveDate, DataError> {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| DataError::ParquetError("invalid epoch".into()))
}

/// Convert a series to a Polars DataFrame.
fn series_to_dataframe(series: &PriceSeries) -> Result<DataFrame, DataError> {
    let epoch = epoch()?;
    let dates: Vec<i32> = series
        .iter()
        .map(|b| (b.date - epoch).num_days() as i32)
        .collect();

    let mut columns = Vec::with_capacity(Field::ALL.len() + 1);
    columns.push(
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
    );
    for field in Field::ALL {
        let values: Vec<Option<f64>> = series.iter().map(|b| b.get(field)).collect();
        columns.push(Column::new(field.field_name().into(), values));
    }

    DataFrame::new(columns)
        .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

/// Write a series to a Parquet file.
pub fn write_parquet(path: &Path, series: &PriceSeries) -> Result<(), DataError> {
    let mut df = series_to_dataframe(series)?;
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

/// Load a Parquet file and validate its schema.
pub fn read_parquet(path: &Path) -> Result<PriceSeries, DataError> {
    let file = fs::File::open(path)?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    let expected = std::iter::once("date").chain(Field::ALL.iter().map(|f| f.field_name()));
    for col_name in expected {
        if df.column(col_name).is_err() {
            return Err(DataError::ParquetError(format!("missing column '{col_name}'")));
        }
    }

    dataframe_to_series(&df)
}

/// Convert a DataFrame back to a series.
fn dataframe_to_series(df: &DataFrame) -> Result<PriceSeries, DataError> {
    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));

    let date_ca = df
        .column("date")
        .map_err(map_err)?
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;

    let mut value_cas = Vec::with_capacity(Field::ALL.len());
    for field in Field::ALL {
        let ca = df
            .column(field.field_name())
            .map_err(map_err)?
            .f64()
            .map_err(|e| {
                DataError::ParquetError(format!("{} column type: {e}", field.field_name()))
            })?;
        value_cas.push((field, ca));
    }

    let epoch = epoch()?;
    let n = df.height();
    let mut bars = Vec::with_capacity(n);

    for i in 0..n {
        let date_days = date_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        let mut bar = Bar::empty(epoch + chrono::Duration::days(date_days as i64));
        for (field, ca) in &value_cas {
            bar.set(*field, ca.get(i));
        }
        bars.push(bar);
    }

    Ok(PriceSeries::from_bars(bars))
}
