//! Data loading: wide prices CSV from disk, or synthetic random walks.
//!
//! The CSV layout is `date,<col>,<col>,...` with ISO dates. Empty cells (and
//! `NA`/`NaN` markers) are missing observations. Rows may arrive in any order;
//! they are sorted by date before the table is built.

use chrono::{Datelike, NaiveDate, Weekday};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use indexcast_core::data::{TableError, TimeSeriesTable};

/// Errors from loading price data.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("prices file has no header row")]
    MissingHeader,

    #[error("prices file has no value columns")]
    NoColumns,

    #[error("row {row}: invalid date '{value}'")]
    InvalidDate { row: usize, value: String },

    #[error("row {row}, column '{column}': invalid number '{value}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("table error: {0}")]
    Table(#[from] TableError),
}

/// Loaded prices plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedPrices {
    pub prices: TimeSeriesTable,
    /// Content hash over column names, dates and values.
    pub dataset_hash: String,
    /// True when the data was generated rather than read.
    pub synthetic: bool,
}

impl LoadedPrices {
    fn new(prices: TimeSeriesTable, synthetic: bool) -> Self {
        let dataset_hash = compute_dataset_hash(&prices);
        Self {
            prices,
            dataset_hash,
            synthetic,
        }
    }
}

/// Read a wide prices CSV from disk.
pub fn load_prices_csv(path: &Path) -> Result<LoadedPrices, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let prices = parse_prices(file)?;
    tracing::info!(
        path = %path.display(),
        rows = prices.len(),
        columns = prices.columns().len(),
        "loaded prices"
    );
    Ok(LoadedPrices::new(prices, false))
}

/// Parse wide prices CSV from any reader.
pub fn parse_prices<R: Read>(reader: R) -> Result<TimeSeriesTable, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(LoadError::MissingHeader);
    }
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    if columns.is_empty() {
        return Err(LoadError::NoColumns);
    }

    let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let raw_date = record.get(0).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| LoadError::InvalidDate {
            row,
            value: raw_date.to_string(),
        })?;

        let mut values = Vec::with_capacity(columns.len());
        for (c, column) in columns.iter().enumerate() {
            let cell = record.get(c + 1).unwrap_or_default();
            values.push(parse_cell(cell).ok_or_else(|| LoadError::InvalidNumber {
                row,
                column: column.clone(),
                value: cell.to_string(),
            })?);
        }
        rows.push((date, values));
    }

    rows.sort_by_key(|(date, _)| *date);

    let dates: Vec<NaiveDate> = rows.iter().map(|(d, _)| *d).collect();
    let values: Vec<Vec<f64>> = (0..columns.len())
        .map(|c| rows.iter().map(|(_, v)| v[c]).collect())
        .collect();
    Ok(TimeSeriesTable::new(dates, columns, values)?)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // accept timestamps by keeping the date part
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn parse_cell(raw: &str) -> Option<f64> {
    match raw {
        "" | "NA" | "N/A" | "NaN" | "nan" | "null" => Some(f64::NAN),
        _ => raw.parse::<f64>().ok(),
    }
}

/// Deterministic content hash of a table.
pub fn compute_dataset_hash(table: &TimeSeriesTable) -> String {
    let mut hasher = blake3::Hasher::new();
    for name in table.columns() {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    for date in table.dates() {
        hasher.update(date.to_string().as_bytes());
    }
    for c in 0..table.columns().len() {
        for v in table.column_at(c) {
            hasher.update(&v.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate synthetic prices for development.
///
/// One random walk per column from a starting price of 100.0 on weekdays in
/// `[start, end]`. Each column is seeded from its name, so output is
/// reproducible.
pub fn generate_synthetic_prices(
    columns: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<LoadedPrices, LoadError> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let dates: Vec<NaiveDate> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect();

    let values: Vec<Vec<f64>> = columns
        .iter()
        .map(|name| {
            let seed: [u8; 32] = *blake3::hash(name.as_bytes()).as_bytes();
            let mut rng = StdRng::from_seed(seed);
            let mut price = 100.0_f64;
            dates
                .iter()
                .map(|_| {
                    price *= 1.0 + rng.gen_range(-0.02..0.021);
                    price
                })
                .collect()
        })
        .collect();

    let prices = TimeSeriesTable::new(dates, columns.to_vec(), values)?;
    tracing::info!(
        rows = prices.len(),
        columns = prices.columns().len(),
        "generated synthetic prices"
    );
    Ok(LoadedPrices::new(prices, true))
}
