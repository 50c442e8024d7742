//! Date-indexed table of named numeric columns.
//!
//! Missing observations are stored as `NaN`. Rows are chronological and
//! never reordered; every transformation keeps column names intact.

use chrono::NaiveDate;
use std::collections::HashSet;
use thiserror::Error;

use super::frequency::Frequency;

/// Errors raised when a table violates its shape or ordering invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("dates must be strictly increasing: {current} at row {row} follows {previous}")]
    NonChronological {
        row: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("duplicate date {0}")]
    DuplicateDate(NaiveDate),

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("{columns} column names for {value_columns} value columns")]
    ColumnCountMismatch {
        columns: usize,
        value_columns: usize,
    },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),
}

/// Wide time-series table: one row per date, one column per instrument.
#[derive(Debug, Clone)]
pub struct TimeSeriesTable {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    /// Column-major values; each inner Vec has `dates.len()` entries.
    values: Vec<Vec<f64>>,
    frequency: Option<Frequency>,
}

/// The non-missing observations of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl TimeSeriesTable {
    /// Build a table, checking chronology and shape.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, TableError> {
        if columns.len() != values.len() {
            return Err(TableError::ColumnCountMismatch {
                columns: columns.len(),
                value_columns: values.len(),
            });
        }

        for (row, pair) in dates.windows(2).enumerate() {
            if pair[1] == pair[0] {
                return Err(TableError::DuplicateDate(pair[1]));
            }
            if pair[1] < pair[0] {
                return Err(TableError::NonChronological {
                    row: row + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }

        let mut seen = HashSet::new();
        for (name, column) in columns.iter().zip(&values) {
            if !seen.insert(name.as_str()) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
            if column.len() != dates.len() {
                return Err(TableError::LengthMismatch {
                    column: name.clone(),
                    expected: dates.len(),
                    actual: column.len(),
                });
            }
        }

        Ok(Self {
            dates,
            columns,
            values,
            frequency: None,
        })
    }

    /// Build a table from `(name, values)` pairs.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, TableError> {
        let (names, values) = columns.into_iter().unzip();
        Self::new(dates, names, values)
    }

    /// Tag the table with its sampling frequency.
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.column_index(name).map(|i| self.values[i].as_slice())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of the column at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn column_at(&self, index: usize) -> &[f64] {
        &self.values[index]
    }

    /// Value at (`row`, `col`), `NaN` when missing.
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[col][row]
    }

    /// Rows `[start, end)`, clamped to the table bounds.
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.dates.len());
        let start = start.min(end);
        Self {
            dates: self.dates[start..end].to_vec(),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|col| col[start..end].to_vec())
                .collect(),
            frequency: self.frequency,
        }
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Self, TableError> {
        let mut values = Vec::with_capacity(names.len());
        for name in names {
            let idx = self
                .column_index(name)
                .ok_or_else(|| TableError::UnknownColumn(name.clone()))?;
            values.push(self.values[idx].clone());
        }
        let table = Self::new(self.dates.clone(), names.to_vec(), values)?;
        Ok(Self {
            frequency: self.frequency,
            ..table
        })
    }

    /// Number of rows in which every column has a value.
    pub fn non_missing_row_count(&self) -> usize {
        (0..self.dates.len())
            .filter(|&row| self.values.iter().all(|col| !col[row].is_nan()))
            .count()
    }

    /// Drop rows where every column is missing, then columns that are entirely missing.
    pub fn drop_empty(&self) -> Self {
        let keep_rows: Vec<usize> = (0..self.dates.len())
            .filter(|&row| self.values.iter().any(|col| !col[row].is_nan()))
            .collect();

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (name, col) in self.columns.iter().zip(&self.values) {
            let kept: Vec<f64> = keep_rows.iter().map(|&r| col[r]).collect();
            if kept.iter().any(|v| !v.is_nan()) {
                columns.push(name.clone());
                values.push(kept);
            }
        }

        Self {
            dates: keep_rows.iter().map(|&r| self.dates[r]).collect(),
            columns,
            values,
            frequency: self.frequency,
        }
    }

    /// Non-missing observations of the named column.
    pub fn series(&self, name: &str) -> Option<Series> {
        self.column_index(name).map(|i| self.series_at(i))
    }

    /// Non-missing observations of the column at `index`.
    pub fn series_at(&self, index: usize) -> Series {
        Series::from_slices(&self.columns[index], &self.dates, &self.values[index])
    }
}

impl Series {
    /// Collect the non-missing `(date, value)` pairs from aligned slices.
    pub fn from_slices(name: &str, dates: &[NaiveDate], values: &[f64]) -> Self {
        let (dates, values) = dates
            .iter()
            .zip(values)
            .filter(|(_, v)| !v.is_nan())
            .map(|(d, v)| (*d, *v))
            .unzip();
        Self {
            name: name.to_string(),
            dates,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.dates.last().copied().zip(self.values.last().copied())
    }
}
