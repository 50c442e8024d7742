//! Multi-frequency reshaping of price histories.
//!
//! Prices are first regridded onto business days (last observation per day,
//! gaps forward-filled). Each frequency then takes the last value in every
//! period, labelled by the period end. A trailing period whose label is not
//! the last business date is incomplete and dropped. Returns are
//! period-over-period percentage changes, so a return table is always one row
//! shorter than its level table.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use thiserror::Error;

use super::frequency::{is_weekend, Frequency, ValueKind};
use super::table::{TableError, TimeSeriesTable};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("price table is empty")]
    EmptyInput,

    #[error("no {kind} table for frequency {frequency}")]
    MissingSlice {
        frequency: Frequency,
        kind: ValueKind,
    },

    #[error("table error: {0}")]
    Table(#[from] TableError),
}

/// Level and return tables for every frequency, keyed by (frequency, kind).
#[derive(Debug, Clone, Default)]
pub struct FrequencyPanel {
    tables: BTreeMap<(Frequency, ValueKind), TimeSeriesTable>,
}

impl FrequencyPanel {
    pub fn insert(&mut self, frequency: Frequency, kind: ValueKind, table: TimeSeriesTable) {
        self.tables.insert((frequency, kind), table);
    }

    pub fn get(&self, frequency: Frequency, kind: ValueKind) -> Option<&TimeSeriesTable> {
        self.tables.get(&(frequency, kind))
    }

    /// The (frequency, kind) table with all-missing rows and columns removed.
    pub fn slice(
        &self,
        frequency: Frequency,
        kind: ValueKind,
    ) -> Result<TimeSeriesTable, TransformError> {
        self.get(frequency, kind)
            .map(|t| t.drop_empty().with_frequency(frequency))
            .ok_or(TransformError::MissingSlice { frequency, kind })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Frequency, ValueKind), &TimeSeriesTable)> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Build the full panel (all frequencies, levels and returns) from raw prices.
pub fn transform(prices: &TimeSeriesTable) -> Result<FrequencyPanel, TransformError> {
    if prices.is_empty() {
        return Err(TransformError::EmptyInput);
    }

    let daily = to_business_days(prices)?;
    let mut panel = FrequencyPanel::default();

    for frequency in Frequency::ALL {
        let levels = resample_last(&daily, frequency)?;
        let returns = pct_change(&levels)?;
        tracing::debug!(
            frequency = %frequency,
            periods = levels.len(),
            "resampled price levels"
        );
        panel.insert(frequency, ValueKind::Level, levels);
        panel.insert(frequency, ValueKind::Return, returns);
    }

    Ok(panel)
}

/// Regrid onto every business day between the first and last observation,
/// forward-filling gaps. Leading gaps stay missing.
pub fn to_business_days(prices: &TimeSeriesTable) -> Result<TimeSeriesTable, TransformError> {
    let (Some(&first), Some(&last)) = (prices.dates().first(), prices.dates().last()) else {
        return Err(TransformError::EmptyInput);
    };

    let start = Frequency::BusinessDay.period_end(first);
    let end = Frequency::BusinessDay.period_end(last);
    let mut grid = Vec::new();
    let mut day = start;
    while day <= end {
        if !is_weekend(day) {
            grid.push(day);
        }
        day += Duration::days(1);
    }

    let table = group_last(prices, &grid, Frequency::BusinessDay)?;
    Ok(forward_fill(&table)?.with_frequency(Frequency::BusinessDay))
}

/// Last value per period of `frequency`, labelled by period end.
///
/// `daily` must be on a business-day grid. The final period is dropped when
/// its label is not the last date of `daily` (the period is still open).
pub fn resample_last(
    daily: &TimeSeriesTable,
    frequency: Frequency,
) -> Result<TimeSeriesTable, TransformError> {
    let Some(&last) = daily.dates().last() else {
        return Err(TransformError::EmptyInput);
    };

    let mut labels: Vec<NaiveDate> = daily
        .dates()
        .iter()
        .map(|d| frequency.period_end(*d))
        .collect();
    labels.dedup();
    if labels.last().is_some_and(|&label| label != last) {
        labels.pop();
    }

    Ok(group_last(daily, &labels, frequency)?.with_frequency(frequency))
}

/// Period-over-period percentage change; the first row has no return and is dropped.
///
/// A change from a zero level is not finite and is stored as missing.
pub fn pct_change(levels: &TimeSeriesTable) -> Result<TimeSeriesTable, TableError> {
    let n = levels.len();
    let dates: Vec<NaiveDate> = levels.dates().iter().skip(1).copied().collect();
    let values = (0..levels.columns().len())
        .map(|c| {
            let col = levels.column_at(c);
            (1..n)
                .map(|i| {
                    let r = col[i] / col[i - 1] - 1.0;
                    if r.is_finite() {
                        r
                    } else {
                        f64::NAN
                    }
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    let table = TimeSeriesTable::new(dates, levels.columns().to_vec(), values)?;
    Ok(match levels.frequency() {
        Some(f) => table.with_frequency(f),
        None => table,
    })
}

/// Bucket rows of `source` under `labels` by period end, keeping the last
/// non-missing value of each column within each bucket.
fn group_last(
    source: &TimeSeriesTable,
    labels: &[NaiveDate],
    frequency: Frequency,
) -> Result<TimeSeriesTable, TableError> {
    let index: BTreeMap<NaiveDate, usize> =
        labels.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut values = vec![vec![f64::NAN; labels.len()]; source.columns().len()];
    for (row, date) in source.dates().iter().enumerate() {
        let Some(&slot) = index.get(&frequency.period_end(*date)) else {
            continue;
        };
        for (c, column) in values.iter_mut().enumerate() {
            let v = source.value(row, c);
            if !v.is_nan() {
                column[slot] = v;
            }
        }
    }

    TimeSeriesTable::new(labels.to_vec(), source.columns().to_vec(), values)
}

fn forward_fill(table: &TimeSeriesTable) -> Result<TimeSeriesTable, TableError> {
    let values = (0..table.columns().len())
        .map(|c| {
            let mut last = f64::NAN;
            table
                .column_at(c)
                .iter()
                .map(|&v| {
                    if !v.is_nan() {
                        last = v;
                    }
                    last
                })
                .collect::<Vec<f64>>()
        })
        .collect();
    TimeSeriesTable::new(table.dates().to_vec(), table.columns().to_vec(), values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Weekdays from 2024-01-01 (Mon) to 2024-03-28 (Thu), one price per day.
    fn prices() -> TimeSeriesTable {
        let mut dates = Vec::new();
        let mut day = d("2024-01-01");
        while day <= d("2024-03-28") {
            if !is_weekend(day) {
                dates.push(day);
            }
            day += Duration::days(1);
        }
        let a: Vec<f64> = (0..dates.len()).map(|i| 100.0 + i as f64).collect();
        let b: Vec<f64> = (0..dates.len())
            .map(|i| if i < 5 { f64::NAN } else { 50.0 + i as f64 })
            .collect();
        TimeSeriesTable::from_columns(dates, vec![("A".into(), a), ("B".into(), b)]).unwrap()
    }

    #[test]
    fn business_days_fill_gaps_forward() {
        let t = TimeSeriesTable::from_columns(
            vec![d("2024-01-05"), d("2024-01-09")],
            vec![("A".into(), vec![1.0, 2.0])],
        )
        .unwrap();
        let daily = to_business_days(&t).unwrap();
        assert_eq!(daily.dates(), &[d("2024-01-05"), d("2024-01-08"), d("2024-01-09")]);
        assert_eq!(daily.column("A").unwrap(), &[1.0, 1.0, 2.0]);
    }

    #[test]
    fn weekend_observation_folds_into_friday() {
        let t = TimeSeriesTable::from_columns(
            vec![d("2024-01-05"), d("2024-01-06"), d("2024-01-08")],
            vec![("A".into(), vec![1.0, 1.5, 2.0])],
        )
        .unwrap();
        let daily = to_business_days(&t).unwrap();
        assert_eq!(daily.column("A").unwrap(), &[1.5, 2.0]);
    }

    #[test]
    fn leading_gaps_are_not_filled() {
        let daily = to_business_days(&prices()).unwrap();
        let b = daily.column("B").unwrap();
        assert!(b[..5].iter().all(|v| v.is_nan()));
        assert!(!b[5].is_nan());
    }

    #[test]
    fn incomplete_month_is_dropped() {
        // Data ends Thursday 2024-03-28; the March label is Friday 2024-03-29.
        let daily = to_business_days(&prices()).unwrap();
        let monthly = resample_last(&daily, Frequency::BusinessMonthEnd).unwrap();
        assert_eq!(monthly.dates(), &[d("2024-01-31"), d("2024-02-29")]);
        let a = monthly.column("A").unwrap();
        // Jan has 23 weekdays, Feb 21
        assert_eq!(a, &[122.0, 143.0]);
    }

    #[test]
    fn level_and_return_lengths_differ_by_one() {
        let panel = transform(&prices()).unwrap();
        for f in Frequency::ALL {
            let level = panel.get(f, ValueKind::Level).unwrap();
            let ret = panel.get(f, ValueKind::Return).unwrap();
            if level.is_empty() {
                assert!(ret.is_empty());
                continue;
            }
            assert_eq!(level.len(), ret.len() + 1, "frequency {f}");
            assert_eq!(level.columns(), ret.columns());
        }
    }

    #[test]
    fn returns_are_percentage_changes() {
        let panel = transform(&prices()).unwrap();
        let weekly = panel.slice(Frequency::WeeklyFriday, ValueKind::Return).unwrap();
        let levels = panel.get(Frequency::WeeklyFriday, ValueKind::Level).unwrap();
        let la = levels.column("A").unwrap();
        let ra = weekly.column("A").unwrap();
        assert!((ra[0] - (la[1] / la[0] - 1.0)).abs() < 1e-12);
        assert_eq!(weekly.frequency(), Some(Frequency::WeeklyFriday));
    }

    #[test]
    fn change_from_zero_level_is_missing() {
        let levels = TimeSeriesTable::from_columns(
            vec![d("2024-01-05"), d("2024-01-08"), d("2024-01-09")],
            vec![("A".into(), vec![0.0, 2.0, 3.0]), ("B".into(), vec![0.0, 0.0, 1.0])],
        )
        .unwrap();
        let returns = pct_change(&levels).unwrap();
        let a = returns.column("A").unwrap();
        assert!(a[0].is_nan());
        assert!((a[1] - 0.5).abs() < 1e-12);
        assert!(returns.column("B").unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn yearly_slice_of_short_history_is_empty() {
        let panel = transform(&prices()).unwrap();
        let yearly = panel.slice(Frequency::BusinessYearEnd, ValueKind::Return).unwrap();
        assert!(yearly.is_empty());
    }

    #[test]
    fn empty_input_is_rejected() {
        let t = TimeSeriesTable::new(vec![], vec![], vec![]).unwrap();
        assert!(matches!(transform(&t), Err(TransformError::EmptyInput)));
    }
}
