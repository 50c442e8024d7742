//! Cumulative and annualised returns over standard look-back periods.

use chrono::{Datelike, Months, NaiveDate};

use crate::data::TimeSeriesTable;

/// Cumulative returns per look-back label (`YTD`, `1M`, `3M`, `6M`, `1Y`,
/// `1Y (ann)`, …) for every column.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSummary {
    pub as_of: NaiveDate,
    pub columns: Vec<String>,
    /// `(label, one value per column)` in display order.
    pub rows: Vec<(String, Vec<f64>)>,
}

impl ReturnSummary {
    pub fn row(&self, label: &str) -> Option<&[f64]> {
        self.rows
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_slice())
    }
}

/// Returns from each reference date to the last date of `levels`.
///
/// Reference dates are the table dates nearest to the calendar targets.
/// `1M`/`3M` need more than a quarter of history, `6M` more than half a
/// year, and `nY` at least `n` whole years (Act/365). Returns `None` for an
/// empty table.
pub fn return_summary(levels: &TimeSeriesTable) -> Option<ReturnSummary> {
    let dates = levels.dates();
    let (&oldest, &current) = (dates.first()?, dates.last()?);
    let max_years = (current - oldest).num_days() as f64 / 365.0;

    let mut terms: Vec<(String, NaiveDate)> = Vec::new();
    if let Some(jan1) = NaiveDate::from_ymd_opt(current.year(), 1, 1) {
        terms.push(("YTD".into(), jan1));
    }
    if max_years > 0.25 {
        for months in [1, 3] {
            if let Some(target) = current.checked_sub_months(Months::new(months)) {
                terms.push((format!("{months}M"), target));
            }
        }
    }
    if max_years > 0.5 {
        if let Some(target) = current.checked_sub_months(Months::new(6)) {
            terms.push(("6M".into(), target));
        }
    }
    for years in 1..=(max_years as u32) {
        if let Some(target) = current.checked_sub_months(Months::new(12 * years)) {
            terms.push((format!("{years}Y"), target));
        }
    }

    let last_row = dates.len() - 1;
    let mut rows = Vec::new();
    for (label, target) in terms {
        let reference = nearest_row(dates, target);
        let cumulative: Vec<f64> = (0..levels.columns().len())
            .map(|c| levels.value(last_row, c) / levels.value(reference, c) - 1.0)
            .collect();

        let years = label
            .strip_suffix('Y')
            .and_then(|n| n.parse::<u32>().ok());
        let annualised = years.map(|n| {
            cumulative
                .iter()
                .map(|r| (1.0 + r).powf(1.0 / n as f64) - 1.0)
                .collect::<Vec<f64>>()
        });

        rows.push((label.clone(), cumulative));
        if let Some(ann) = annualised {
            rows.push((format!("{label} (ann)"), ann));
        }
    }

    Some(ReturnSummary {
        as_of: current,
        columns: levels.columns().to_vec(),
        rows,
    })
}

/// Index of the date closest to `target`; earlier dates win ties.
fn nearest_row(dates: &[NaiveDate], target: NaiveDate) -> usize {
    dates
        .iter()
        .enumerate()
        .min_by_key(|(_, d)| (**d - target).num_days().abs())
        .map_or(0, |(i, _)| i)
}
