//! Walk-forward validation — expanding-window one-step-ahead forecasts.
//!
//! For a table of N rows and `steps` validation steps, every row
//! `count ∈ [N - steps, N)` is forecast from rows `[0, count)` only and then
//! compared against its actual value. The training window grows by exactly
//! one row per step, so test targets never overlap and no forecast ever sees
//! its own target or anything after it.
//!
//! Series are independent: each column walks forward on its own (in parallel
//! across columns), using that column's non-missing observations.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use indexcast_core::data::{Series, TimeSeriesTable};
use indexcast_core::forecast::{ForecastError, ForecastProvider};

use crate::summary::{summarize, ValidationSummary};

// ─── Result types ────────────────────────────────────────────────────

/// One row of a series' validation record.
///
/// `actual` is present wherever the input had a value; the forecast fields
/// are present only on validation rows whose forecast succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationPoint {
    pub date: NaiveDate,
    pub actual: Option<f64>,
    pub forecast: Option<f64>,
    pub ci_lower: Option<f64>,
    pub ci_upper: Option<f64>,
}

impl ValidationPoint {
    /// Both actual and forecast are present.
    pub fn is_complete(&self) -> bool {
        self.actual.is_some() && self.forecast.is_some()
    }
}

/// Validation record of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesValidation {
    pub name: String,
    /// One point per table row, in date order.
    pub points: Vec<ValidationPoint>,
    /// Validation steps whose forecast was unavailable.
    pub failed_steps: usize,
}

impl SeriesValidation {
    /// Points that carry a forecast.
    pub fn forecast_points(&self) -> impl Iterator<Item = &ValidationPoint> {
        self.points.iter().filter(|p| p.forecast.is_some())
    }
}

/// Date-indexed walk-forward result with per-series
/// {actual, forecast, ci_lower, ci_upper} columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationTable {
    pub dates: Vec<NaiveDate>,
    /// First forecast date, `None` when no validation was performed.
    pub validation_start: Option<NaiveDate>,
    pub series: Vec<SeriesValidation>,
}

impl ValidationTable {
    pub fn get(&self, name: &str) -> Option<&SeriesValidation> {
        self.series.iter().find(|s| s.name == name)
    }

    /// Rows from `validation_start` onwards.
    pub fn validation_rows(&self) -> usize {
        match self.validation_start {
            Some(start) => self.dates.iter().filter(|d| **d >= start).count(),
            None => 0,
        }
    }
}

/// Walk-forward output: the full result table and its summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub table: ValidationTable,
    pub summary: ValidationSummary,
}

// ─── Window ──────────────────────────────────────────────────────────

/// Row indices that get an out-of-sample forecast: `[N - steps, N)`,
/// clamped to the table.
pub fn validation_window(rows: usize, steps: usize) -> Range<usize> {
    rows.saturating_sub(steps)..rows
}

// ─── Orchestration ───────────────────────────────────────────────────

/// Run walk-forward validation of `provider` over the last `steps` rows.
///
/// `steps = 0` produces a table of actuals only and a summary with no
/// defined metrics.
pub fn validate(
    table: &TimeSeriesTable,
    steps: usize,
    provider: &dyn ForecastProvider,
) -> WalkForwardResult {
    let window = validation_window(table.len(), steps);
    let validation_start = table.dates().get(window.start).copied().filter(|_| !window.is_empty());

    tracing::debug!(
        provider = %provider.name(),
        rows = table.len(),
        steps = window.len(),
        "walk-forward validation"
    );

    let series: Vec<SeriesValidation> = (0..table.columns().len())
        .into_par_iter()
        .map(|c| validate_column(table, c, window.clone(), provider))
        .collect();

    let table = ValidationTable {
        dates: table.dates().to_vec(),
        validation_start,
        series,
    };
    let summary = summarize(&table);
    WalkForwardResult { table, summary }
}

fn validate_column(
    table: &TimeSeriesTable,
    column: usize,
    window: Range<usize>,
    provider: &dyn ForecastProvider,
) -> SeriesValidation {
    let name = &table.columns()[column];
    let dates = table.dates();
    let values = table.column_at(column);

    let mut points: Vec<ValidationPoint> = dates
        .iter()
        .zip(values)
        .map(|(date, v)| ValidationPoint {
            date: *date,
            actual: Some(*v).filter(|v| !v.is_nan()),
            forecast: None,
            ci_lower: None,
            ci_upper: None,
        })
        .collect();

    let mut failed_steps = 0;
    let mut first_error: Option<ForecastError> = None;
    for count in window {
        let train = Series::from_slices(name, &dates[..count], &values[..count]);
        match provider.forecast_series(&train, table.frequency(), 1) {
            Ok(f) => {
                let point = &mut points[count];
                point.forecast = Some(f.forecast);
                point.ci_lower = Some(f.ci_lower);
                point.ci_upper = Some(f.ci_upper);
            }
            Err(e) => {
                failed_steps += 1;
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        tracing::warn!(
            provider = %provider.name(),
            series = %name,
            failed_steps,
            error = %e,
            "forecast unavailable for some validation steps"
        );
    }

    SeriesValidation {
        name: name.clone(),
        points,
        failed_steps,
    }
}
