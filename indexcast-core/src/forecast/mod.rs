//! Forecast providers — pluggable one-step (or h-step) forecasting strategies.
//!
//! Every provider works on each series independently, using only that
//! series' non-missing observations. A failure on one series is reported as
//! an `Err` for that series and never aborts the rest of the table.

pub mod arima;
pub mod momentum;
pub mod quiet;
pub mod trend_seasonal;

pub use arima::{Arima, ArimaOrder};
pub use momentum::MomentumBenchmark;
pub use quiet::{quietly, QuietScope};
pub use trend_seasonal::TrendSeasonal;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{Frequency, Series, TimeSeriesTable};

/// Two-sided interval level used by all providers (95% intervals).
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Point forecast and two-sided confidence bounds for one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub forecast: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

impl Forecast {
    /// Go long when the forecast is strictly positive.
    pub fn invest(&self) -> bool {
        self.forecast > 0.0
    }
}

/// Why a provider could not produce a forecast for a series.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ForecastError {
    #[error("series '{series}' has {available} observations, needs at least {required}")]
    InsufficientData {
        series: String,
        available: usize,
        required: usize,
    },

    #[error("fit for series '{series}' did not converge within {iterations} iterations")]
    NotConverged { series: String, iterations: usize },

    #[error("fit for series '{series}' failed: {reason}")]
    FitFailed { series: String, reason: String },

    #[error("forecast horizon must be at least 1")]
    InvalidHorizon,
}

/// Per-series outcome: a forecast, or an explicit "unavailable" marker.
pub type SeriesForecast = Result<Forecast, ForecastError>;

/// Forecasts for every column of a table, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    pub columns: Vec<String>,
    pub results: Vec<SeriesForecast>,
}

impl ForecastTable {
    pub fn get(&self, column: &str) -> Option<&SeriesForecast> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.results[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SeriesForecast)> {
        self.columns.iter().map(String::as_str).zip(&self.results)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Presentation rows: `invest`, `forecast`, `ci_lower`, `ci_upper`.
    ///
    /// Unavailable series show `None` in every row.
    pub fn rows(&self) -> Vec<(&'static str, Vec<Option<f64>>)> {
        let pick = |f: fn(&Forecast) -> f64| -> Vec<Option<f64>> {
            self.results
                .iter()
                .map(|r| r.as_ref().ok().map(f))
                .collect()
        };
        vec![
            ("invest", pick(|f| if f.invest() { 1.0 } else { 0.0 })),
            ("forecast", pick(|f| f.forecast)),
            ("ci_lower", pick(|f| f.ci_lower)),
            ("ci_upper", pick(|f| f.ci_upper)),
        ]
    }
}

/// A forecasting strategy the walk-forward validator can drive.
///
/// # Invariants
/// - Only the observations passed in may influence the result (no look-ahead).
/// - Series are independent: the forecast for one column never depends on another.
/// - Deterministic for identical input.
pub trait ForecastProvider: Send + Sync {
    /// Strategy label used in logs, bundles and artifact file names.
    fn name(&self) -> String;

    /// Forecast `horizon` periods past the last observation of `series`.
    ///
    /// `frequency` is the sampling frequency of the source table when known.
    fn forecast_series(
        &self,
        series: &Series,
        frequency: Option<Frequency>,
        horizon: usize,
    ) -> SeriesForecast;

    /// Forecast every column of `table` independently.
    fn forecast(&self, table: &TimeSeriesTable, horizon: usize) -> ForecastTable {
        let results = (0..table.columns().len())
            .map(|c| {
                let series = table.series_at(c);
                let result = self.forecast_series(&series, table.frequency(), horizon);
                if let Err(e) = &result {
                    tracing::debug!(provider = %self.name(), error = %e, "series forecast unavailable");
                }
                result
            })
            .collect();
        ForecastTable {
            columns: table.columns().to_vec(),
            results,
        }
    }
}

pub(crate) fn check_horizon(horizon: usize) -> Result<(), ForecastError> {
    if horizon == 0 {
        return Err(ForecastError::InvalidHorizon);
    }
    Ok(())
}

pub(crate) fn require_observations(series: &Series, required: usize) -> Result<(), ForecastError> {
    if series.len() < required {
        return Err(ForecastError::InsufficientData {
            series: series.name.clone(),
            available: series.len(),
            required,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct LastValue;

    impl ForecastProvider for LastValue {
        fn name(&self) -> String {
            "last_value".into()
        }

        fn forecast_series(
            &self,
            series: &Series,
            _frequency: Option<Frequency>,
            horizon: usize,
        ) -> SeriesForecast {
            check_horizon(horizon)?;
            require_observations(series, 1)?;
            let (_, last) = series.last().ok_or(ForecastError::InvalidHorizon)?;
            Ok(Forecast {
                forecast: last,
                ci_lower: last - 1.0,
                ci_upper: last + 1.0,
            })
        }
    }

    fn table() -> TimeSeriesTable {
        let dates: Vec<NaiveDate> = (1..=3)
            .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
            .collect();
        TimeSeriesTable::from_columns(
            dates,
            vec![
                ("A".into(), vec![1.0, 2.0, -3.0]),
                ("B".into(), vec![f64::NAN; 3]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn invest_requires_strictly_positive_forecast() {
        let f = |v| Forecast {
            forecast: v,
            ci_lower: v,
            ci_upper: v,
        };
        assert!(f(0.1).invest());
        assert!(!f(0.0).invest());
        assert!(!f(-0.1).invest());
    }

    #[test]
    fn failing_series_does_not_abort_table() {
        let out = LastValue.forecast(&table(), 1);
        assert_eq!(out.len(), 2);
        assert_eq!(out.get("A").unwrap().as_ref().unwrap().forecast, -3.0);
        assert!(matches!(
            out.get("B").unwrap(),
            Err(ForecastError::InsufficientData { available: 0, .. })
        ));
    }

    #[test]
    fn presentation_rows_lead_with_invest() {
        let out = LastValue.forecast(&table(), 1);
        let rows = out.rows();
        let labels: Vec<&str> = rows.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["invest", "forecast", "ci_lower", "ci_upper"]);
        assert_eq!(rows[0].1, vec![Some(0.0), None]);
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let out = LastValue.forecast(&table(), 0);
        assert!(out.results.iter().all(|r| r == &Err(ForecastError::InvalidHorizon)));
    }
}
