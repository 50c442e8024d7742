//! Additive trend + seasonality model.
//!
//! `y(t) = trend(t) + yearly(t) [+ weekly(t)]` where the trend is piecewise
//! linear with hinges at evenly spaced changepoints over the early part of
//! the history, and each seasonal component is a truncated Fourier series.
//! Time is scaled to [0, 1] over the history and values by their largest
//! magnitude. Coefficients come from a ridge-penalised least-squares fit:
//! the base level and slope are free, changepoint deltas are shrunk hard
//! and seasonal terms lightly.

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

use super::{
    check_horizon, quietly, require_observations, Forecast, ForecastError, ForecastProvider,
    SeriesForecast, DEFAULT_ALPHA,
};
use crate::data::{Frequency, Series};
use crate::fit::{ridge_least_squares, LinearFit};
use crate::stats::sample::standard_normal_quantile;

const YEAR_DAYS: f64 = 365.25;
const WEEK_DAYS: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSeasonal {
    /// Upper bound on trend changepoints.
    pub changepoints: usize,
    /// Share of the history in which changepoints may fall.
    pub changepoint_range: f64,
    pub yearly_order: usize,
    pub weekly_order: usize,
    /// Ridge penalty on changepoint deltas.
    pub changepoint_penalty: f64,
    /// Ridge penalty on Fourier coefficients.
    pub seasonality_penalty: f64,
    pub alpha: f64,
    /// Let fitter diagnostics through instead of silencing them.
    pub verbose: bool,
}

impl Default for TrendSeasonal {
    fn default() -> Self {
        Self {
            changepoints: 25,
            changepoint_range: 0.8,
            yearly_order: 10,
            weekly_order: 3,
            changepoint_penalty: 10.0,
            seasonality_penalty: 0.01,
            alpha: DEFAULT_ALPHA,
            verbose: false,
        }
    }
}

/// Time axis and regressor layout shared by fitting and prediction.
#[derive(Debug, Clone)]
struct DesignLayout {
    origin: NaiveDate,
    span_days: f64,
    /// Changepoint locations on the scaled time axis.
    changepoints: Vec<f64>,
    yearly_order: usize,
    /// Weekly Fourier order, zero when weekly seasonality is off.
    weekly_order: usize,
}

impl DesignLayout {
    fn row(&self, date: NaiveDate) -> Vec<f64> {
        let t = (date - self.origin).num_days() as f64 / self.span_days;
        let mut row = vec![1.0, t];
        row.extend(self.changepoints.iter().map(|&s| (t - s).max(0.0)));
        let absolute_days = days_since_epoch(date);
        row.extend(fourier_terms(absolute_days, YEAR_DAYS, self.yearly_order));
        row.extend(fourier_terms(absolute_days, WEEK_DAYS, self.weekly_order));
        row
    }

    fn penalties(&self, changepoint: f64, seasonality: f64) -> Vec<f64> {
        let seasonal = 2 * (self.yearly_order + self.weekly_order);
        let mut penalties = vec![0.0, 0.0];
        penalties.extend(std::iter::repeat(changepoint).take(self.changepoints.len()));
        penalties.extend(std::iter::repeat(seasonality).take(seasonal));
        penalties
    }
}

/// A fitted model, able to predict at any date.
#[derive(Debug, Clone)]
pub struct TrendSeasonalFit {
    layout: DesignLayout,
    y_scale: f64,
    linear: LinearFit,
    /// Residual variance on the scaled axis.
    sigma2: f64,
}

impl TrendSeasonalFit {
    /// Point prediction and interval at `date`.
    pub fn predict(&self, date: NaiveDate, alpha: f64) -> Forecast {
        let row = DVector::from_vec(self.layout.row(date));
        let mean = row.dot(&self.linear.coefficients);
        let spread = (self.sigma2 * (1.0 + self.linear.leverage(&row))).sqrt();
        let half_width = standard_normal_quantile(1.0 - alpha / 2.0) * spread;
        Forecast {
            forecast: mean * self.y_scale,
            ci_lower: (mean - half_width) * self.y_scale,
            ci_upper: (mean + half_width) * self.y_scale,
        }
    }

    pub fn changepoint_count(&self) -> usize {
        self.layout.changepoints.len()
    }

    pub fn has_weekly(&self) -> bool {
        self.layout.weekly_order > 0
    }
}

impl TrendSeasonal {
    /// Fit the model to `series`. Emits `tracing` debug diagnostics.
    pub fn fit(&self, series: &Series) -> Result<TrendSeasonalFit, ForecastError> {
        require_observations(series, 3)?;
        let fail = |reason: &str| ForecastError::FitFailed {
            series: series.name.clone(),
            reason: reason.to_string(),
        };

        let (Some(&origin), Some(&last)) = (series.dates.first(), series.dates.last()) else {
            return Err(fail("empty date sequence"));
        };
        let span_days = (last - origin).num_days() as f64;
        if span_days <= 0.0 {
            return Err(fail("dates do not span any time"));
        }
        if series.dates.windows(2).any(|w| w[1] <= w[0]) {
            return Err(fail("dates are not strictly increasing"));
        }

        let y_scale = series
            .values
            .iter()
            .fold(0.0f64, |m, v| m.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

        let n = series.len();
        let t: Vec<f64> = series
            .dates
            .iter()
            .map(|d| (*d - origin).num_days() as f64 / span_days)
            .collect();
        let changepoints = self.place_changepoints(&t);

        let min_gap = series
            .dates
            .windows(2)
            .map(|w| (w[1] - w[0]).num_days())
            .min()
            .unwrap_or(i64::MAX);
        let weekly = self.weekly_order > 0 && min_gap < 7 && span_days >= 2.0 * WEEK_DAYS;

        let layout = DesignLayout {
            origin,
            span_days,
            changepoints,
            yearly_order: self.yearly_order,
            weekly_order: if weekly { self.weekly_order } else { 0 },
        };

        let rows: Vec<Vec<f64>> = series.dates.iter().map(|d| layout.row(*d)).collect();
        let ncols = rows[0].len();
        let design = DMatrix::from_fn(n, ncols, |r, c| rows[r][c]);
        let target = DVector::from_iterator(n, series.values.iter().map(|v| v / y_scale));
        let penalties = layout.penalties(self.changepoint_penalty, self.seasonality_penalty);

        tracing::debug!(
            series = %series.name,
            observations = n,
            changepoints = layout.changepoints.len(),
            weekly,
            columns = ncols,
            "fitting trend-seasonal model"
        );

        let linear = ridge_least_squares(&design, &target, &penalties)
            .ok_or_else(|| fail("singular design"))?;
        let sigma2 = linear.rss() / (n.saturating_sub(2).max(1)) as f64;
        if !sigma2.is_finite() {
            return Err(fail("non-finite residual variance"));
        }
        tracing::debug!(series = %series.name, sigma2, "trend-seasonal fit complete");

        Ok(TrendSeasonalFit {
            layout,
            y_scale,
            linear,
            sigma2,
        })
    }

    /// Evenly spaced changepoints over the first `changepoint_range` of the
    /// observations, excluding the first observation.
    fn place_changepoints(&self, t: &[f64]) -> Vec<f64> {
        let history = (t.len() as f64 * self.changepoint_range).floor() as usize;
        let count = self.changepoints.min(history.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }
        (1..=count)
            .map(|i| {
                let pos = (i as f64 * (history - 1) as f64 / count as f64).round() as usize;
                t[pos]
            })
            .collect()
    }
}

impl ForecastProvider for TrendSeasonal {
    fn name(&self) -> String {
        "trend_seasonal".into()
    }

    fn forecast_series(
        &self,
        series: &Series,
        frequency: Option<Frequency>,
        horizon: usize,
    ) -> SeriesForecast {
        check_horizon(horizon)?;
        let fit = if self.verbose {
            self.fit(series)?
        } else {
            quietly(|| self.fit(series))?
        };

        let frequency = frequency
            .or_else(|| Frequency::infer(&series.dates))
            .ok_or_else(|| ForecastError::InsufficientData {
                series: series.name.clone(),
                available: series.len(),
                required: 2,
            })?;
        let (last, _) = series.last().ok_or_else(|| ForecastError::InsufficientData {
            series: series.name.clone(),
            available: 0,
            required: 2,
        })?;

        let forecast = fit.predict(frequency.advance(last, horizon), self.alpha);
        if !forecast.forecast.is_finite() {
            return Err(ForecastError::FitFailed {
                series: series.name.clone(),
                reason: "non-finite forecast".into(),
            });
        }
        Ok(forecast)
    }
}

fn days_since_epoch(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days() as f64
}

/// `[sin(2πkt/P), cos(2πkt/P)]` for k = 1..=order.
fn fourier_terms(days: f64, period: f64, order: usize) -> Vec<f64> {
    (1..=order)
        .flat_map(|k| {
            let x = 2.0 * PI * k as f64 * days / period;
            [x.sin(), x.cos()]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn month_ends(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2015, 1, 30).unwrap();
        let mut dates = vec![Frequency::BusinessMonthEnd.period_end(start)];
        while dates.len() < n {
            let next = Frequency::BusinessMonthEnd.next_period_end(*dates.last().unwrap());
            dates.push(next);
        }
        dates
    }

    #[test]
    fn linear_trend_is_extrapolated() {
        let dates = month_ends(48);
        let values: Vec<f64> = (0..48).map(|i| 10.0 + 0.5 * i as f64).collect();
        let s = Series::from_slices("X", &dates, &values);
        let f = TrendSeasonal::default()
            .forecast_series(&s, Some(Frequency::BusinessMonthEnd), 1)
            .unwrap();
        assert!((f.forecast - 34.0).abs() < 1.5, "{f:?}");
        assert!(f.ci_lower <= f.forecast && f.forecast <= f.ci_upper);
    }

    #[test]
    fn yearly_cycle_is_captured() {
        let dates = month_ends(72);
        let values: Vec<f64> = dates
            .iter()
            .map(|d| (2.0 * PI * days_since_epoch(*d) / YEAR_DAYS).sin())
            .collect();
        let s = Series::from_slices("X", &dates, &values);
        let next = Frequency::BusinessMonthEnd.advance(*dates.last().unwrap(), 1);
        let expected = (2.0 * PI * days_since_epoch(next) / YEAR_DAYS).sin();
        let f = TrendSeasonal::default()
            .forecast_series(&s, Some(Frequency::BusinessMonthEnd), 1)
            .unwrap();
        assert!((f.forecast - expected).abs() < 0.25, "{f:?} vs {expected}");
    }

    #[test]
    fn frequency_is_inferred_when_untagged() {
        let dates = month_ends(24);
        let values: Vec<f64> = (0..24).map(|i| 1.0 + i as f64).collect();
        let s = Series::from_slices("X", &dates, &values);
        let p = TrendSeasonal::default();
        assert_eq!(
            p.forecast_series(&s, None, 1),
            p.forecast_series(&s, Some(Frequency::BusinessMonthEnd), 1)
        );
    }

    #[test]
    fn weekly_terms_only_for_sub_weekly_data() {
        let model = TrendSeasonal::default();
        let monthly = Series::from_slices("M", &month_ends(24), &[1.0; 24]);
        let fit = model.fit(&monthly).unwrap();
        assert!(!fit.has_weekly());
        // 24 points, first 80% is 19 rows: one changepoint per row after the first
        assert_eq!(fit.changepoint_count(), 18);

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let daily: Vec<NaiveDate> = (0..30).map(|i| start + Duration::days(i)).collect();
        let values: Vec<f64> = (0..30).map(|i| (i % 7) as f64).collect();
        let s = Series::from_slices("D", &daily, &values);
        let fit = model.fit(&s).unwrap();
        assert!(fit.has_weekly());
        assert_eq!(fit.changepoint_count(), 23);
    }

    #[test]
    fn changepoints_stay_in_early_history() {
        let model = TrendSeasonal::default();
        let t: Vec<f64> = (0..100).map(|i| i as f64 / 99.0).collect();
        let cps = model.place_changepoints(&t);
        assert_eq!(cps.len(), 25);
        assert!(cps.iter().all(|&c| c > 0.0 && c <= 0.8));
        assert!(cps.windows(2).all(|w| w[0] < w[1]));

        let short: Vec<f64> = (0..3).map(|i| i as f64 / 2.0).collect();
        assert!(model.place_changepoints(&short).len() <= 1);
    }

    #[test]
    fn too_few_points_is_unavailable() {
        let s = Series::from_slices("X", &month_ends(2), &[1.0, 2.0]);
        assert!(matches!(
            TrendSeasonal::default().forecast_series(&s, None, 1),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn fourier_terms_alternate_sin_cos() {
        let terms = fourier_terms(0.0, YEAR_DAYS, 2);
        assert_eq!(terms, vec![0.0, 1.0, 0.0, 1.0]);
    }
}
