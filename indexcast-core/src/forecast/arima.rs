//! ARIMA(p, d, q) forecasts.
//!
//! The series is differenced `d` times and an ARMA(p, q) is fitted to the
//! result by conditional sum of squares. A mean term is estimated only when
//! `d = 0`. The minimiser starts from Hannan–Rissanen regression estimates
//! and is confined to stationary, invertible parameter values. Forecast
//! intervals use the psi-weights of the integrated model under normal errors.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    check_horizon, require_observations, Forecast, ForecastError, ForecastProvider,
    SeriesForecast, DEFAULT_ALPHA,
};
use crate::data::{Frequency, Series};
use crate::fit::{
    integrate_ar, is_invertible, is_stationary, ordinary_least_squares, psi_weights, NelderMead,
};
use crate::stats::sample::{mean, standard_normal_quantile};

/// Objective value for parameters outside the admissible region.
const INFEASIBLE: f64 = 1e300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl From<(usize, usize, usize)> for ArimaOrder {
    fn from((p, d, q): (usize, usize, usize)) -> Self {
        Self { p, d, q }
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 1, d: 0, q: 0 }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.p, self.d, self.q)
    }
}

/// Fitted ARMA parameters on the differenced scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ArimaFit {
    pub order: ArimaOrder,
    pub mean: f64,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    /// Innovation variance estimate.
    pub sigma2: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Arima {
    pub order: ArimaOrder,
    pub alpha: f64,
    pub optimizer: NelderMead,
}

impl Arima {
    pub fn new(order: impl Into<ArimaOrder>) -> Self {
        Self {
            order: order.into(),
            alpha: DEFAULT_ALPHA,
            optimizer: NelderMead::default(),
        }
    }

    fn include_mean(&self) -> bool {
        self.order.d == 0
    }

    fn parameter_count(&self) -> usize {
        self.order.p + self.order.q + usize::from(self.include_mean())
    }

    /// Minimum series length for a fit with at least two residual degrees of freedom.
    pub fn required_observations(&self) -> usize {
        self.order.d + self.order.p + self.parameter_count() + 2
    }

    /// Fit the model to the non-missing values of `series`.
    pub fn fit(&self, series: &Series) -> Result<ArimaFit, ForecastError> {
        require_observations(series, self.required_observations())?;
        let ArimaOrder { p, d, .. } = self.order;
        let w = difference(&series.values, d);

        let start = self.start_values(&w);
        let css = |params: &[f64]| {
            let (mu, ar, ma) = self.unpack(params);
            if !is_stationary(ar) || !is_invertible(ma) {
                return INFEASIBLE;
            }
            conditional_residuals(&w, mu, ar, ma)
                .iter()
                .skip(p)
                .map(|e| e * e)
                .sum()
        };

        let minimum = self.optimizer.minimize(css, &start);
        if !minimum.converged {
            return Err(ForecastError::NotConverged {
                series: series.name.clone(),
                iterations: minimum.iterations,
            });
        }
        if !minimum.value.is_finite() || minimum.value >= INFEASIBLE {
            return Err(ForecastError::FitFailed {
                series: series.name.clone(),
                reason: "no admissible parameter values".into(),
            });
        }

        let (mu, ar, ma) = self.unpack(&minimum.point);
        let effective = w.len() - p;
        let dof = effective
            .checked_sub(self.parameter_count())
            .filter(|&n| n > 0)
            .unwrap_or(effective);
        let sigma2 = minimum.value / dof as f64;
        if !sigma2.is_finite() {
            return Err(ForecastError::FitFailed {
                series: series.name.clone(),
                reason: "non-finite innovation variance".into(),
            });
        }

        tracing::debug!(
            series = %series.name,
            order = %self.order,
            iterations = minimum.iterations,
            sigma2,
            "fitted arima"
        );

        Ok(ArimaFit {
            order: self.order,
            mean: mu,
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            sigma2,
            iterations: minimum.iterations,
        })
    }

    /// Split a parameter vector into (mean, AR, MA).
    fn unpack<'a>(&self, params: &'a [f64]) -> (f64, &'a [f64], &'a [f64]) {
        let (mu, rest) = if self.include_mean() {
            (params[0], &params[1..])
        } else {
            (0.0, params)
        };
        let (ar, ma) = rest.split_at(self.order.p);
        (mu, ar, ma)
    }

    /// Hannan–Rissanen start values, falling back to zero coefficients when
    /// the regressions are singular or land outside the admissible region.
    fn start_values(&self, w: &[f64]) -> Vec<f64> {
        let ArimaOrder { p, q, .. } = self.order;
        let mu = if self.include_mean() { mean(w) } else { 0.0 };
        let z: Vec<f64> = w.iter().map(|v| v - mu).collect();

        let (mut ar, mut ma) =
            hannan_rissanen(&z, p, q).unwrap_or_else(|| (vec![0.0; p], vec![0.0; q]));
        if !is_stationary(&ar) {
            ar = vec![0.0; p];
        }
        if !is_invertible(&ma) {
            ma = vec![0.0; q];
        }

        let mut start = Vec::with_capacity(self.parameter_count());
        if self.include_mean() {
            start.push(mu);
        }
        start.extend(ar);
        start.extend(ma);
        start
    }

    /// Forecast `horizon` steps past the end of `values` using a fitted model.
    pub fn predict(&self, fit: &ArimaFit, values: &[f64], horizon: usize) -> Forecast {
        let d = fit.order.d;
        let levels = difference_levels(values, d);
        let w = &levels[d];
        let residuals = conditional_residuals(w, fit.mean, &fit.ar, &fit.ma);

        let mut z: Vec<f64> = w.iter().map(|v| v - fit.mean).collect();
        let mut e = residuals;
        let n = z.len();
        for step in 0..horizon {
            let t = n + step;
            let mut next = 0.0;
            for (i, phi) in fit.ar.iter().enumerate() {
                next += phi * z[t - 1 - i];
            }
            for (j, theta) in fit.ma.iter().enumerate() {
                if let Some(past) = t.checked_sub(1 + j).and_then(|k| e.get(k)) {
                    next += theta * past;
                }
            }
            z.push(next);
            e.push(0.0);
        }

        // Integrate the differenced forecasts back to the original scale.
        let mut tails: Vec<f64> = levels[..d]
            .iter()
            .map(|l| l.last().copied().unwrap_or(0.0))
            .collect();
        let mut point = f64::NAN;
        for step in 0..horizon {
            let mut value = z[n + step] + fit.mean;
            for tail in tails.iter_mut().rev() {
                value += *tail;
                *tail = value;
            }
            point = value;
        }

        let psi = psi_weights(&integrate_ar(&fit.ar, d), &fit.ma, horizon);
        let variance = fit.sigma2 * psi.iter().map(|w| w * w).sum::<f64>();
        let half_width = standard_normal_quantile(1.0 - self.alpha / 2.0) * variance.sqrt();

        Forecast {
            forecast: point,
            ci_lower: point - half_width,
            ci_upper: point + half_width,
        }
    }
}

impl ForecastProvider for Arima {
    fn name(&self) -> String {
        let ArimaOrder { p, d, q } = self.order;
        format!("arima_{p}_{d}_{q}")
    }

    fn forecast_series(
        &self,
        series: &Series,
        _frequency: Option<Frequency>,
        horizon: usize,
    ) -> SeriesForecast {
        check_horizon(horizon)?;
        let fit = self.fit(series)?;
        let forecast = self.predict(&fit, &series.values, horizon);
        if !forecast.forecast.is_finite() {
            return Err(ForecastError::FitFailed {
                series: series.name.clone(),
                reason: "non-finite forecast".into(),
            });
        }
        Ok(forecast)
    }
}

/// Apply the first difference `d` times.
fn difference(values: &[f64], d: usize) -> Vec<f64> {
    (0..d).fold(values.to_vec(), |acc, _| {
        acc.windows(2).map(|w| w[1] - w[0]).collect()
    })
}

/// `[y, Δy, Δ²y, …, Δᵈy]`.
fn difference_levels(values: &[f64], d: usize) -> Vec<Vec<f64>> {
    let mut levels = vec![values.to_vec()];
    for k in 0..d {
        let next = difference(&levels[k], 1);
        levels.push(next);
    }
    levels
}

/// ARMA residuals with pre-sample values set to zero; the first `p` are zero.
fn conditional_residuals(w: &[f64], mu: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let z: Vec<f64> = w.iter().map(|v| v - mu).collect();
    let mut e = vec![0.0; z.len()];
    for t in p..z.len() {
        let mut fitted = 0.0;
        for (i, phi) in ar.iter().enumerate() {
            fitted += phi * z[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                fitted += theta * e[t - 1 - j];
            }
        }
        e[t] = z[t] - fitted;
    }
    e
}

/// Two-stage regression estimates of AR and MA coefficients for a demeaned series.
fn hannan_rissanen(z: &[f64], p: usize, q: usize) -> Option<(Vec<f64>, Vec<f64>)> {
    let n = z.len();
    if p == 0 && q == 0 {
        return Some((Vec::new(), Vec::new()));
    }

    // Stage 1: long autoregression to approximate the innovations.
    let long_order = (p + q + 1).max((n as f64).ln().ceil() as usize).min(n / 3);
    let innovations = if q > 0 {
        if long_order == 0 {
            return None;
        }
        let coef = regress_on_lags(z, &[(z, long_order)], long_order)?;
        let mut e = vec![0.0; n];
        for t in long_order..n {
            let fitted: f64 = (0..long_order).map(|i| coef[i] * z[t - 1 - i]).sum();
            e[t] = z[t] - fitted;
        }
        e
    } else {
        vec![0.0; n]
    };

    // Stage 2: regress on lagged values and lagged innovations.
    let start = if q > 0 { long_order + p.max(q) } else { p };
    let coef = regress_on_lags(z, &[(z, p), (innovations.as_slice(), q)], start)?;
    Some((coef[..p].to_vec(), coef[p..].to_vec()))
}

/// OLS of `target[t]` on `source[t-1..=t-lags]` for each `(source, lags)` block, `t >= start`.
fn regress_on_lags(target: &[f64], blocks: &[(&[f64], usize)], start: usize) -> Option<Vec<f64>> {
    let ncols: usize = blocks.iter().map(|(_, lags)| lags).sum();
    let rows = target.len().checked_sub(start)?;
    if ncols == 0 || rows <= ncols {
        return None;
    }

    let mut design = DMatrix::zeros(rows, ncols);
    let mut y = DVector::zeros(rows);
    for r in 0..rows {
        let t = start + r;
        y[r] = target[t];
        let mut col = 0;
        for (source, lags) in blocks {
            for i in 0..*lags {
                design[(r, col)] = source[t - 1 - i];
                col += 1;
            }
        }
    }

    ordinary_least_squares(&design, &y).map(|fit| fit.coefficients.iter().copied().collect())
}
