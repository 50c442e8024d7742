//! Normality, autocorrelation and unit-root tests used by `describe`.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use super::sample::{autocorrelation, population_shape};
use crate::fit::ordinary_least_squares;

/// Statistic and p-value of a chi-squared test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Deterministic terms in the ADF regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdfRegression {
    /// Constant only.
    Constant,
    /// Constant and linear trend.
    ConstantTrend,
}

/// Augmented Dickey–Fuller test outcome at the 5% level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdfResult {
    pub statistic: f64,
    pub critical_value: f64,
    pub lags: usize,
    pub nobs: usize,
}

impl AdfResult {
    /// Whether the unit-root null is rejected at 5%.
    pub fn is_stationary(&self) -> bool {
        self.statistic < self.critical_value
    }
}

/// Jarque–Bera normality test. `None` with fewer than 3 observations.
pub fn jarque_bera(values: &[f64]) -> Option<TestResult> {
    if values.len() < 3 {
        return None;
    }
    let n = values.len() as f64;
    let (skew, kurt) = population_shape(values);
    let statistic = n / 6.0 * (skew * skew + kurt * kurt / 4.0);
    Some(TestResult {
        statistic,
        p_value: chi_squared_sf(statistic, 2.0)?,
    })
}

/// Ljung–Box portmanteau test over lags `1..=lags`.
pub fn ljung_box(values: &[f64], lags: usize) -> Option<TestResult> {
    let n = values.len();
    if lags == 0 || n <= lags + 1 {
        return None;
    }
    let acf = autocorrelation(values, lags);
    let nf = n as f64;
    let statistic = nf
        * (nf + 2.0)
        * (1..=lags)
            .map(|k| acf[k] * acf[k] / (nf - k as f64))
            .sum::<f64>();
    Some(TestResult {
        statistic,
        p_value: chi_squared_sf(statistic, lags as f64)?,
    })
}

/// Augmented Dickey–Fuller test with AIC lag selection.
///
/// The maximum lag is `ceil(12 (n/100)^¼)`, capped so the regression keeps
/// positive degrees of freedom. The critical value follows MacKinnon's
/// response-surface approximation for the sample size actually used.
pub fn adf(values: &[f64], regression: AdfRegression) -> Option<AdfResult> {
    let n = values.len();
    let trend_terms = match regression {
        AdfRegression::Constant => 1,
        AdfRegression::ConstantTrend => 2,
    };
    if n < 4 + trend_terms * 2 {
        return None;
    }

    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let max_lag = schwert.min((n / 2).saturating_sub(trend_terms + 1));

    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let Some(fit) = adf_regression(values, &diffs, lag, max_lag, trend_terms) else {
            continue;
        };
        let nobs = fit.1 as f64;
        let k = (lag + trend_terms + 1) as f64;
        let rss = fit.0.rss();
        if rss <= 0.0 {
            continue;
        }
        let aic = nobs * (rss / nobs).ln() + 2.0 * k;
        if best.map_or(true, |(_, b)| aic < b) {
            best = Some((lag, aic));
        }
    }
    let (lag, _) = best?;

    // Refit on the longest sample the chosen lag allows.
    let (fit, nobs) = adf_regression(values, &diffs, lag, lag, trend_terms)?;
    let k = lag + trend_terms + 1;
    if nobs <= k {
        return None;
    }
    let sigma2 = fit.rss() / (nobs - k) as f64;
    let se = (sigma2 * fit.normal_inverse[(0, 0)]).sqrt();
    if !(se > 0.0) {
        return None;
    }

    Some(AdfResult {
        statistic: fit.coefficients[0] / se,
        critical_value: mackinnon_critical_5pct(regression, nobs),
        lags: lag,
        nobs,
    })
}

/// Regress Δy_t on y_{t-1}, lagged differences and deterministic terms,
/// using observations from `start_lag` onwards so lag choices share a sample.
fn adf_regression(
    levels: &[f64],
    diffs: &[f64],
    lag: usize,
    start_lag: usize,
    trend_terms: usize,
) -> Option<(crate::fit::LinearFit, usize)> {
    let rows: Vec<usize> = (start_lag..diffs.len()).collect();
    let ncols = 1 + lag + trend_terms;
    if rows.len() <= ncols {
        return None;
    }

    let mut design = DMatrix::zeros(rows.len(), ncols);
    let mut target = DVector::zeros(rows.len());
    for (r, &t) in rows.iter().enumerate() {
        target[r] = diffs[t];
        design[(r, 0)] = levels[t];
        for i in 1..=lag {
            design[(r, i)] = diffs[t - i];
        }
        design[(r, 1 + lag)] = 1.0;
        if trend_terms == 2 {
            design[(r, 2 + lag)] = (t + 1) as f64;
        }
    }

    ordinary_least_squares(&design, &target).map(|fit| (fit, rows.len()))
}

/// MacKinnon (2010) 5% critical values for a single series.
fn mackinnon_critical_5pct(regression: AdfRegression, nobs: usize) -> f64 {
    let b = match regression {
        AdfRegression::Constant => [-2.86154, -2.8903, -4.234, -40.040],
        AdfRegression::ConstantTrend => [-3.41049, -4.3904, -9.036, -45.374],
    };
    let t = nobs as f64;
    b[0] + b[1] / t + b[2] / (t * t) + b[3] / (t * t * t)
}

fn chi_squared_sf(statistic: f64, dof: f64) -> Option<f64> {
    if !statistic.is_finite() {
        return None;
    }
    let chi = ChiSquared::new(dof).ok()?;
    Some(1.0 - chi.cdf(statistic))
}
