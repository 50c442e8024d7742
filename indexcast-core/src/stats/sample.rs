//! Sample moments, quantiles and autocorrelation.
//!
//! All functions take the non-missing observations of a single series.
//! Degenerate inputs (too short, zero variance) return `NaN` rather than
//! panicking, so callers can surface them as missing values.

use statrs::distribution::{ContinuousCDF, Normal};

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Biased central moments m2, m3, m4.
fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    let m = mean(values);
    let n = values.len() as f64;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &x in values {
        let d = x - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

/// Adjusted Fisher–Pearson skewness (G1).
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 3 {
        return f64::NAN;
    }
    let (m2, m3, _) = central_moments(values);
    if m2 <= 0.0 {
        return 0.0;
    }
    let g1 = m3 / m2.powf(1.5);
    (n * (n - 1.0)).sqrt() / (n - 2.0) * g1
}

/// Unbiased excess kurtosis (G2).
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 4 {
        return f64::NAN;
    }
    let (m2, _, m4) = central_moments(values);
    if m2 <= 0.0 {
        return 0.0;
    }
    let g2 = m4 / (m2 * m2) - 3.0;
    ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
}

/// Population skewness and excess kurtosis, as used by Jarque–Bera.
pub(crate) fn population_shape(values: &[f64]) -> (f64, f64) {
    let (m2, m3, m4) = central_moments(values);
    if m2 <= 0.0 {
        return (0.0, 0.0);
    }
    (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
}

/// Quantile with linear interpolation between order statistics.
///
/// `q` is clamped to [0, 1]. Returns `NaN` for an empty input.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

/// Several quantiles with a single sort.
pub fn quantiles(values: &[f64], qs: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    qs.iter().map(|&q| quantile_sorted(&sorted, q)).collect()
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Autocorrelation at lags 0..=max_lag (lag 0 is 1).
///
/// Lags that do not fit in the series are `NaN`.
pub fn autocorrelation(values: &[f64], max_lag: usize) -> Vec<f64> {
    let n = values.len();
    let mut acf = vec![f64::NAN; max_lag + 1];
    if n == 0 {
        return acf;
    }
    let m = mean(values);
    let denom: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    acf[0] = 1.0;
    for lag in 1..=max_lag.min(n.saturating_sub(1)) {
        if denom <= 0.0 {
            acf[lag] = 0.0;
            continue;
        }
        let num: f64 = (lag..n).map(|t| (values[t] - m) * (values[t - lag] - m)).sum();
        acf[lag] = num / denom;
    }
    acf
}

/// Inverse CDF of the standard normal distribution.
pub fn standard_normal_quantile(p: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_variance() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((mean(&xs) - 2.5).abs() < 1e-12);
        assert!((variance(&xs) - 5.0 / 3.0).abs() < 1e-12);
        assert!(variance(&[1.0]).is_nan());
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let xs = [4.0, 1.0, 3.0, 2.0];
        assert!((quantile(&xs, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile(&xs, 0.0) - 1.0).abs() < 1e-12);
        assert!((quantile(&xs, 1.0) - 4.0).abs() < 1e-12);
        // pos = 0.025 * 3 = 0.075
        assert!((quantile(&xs, 0.025) - 1.075).abs() < 1e-12);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn symmetric_sample_has_zero_skew() {
        let xs = [-2.0, -1.0, 0.0, 1.0, 2.0];
        assert!(skewness(&xs).abs() < 1e-12);
    }

    #[test]
    fn kurtosis_of_uniform_grid_is_negative() {
        let xs: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert!(excess_kurtosis(&xs) < -1.0);
    }

    #[test]
    fn alternating_series_has_negative_lag_one_acf() {
        let xs: Vec<f64> = (0..50).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let acf = autocorrelation(&xs, 2);
        assert_eq!(acf[0], 1.0);
        assert!(acf[1] < -0.9);
        assert!(acf[2] > 0.9);
    }

    #[test]
    fn normal_quantile_matches_known_value() {
        assert!((standard_normal_quantile(0.975) - 1.959964).abs() < 1e-5);
    }
}
