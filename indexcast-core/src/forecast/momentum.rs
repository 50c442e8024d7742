//! Momentum benchmark: tomorrow looks like today.

use super::{
    check_horizon, require_observations, Forecast, ForecastError, ForecastProvider,
    SeriesForecast, DEFAULT_ALPHA,
};
use crate::data::{Frequency, Series};
use crate::stats::sample::quantiles;

/// Forecast = last observed value (negated for the contrarian variant).
///
/// The interval is the empirical `alpha/2` / `1 - alpha/2` quantile range of
/// the whole history handed in, not a model-based band. The forecast does
/// not depend on the horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumBenchmark {
    pub buy_positive: bool,
    pub alpha: f64,
}

impl MomentumBenchmark {
    pub fn new(buy_positive: bool) -> Self {
        Self {
            buy_positive,
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl Default for MomentumBenchmark {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ForecastProvider for MomentumBenchmark {
    fn name(&self) -> String {
        if self.buy_positive {
            "benchmark".into()
        } else {
            "benchmark_contrarian".into()
        }
    }

    fn forecast_series(
        &self,
        series: &Series,
        _frequency: Option<Frequency>,
        horizon: usize,
    ) -> SeriesForecast {
        check_horizon(horizon)?;
        require_observations(series, 1)?;
        let (_, last) = series.last().ok_or_else(|| ForecastError::InsufficientData {
            series: series.name.clone(),
            available: 0,
            required: 1,
        })?;

        let bounds = quantiles(&series.values, &[self.alpha / 2.0, 1.0 - self.alpha / 2.0]);
        Ok(Forecast {
            forecast: if self.buy_positive { last } else { -last },
            ci_lower: bounds[0],
            ci_upper: bounds[1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> Series {
        let dates: Vec<NaiveDate> = (0..values.len())
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap())
            .collect();
        Series::from_slices("X", &dates, values)
    }

    #[test]
    fn follows_last_value() {
        let s = series(&[1.0, -1.0, 2.0, -2.0, 3.0]);
        let f = MomentumBenchmark::new(true).forecast_series(&s, None, 1).unwrap();
        assert_eq!(f.forecast, 3.0);
        assert!(f.invest());
    }

    #[test]
    fn contrarian_flips_sign() {
        let s = series(&[1.0, -1.0, 2.0, -2.0, 3.0]);
        let f = MomentumBenchmark::new(false).forecast_series(&s, None, 1).unwrap();
        assert_eq!(f.forecast, -3.0);
        assert!(!f.invest());
    }

    #[test]
    fn interval_uses_full_history_quantiles() {
        let s = series(&[1.0, -1.0, 2.0, -2.0, 3.0]);
        let f = MomentumBenchmark::default().forecast_series(&s, None, 1).unwrap();
        // sorted [-2,-1,1,2,3], pos 0.025*4 = 0.1 and 0.975*4 = 3.9
        assert!((f.ci_lower - (-1.9)).abs() < 1e-12);
        assert!((f.ci_upper - 2.9).abs() < 1e-12);
    }

    #[test]
    fn horizon_does_not_change_forecast() {
        let s = series(&[0.5, 0.25]);
        let p = MomentumBenchmark::default();
        assert_eq!(p.forecast_series(&s, None, 1), p.forecast_series(&s, None, 5));
    }

    #[test]
    fn empty_series_is_unavailable() {
        let s = series(&[]);
        assert!(matches!(
            MomentumBenchmark::default().forecast_series(&s, None, 1),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn names_distinguish_variants() {
        assert_eq!(MomentumBenchmark::new(true).name(), "benchmark");
        assert_eq!(MomentumBenchmark::new(false).name(), "benchmark_contrarian");
    }
}
