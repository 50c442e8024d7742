//! Descriptive statistics and diagnostic tests for return tables.

pub mod hypothesis;
pub mod returns;
pub mod sample;

use serde::Serialize;
use std::fmt;

use crate::data::TimeSeriesTable;
use hypothesis::{adf, jarque_bera, ljung_box, AdfRegression};

pub use returns::{return_summary, ReturnSummary};

/// Significance level for the boolean diagnostics.
pub const SIGNIFICANCE: f64 = 0.05;

/// Percentiles reported by [`describe`].
pub const PERCENTILES: [f64; 9] = [0.005, 0.01, 0.05, 0.25, 0.5, 0.75, 0.95, 0.99, 0.995];

/// Number of autocorrelation lags reported (and used by Ljung–Box).
pub const ACF_LAGS: usize = 4;

/// Summary statistics of one column's non-missing values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStatistics {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    /// Values at [`PERCENTILES`], same order.
    pub percentiles: Vec<f64>,
    pub max: f64,
    pub skew: f64,
    pub kurt: f64,
    pub sharpe_ratio: f64,
    /// Autocorrelation at lags 1..=ACF_LAGS.
    pub acf: Vec<f64>,
    /// Jarque–Bera fails to reject normality.
    pub normality: Option<bool>,
    /// Ljung–Box rejects "no autocorrelation".
    pub autocorrelation: Option<bool>,
    /// ADF (constant) rejects a unit root.
    pub stationary: Option<bool>,
    /// ADF (constant + trend) rejects a unit root.
    pub trend_stationary: Option<bool>,
}

/// One cell of the statistics table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatValue {
    Number(f64),
    Count(usize),
    Flag(Option<bool>),
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Number(v) if v.is_nan() => f.write_str(""),
            StatValue::Number(v) => write!(f, "{v}"),
            StatValue::Count(n) => write!(f, "{n}"),
            StatValue::Flag(Some(b)) => write!(f, "{b}"),
            StatValue::Flag(None) => f.write_str(""),
        }
    }
}

impl ColumnStatistics {
    /// `(row label, value)` pairs in display order.
    pub fn rows(&self) -> Vec<(String, StatValue)> {
        let mut rows = vec![
            ("count".to_string(), StatValue::Count(self.count)),
            ("mean".to_string(), StatValue::Number(self.mean)),
            ("std".to_string(), StatValue::Number(self.std)),
            ("min".to_string(), StatValue::Number(self.min)),
        ];
        for (q, v) in PERCENTILES.iter().zip(&self.percentiles) {
            rows.push((percentile_label(*q), StatValue::Number(*v)));
        }
        rows.push(("max".into(), StatValue::Number(self.max)));
        rows.push(("skew".into(), StatValue::Number(self.skew)));
        rows.push(("kurt".into(), StatValue::Number(self.kurt)));
        rows.push(("sharpe_ratio".into(), StatValue::Number(self.sharpe_ratio)));
        for (lag, v) in self.acf.iter().enumerate() {
            rows.push((format!("acf_{}", lag + 1), StatValue::Number(*v)));
        }
        rows.push(("normality".into(), StatValue::Flag(self.normality)));
        rows.push(("autocorrelation".into(), StatValue::Flag(self.autocorrelation)));
        rows.push(("stationary".into(), StatValue::Flag(self.stationary)));
        rows.push(("trend_stationary".into(), StatValue::Flag(self.trend_stationary)));
        rows
    }
}

fn percentile_label(q: f64) -> String {
    let pct = q * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{}%", pct.round())
    } else {
        format!("{pct:.1}%")
    }
}

/// Statistics for every column of `table`, in column order.
pub fn describe(table: &TimeSeriesTable) -> Vec<ColumnStatistics> {
    (0..table.columns().len())
        .map(|c| {
            let series = table.series_at(c);
            describe_values(&series.name, &series.values)
        })
        .collect()
}

/// Statistics for one sequence of non-missing values.
pub fn describe_values(name: &str, values: &[f64]) -> ColumnStatistics {
    let mean = sample::mean(values);
    let std = sample::std_dev(values);
    let acf = sample::autocorrelation(values, ACF_LAGS);
    let extremes = sample::quantiles(values, &[0.0, 1.0]);

    ColumnStatistics {
        name: name.to_string(),
        count: values.len(),
        mean,
        std,
        min: extremes[0],
        percentiles: sample::quantiles(values, &PERCENTILES),
        max: extremes[1],
        skew: sample::skewness(values),
        kurt: sample::excess_kurtosis(values),
        sharpe_ratio: mean / std,
        acf: acf[1..].to_vec(),
        normality: jarque_bera(values).map(|t| t.p_value > SIGNIFICANCE),
        autocorrelation: ljung_box(values, ACF_LAGS).map(|t| t.p_value < SIGNIFICANCE),
        stationary: adf(values, AdfRegression::Constant).map(|r| r.is_stationary()),
        trend_stationary: adf(values, AdfRegression::ConstantTrend).map(|r| r.is_stationary()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn percentile_labels() {
        assert_eq!(percentile_label(0.005), "0.5%");
        assert_eq!(percentile_label(0.25), "25%");
        assert_eq!(percentile_label(0.995), "99.5%");
    }

    #[test]
    fn describe_reports_every_column() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..60).map(|i| start + Duration::days(i)).collect();
        let a: Vec<f64> = (0..60).map(|i| ((i * 7) % 11) as f64 - 5.0).collect();
        let b: Vec<f64> = (0..60)
            .map(|i| if i < 10 { f64::NAN } else { (i % 3) as f64 })
            .collect();
        let table =
            TimeSeriesTable::from_columns(dates, vec![("A".into(), a), ("B".into(), b)]).unwrap();

        let stats = describe(&table);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].count, 60);
        assert_eq!(stats[1].count, 50);
        assert_eq!(stats[0].percentiles.len(), PERCENTILES.len());
        assert_eq!(stats[0].acf.len(), ACF_LAGS);
        assert!(stats[0].min <= stats[0].percentiles[0]);
        assert!(stats[0].max >= stats[0].percentiles[8]);

        let labels: Vec<String> = stats[0].rows().into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels.first().map(String::as_str), Some("count"));
        assert_eq!(labels.last().map(String::as_str), Some("trend_stationary"));
        assert!(labels.contains(&"acf_4".to_string()));
    }

    #[test]
    fn short_series_leaves_diagnostics_undefined() {
        let stats = describe_values("A", &[1.0, 2.0]);
        assert_eq!(stats.normality, None);
        assert_eq!(stats.stationary, None);
        assert!(stats.skew.is_nan());
        assert_eq!(StatValue::Flag(None).to_string(), "");
    }
}
