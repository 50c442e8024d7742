//! Look-ahead contamination tests for every forecast provider.
//!
//! Invariant: a forecast made from rows 0..k must not change when rows at or
//! after k are altered.
//!
//! Method: forecast from a truncated table, then perturb the rows past the
//! cut in the full table and forecast again from the same truncated slice.

use chrono::NaiveDate;
use indexcast_core::data::{Frequency, Series, TimeSeriesTable};
use indexcast_core::forecast::{Arima, ForecastProvider, MomentumBenchmark, TrendSeasonal};

/// Deterministic monthly returns with some structure.
fn make_returns(n: usize) -> TimeSeriesTable {
    let mut dates = vec![NaiveDate::from_ymd_opt(2010, 1, 29).unwrap()];
    while dates.len() < n {
        let next = Frequency::BusinessMonthEnd.next_period_end(*dates.last().unwrap());
        dates.push(next);
    }
    let a: Vec<f64> = (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            ((seed >> 33) % 200) as f64 / 1000.0 - 0.1
        })
        .collect();
    let b: Vec<f64> = (0..n)
        .map(|i| if i < 6 { f64::NAN } else { (i as f64 * 0.7).sin() * 0.05 })
        .collect();
    TimeSeriesTable::from_columns(dates, vec![("A".into(), a), ("B".into(), b)])
        .unwrap()
        .with_frequency(Frequency::BusinessMonthEnd)
}

fn perturb_after(table: &TimeSeriesTable, cut: usize) -> TimeSeriesTable {
    let columns = table
        .columns()
        .iter()
        .enumerate()
        .map(|(c, name)| {
            let values = table
                .column_at(c)
                .iter()
                .enumerate()
                .map(|(i, v)| if i >= cut { v * -3.0 + 1.0 } else { *v })
                .collect();
            (name.clone(), values)
        })
        .collect();
    TimeSeriesTable::from_columns(table.dates().to_vec(), columns)
        .unwrap()
        .with_frequency(Frequency::BusinessMonthEnd)
}

fn assert_no_lookahead(provider: &dyn ForecastProvider, n: usize, cut: usize) {
    let full = make_returns(n);
    let altered = perturb_after(&full, cut);

    let before = provider.forecast(&full.slice_rows(0, cut), 1);
    let after = provider.forecast(&altered.slice_rows(0, cut), 1);
    assert_eq!(before, after, "{}: forecast changed after altering future rows", provider.name());

    let changed = provider.forecast(&altered, 1);
    assert_eq!(changed.columns, before.columns);
}

#[test]
fn momentum_has_no_lookahead() {
    assert_no_lookahead(&MomentumBenchmark::new(true), 60, 40);
    assert_no_lookahead(&MomentumBenchmark::new(false), 60, 40);
}

#[test]
fn arima_has_no_lookahead() {
    assert_no_lookahead(&Arima::new((1, 0, 0)), 80, 50);
    assert_no_lookahead(&Arima::new((1, 1, 1)), 80, 50);
}

#[test]
fn trend_seasonal_has_no_lookahead() {
    assert_no_lookahead(&TrendSeasonal::default(), 60, 36);
}

#[test]
fn forecast_target_follows_table_frequency() {
    let table = make_returns(36);
    let trending: Vec<f64> = (0..36).map(|i| 1.0 + 0.1 * i as f64).collect();
    let series = Series::from_slices("T", table.dates(), &trending);
    let provider = TrendSeasonal::default();

    let next_month = provider
        .forecast_series(&series, Some(Frequency::BusinessMonthEnd), 1)
        .unwrap();
    let next_day = provider
        .forecast_series(&series, Some(Frequency::BusinessDay), 1)
        .unwrap();
    assert!(next_month.forecast > next_day.forecast);
}
