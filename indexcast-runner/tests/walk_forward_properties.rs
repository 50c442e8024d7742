//! Property tests for walk-forward validation and the summary metrics.
//!
//! Uses proptest to verify:
//! 1. Exactly min(steps, N) forecast rows, on strictly increasing test dates
//! 2. No look-ahead: altering rows at or after a test date leaves its forecast
//!    unchanged, for the momentum benchmark and a fitted ARIMA model
//! 3. Accuracy lies in [0, 1] and is 1 when every sign matches
//! 4. Payout rules: 100 when never investing, 100·Π(1+r) when always investing

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use indexcast_core::data::TimeSeriesTable;
use indexcast_core::forecast::{Arima, ForecastProvider, MomentumBenchmark};
use indexcast_runner::summary::summarize_series;
use indexcast_runner::{validate, SeriesValidation, ValidationPoint};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_returns() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.1..0.1_f64, 2..80)
}

fn table_of(values: &[f64]) -> TimeSeriesTable {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let dates = (0..values.len())
        .map(|i| start + Duration::days(i as i64))
        .collect();
    TimeSeriesTable::from_columns(dates, vec![("X".into(), values.to_vec())]).unwrap()
}

fn validation_of(pairs: &[(f64, f64)]) -> SeriesValidation {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    SeriesValidation {
        name: "X".into(),
        points: pairs
            .iter()
            .enumerate()
            .map(|(i, (a, f))| ValidationPoint {
                date: start + Duration::days(i as i64),
                actual: Some(*a),
                forecast: Some(*f),
                ci_lower: Some(f - 0.1),
                ci_upper: Some(f + 0.1),
            })
            .collect(),
        failed_steps: 0,
    }
}

// ── 1. Row count and ordering ────────────────────────────────────────

proptest! {
    #[test]
    fn forecast_rows_match_steps(values in arb_returns(), steps in 0usize..100) {
        let n = values.len();
        let result = validate(&table_of(&values), steps, &MomentumBenchmark::default());
        let x = result.table.get("X").unwrap();
        let expected = steps.min(n);

        // the very first row has no history, so a full-length window loses one
        let lost = usize::from(expected == n);
        prop_assert_eq!(x.forecast_points().count(), expected - lost);
        prop_assert_eq!(x.failed_steps, lost);

        let dates: Vec<NaiveDate> = x.forecast_points().map(|p| p.date).collect();
        prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(result.table.validation_rows(), expected);
    }
}

// ── 2. No look-ahead ─────────────────────────────────────────────────

/// Shift every row from `cut` on by `shock`, then check that forecasts for
/// rows up to and including `cut` are identical.
fn assert_no_leak(
    values: &[f64],
    shock: f64,
    provider: &dyn ForecastProvider,
) -> Result<(), TestCaseError> {
    let n = values.len();
    let steps = n / 2;
    let cut = n - steps / 2;

    let original = validate(&table_of(values), steps, provider);
    let altered_values: Vec<f64> = values
        .iter()
        .enumerate()
        .map(|(i, v)| if i >= cut { v + shock } else { *v })
        .collect();
    let altered = validate(&table_of(&altered_values), steps, provider);

    let before = &original.table.get("X").unwrap().points;
    let after = &altered.table.get("X").unwrap().points;
    // a forecast for row t only uses rows < t
    for t in 0..=cut.min(n - 1) {
        prop_assert_eq!(before[t].forecast, after[t].forecast, "row {}", t);
        prop_assert_eq!(before[t].ci_lower, after[t].ci_lower, "row {}", t);
    }
    Ok(())
}

proptest! {
    #[test]
    fn future_rows_do_not_leak(values in prop::collection::vec(-0.1..0.1_f64, 12..60), shock in 1.0..5.0_f64) {
        assert_no_leak(&values, shock, &MomentumBenchmark::default())?;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn future_rows_do_not_leak_into_arima(values in prop::collection::vec(-0.1..0.1_f64, 24..60), shock in 1.0..5.0_f64) {
        assert_no_leak(&values, shock, &Arima::new((1, 0, 0)))?;
    }
}

// ── 3. Accuracy bounds ───────────────────────────────────────────────

proptest! {
    #[test]
    fn accuracy_in_unit_interval(pairs in prop::collection::vec((-1.0..1.0_f64, -1.0..1.0_f64), 1..50)) {
        let s = summarize_series(&validation_of(&pairs));
        let acc = s.accuracy.unwrap();
        prop_assert!((0.0..=1.0).contains(&acc));
    }

    #[test]
    fn matching_signs_give_perfect_accuracy(
        actuals in prop::collection::vec(prop_oneof![0.001..1.0_f64, -1.0..-0.001_f64], 1..50),
        scale in 0.1..10.0_f64,
    ) {
        let pairs: Vec<(f64, f64)> = actuals.iter().map(|a| (*a, a * scale)).collect();
        let s = summarize_series(&validation_of(&pairs));
        prop_assert_eq!(s.accuracy, Some(1.0));
    }
}

// ── 4. Payout rules ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn never_investing_keeps_100(actuals in prop::collection::vec(-0.5..0.5_f64, 1..50)) {
        let pairs: Vec<(f64, f64)> = actuals.iter().map(|a| (*a, -0.01)).collect();
        let s = summarize_series(&validation_of(&pairs));
        prop_assert_eq!(s.payout_from_100, Some(100.0));
    }

    #[test]
    fn always_investing_compounds(actuals in prop::collection::vec(-0.5..0.5_f64, 1..50)) {
        let pairs: Vec<(f64, f64)> = actuals.iter().map(|a| (*a, 0.01)).collect();
        let s = summarize_series(&validation_of(&pairs));
        let expected = 100.0 * actuals.iter().map(|a| 1.0 + a).product::<f64>();
        prop_assert!((s.payout_from_100.unwrap() - expected).abs() <= 1e-9 * expected.abs().max(1.0));
    }
}
