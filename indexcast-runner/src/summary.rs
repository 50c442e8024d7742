//! Validation summary — directional accuracy and payout from a fixed stake.
//!
//! Only complete rows (actual and forecast both present) count. A series
//! with no complete rows gets `None` for both metrics, never zero.

use serde::{Deserialize, Serialize};

use crate::walk_forward::{SeriesValidation, ValidationTable};

/// Stake the payout metric starts from.
pub const STARTING_STAKE: f64 = 100.0;

/// Per-series validation metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub name: String,
    /// Share of complete rows where `actual > 0` agrees with `forecast > 0`.
    pub accuracy: Option<f64>,
    /// `100 · Π (1 + actual · [forecast > 0])` over complete rows in date order.
    pub payout_from_100: Option<f64>,
    pub complete_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValidationSummary {
    pub series: Vec<SeriesSummary>,
}

impl ValidationSummary {
    pub fn get(&self, name: &str) -> Option<&SeriesSummary> {
        self.series.iter().find(|s| s.name == name)
    }
}

/// Summarise every series of a validation table.
pub fn summarize(table: &ValidationTable) -> ValidationSummary {
    ValidationSummary {
        series: table.series.iter().map(summarize_series).collect(),
    }
}

pub fn summarize_series(validation: &SeriesValidation) -> SeriesSummary {
    let complete: Vec<(f64, f64)> = validation
        .points
        .iter()
        .filter_map(|p| Some((p.actual?, p.forecast?)))
        .collect();

    if complete.is_empty() {
        return SeriesSummary {
            name: validation.name.clone(),
            accuracy: None,
            payout_from_100: None,
            complete_rows: 0,
        };
    }

    let hits = complete
        .iter()
        .filter(|(actual, forecast)| (*actual > 0.0) == (*forecast > 0.0))
        .count();
    let payout = complete
        .iter()
        .map(|(actual, forecast)| {
            let invested = if *forecast > 0.0 { 1.0 } else { 0.0 };
            1.0 + actual * invested
        })
        .product::<f64>()
        * STARTING_STAKE;

    SeriesSummary {
        name: validation.name.clone(),
        accuracy: Some(hits as f64 / complete.len() as f64),
        payout_from_100: Some(payout),
        complete_rows: complete.len(),
    }
}
