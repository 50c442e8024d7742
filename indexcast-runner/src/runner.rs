//! Forecast runner — wires together the live forecast, walk-forward
//! validation, and the summary into one bundle per strategy.
//!
//! Entry points:
//! - `execute()`: one provider over one table.
//! - `execute_all()`: every configured provider over the same table.
//! - `run_from_config()`: reshape loaded prices, slice, then `execute_all()`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use indexcast_core::data::{transform, TimeSeriesTable, TransformError};
use indexcast_core::forecast::{ForecastProvider, ForecastTable};

use crate::config::{ConfigError, ForecastConfig};
use crate::data_loader::{compute_dataset_hash, load_prices_csv, LoadError, LoadedPrices};
use crate::summary::ValidationSummary;
use crate::walk_forward::{validate, ValidationTable};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),
    #[error("no prices file configured (set data.path, pass --data, or use --synthetic)")]
    NoDataSource,
}

/// Non-missing rows held back from validation so the earliest fits have
/// something to learn from.
pub const MIN_HEADROOM: i64 = 10;

/// Current schema version for persisted bundles.
pub const SCHEMA_VERSION: u32 = 1;

/// Validation steps actually used: `min(requested, non_missing_rows - 10)`.
///
/// Signed: zero or negative means validation is not performed, and the
/// value is reported as is.
pub fn effective_validation_steps(table: &TimeSeriesTable, requested: usize) -> i64 {
    let headroom = table.non_missing_row_count() as i64 - MIN_HEADROOM;
    (requested as i64).min(headroom)
}

// ─── Bundle ──────────────────────────────────────────────────────────

/// Combined result of one strategy over one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub strategy: String,
    /// One-step-ahead forecast from the full table.
    pub live: ForecastTable,
    pub summary: ValidationSummary,
    /// Steps actually used after the headroom guard.
    pub validation_steps: i64,
    /// Full walk-forward result table.
    pub results: ValidationTable,
    pub dataset_hash: String,
    /// Fingerprint of the configuration that produced this bundle, if any.
    #[serde(default)]
    pub config_fingerprint: Option<String>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl ForecastBundle {
    pub fn validation_performed(&self) -> bool {
        self.validation_steps > 0
    }

    /// Presentation rows, one value per column in `live.columns` order:
    /// `invest`, `forecast`, `ci_lower`, `ci_upper`, `accuracy`,
    /// `payout_from_100`, `validation_steps`.
    pub fn summary_rows(&self) -> Vec<(&'static str, Vec<Option<f64>>)> {
        let mut rows = self.live.rows();
        let per_series = |pick: fn(&crate::summary::SeriesSummary) -> Option<f64>| {
            self.live
                .columns
                .iter()
                .map(|c| self.summary.get(c).and_then(pick))
                .collect::<Vec<_>>()
        };
        rows.push(("accuracy", per_series(|s| s.accuracy)));
        rows.push(("payout_from_100", per_series(|s| s.payout_from_100)));
        rows.push((
            "validation_steps",
            vec![Some(self.validation_steps as f64); self.live.columns.len()],
        ));
        rows
    }
}

/// Cell text for presentation; missing values print as `n/a`.
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e9 => format!("{v:.0}"),
        Some(v) if v.is_finite() => format!("{v:.6}"),
        _ => "n/a".to_string(),
    }
}

// ─── Orchestration ───────────────────────────────────────────────────

/// Outcome of running a set of strategies.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Nothing was run; the reason is reported, not raised.
    NothingToDo(String),
    Completed(Vec<ForecastBundle>),
}

impl RunOutcome {
    pub fn bundles(&self) -> &[ForecastBundle] {
        match self {
            RunOutcome::NothingToDo(_) => &[],
            RunOutcome::Completed(bundles) => bundles,
        }
    }
}

/// Run one provider: live forecast, guarded walk-forward validation, summary.
pub fn execute(
    table: &TimeSeriesTable,
    validation_steps: usize,
    provider: &dyn ForecastProvider,
) -> ForecastBundle {
    let strategy = provider.name();
    let actual_steps = effective_validation_steps(table, validation_steps);
    if actual_steps <= 0 {
        tracing::info!(
            strategy = %strategy,
            requested = validation_steps,
            non_missing_rows = table.non_missing_row_count(),
            "not enough data, validation not performed"
        );
    }

    let live = provider.forecast(table, 1);
    let walk = validate(table, actual_steps.max(0) as usize, provider);

    tracing::info!(
        strategy = %strategy,
        validation_steps = actual_steps,
        "strategy complete"
    );

    ForecastBundle {
        schema_version: SCHEMA_VERSION,
        strategy,
        live,
        summary: walk.summary,
        validation_steps: actual_steps,
        results: walk.table,
        dataset_hash: compute_dataset_hash(table),
        config_fingerprint: None,
    }
}

/// Run every provider over the same table, in order.
pub fn execute_all(
    table: &TimeSeriesTable,
    providers: &[Box<dyn ForecastProvider>],
    validation_steps: usize,
) -> RunOutcome {
    if providers.is_empty() {
        tracing::info!("no strategies configured, nothing to do");
        return RunOutcome::NothingToDo("no strategies configured".into());
    }
    if table.columns().is_empty() {
        tracing::info!("table has no columns, nothing to do");
        return RunOutcome::NothingToDo("table has no columns".into());
    }

    tracing::info!(
        strategies = providers.len(),
        rows = table.len(),
        columns = table.columns().len(),
        "running strategies"
    );
    let bundles = providers
        .iter()
        .map(|p| execute(table, validation_steps, p.as_ref()))
        .collect();
    RunOutcome::Completed(bundles)
}

/// Load the prices file named by `data.path`.
pub fn load_configured_prices(config: &ForecastConfig) -> Result<LoadedPrices, RunError> {
    let path = config.data.path.as_deref().ok_or(RunError::NoDataSource)?;
    Ok(load_prices_csv(path)?)
}

/// Reshape `prices`, take the configured slice, and run every strategy.
pub fn run_from_config(
    config: &ForecastConfig,
    prices: &LoadedPrices,
) -> Result<RunOutcome, RunError> {
    let fingerprint = config.fingerprint()?;
    let panel = transform(&prices.prices)?;
    let table = panel.slice(config.data.frequency, config.data.kind)?;
    tracing::info!(
        frequency = %config.data.frequency,
        kind = %config.data.kind,
        rows = table.len(),
        synthetic = prices.synthetic,
        "forecasting slice"
    );

    let outcome = execute_all(&table, &config.providers(), config.validation.steps);
    Ok(match outcome {
        RunOutcome::Completed(mut bundles) => {
            for bundle in &mut bundles {
                bundle.config_fingerprint = Some(fingerprint.clone());
            }
            RunOutcome::Completed(bundles)
        }
        other => other,
    })
}
