//! IndexCast Runner — walk-forward validation, orchestration, config and export.
//!
//! This crate builds on `indexcast-core` to provide:
//! - Price loading from wide CSV files, with a synthetic fallback
//! - Walk-forward validation of any `ForecastProvider`
//! - Validation summaries (directional accuracy, payout from 100)
//! - The forecast runner combining live forecasts with validation results
//! - TOML run configuration and content fingerprints
//! - CSV/JSON artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod summary;
pub mod walk_forward;

pub use config::{ConfigError, ForecastConfig, StrategyConfig};
pub use data_loader::{
    compute_dataset_hash, generate_synthetic_prices, load_prices_csv, LoadError, LoadedPrices,
};
pub use runner::{
    effective_validation_steps, execute, execute_all, load_configured_prices, run_from_config,
    ForecastBundle, RunError, RunOutcome, MIN_HEADROOM,
};
pub use summary::{summarize, SeriesSummary, ValidationSummary, STARTING_STAKE};
pub use walk_forward::{
    validate, validation_window, SeriesValidation, ValidationPoint, ValidationTable,
    WalkForwardResult,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn validation_table_is_send_sync() {
        assert_send::<ValidationTable>();
        assert_sync::<ValidationTable>();
        assert_send::<SeriesValidation>();
        assert_sync::<SeriesValidation>();
    }

    #[test]
    fn bundle_is_send_sync() {
        assert_send::<ForecastBundle>();
        assert_sync::<ForecastBundle>();
        assert_send::<RunOutcome>();
        assert_sync::<RunOutcome>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ForecastConfig>();
        assert_sync::<ForecastConfig>();
        assert_send::<StrategyConfig>();
        assert_sync::<StrategyConfig>();
    }

    #[test]
    fn loaded_prices_is_send_sync() {
        assert_send::<LoadedPrices>();
        assert_sync::<LoadedPrices>();
    }
}
