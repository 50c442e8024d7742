//! IndexCast Core — time-series tables, frequency reshaping, statistics and forecast providers.
//!
//! This crate holds everything that does not touch disk or orchestrate runs:
//! - The wide date-indexed table and its (frequency, kind) panel
//! - Multi-frequency reshaping of price histories into levels and returns
//! - Descriptive statistics, diagnostic tests and period-return summaries
//! - The `ForecastProvider` trait with momentum, ARIMA and trend-seasonal variants
//! - Numerical fitting helpers shared by the model-based providers

pub mod data;
pub mod fit;
pub mod forecast;
pub mod stats;
