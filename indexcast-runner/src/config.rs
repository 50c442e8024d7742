//! Serializable forecast-run configuration (TOML).
//!
//! A run is described by the data slice to forecast, the number of
//! walk-forward validation steps, and the list of strategies to compare.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use indexcast_core::data::{Frequency, ValueKind};
use indexcast_core::forecast::{Arima, ForecastProvider, MomentumBenchmark, TrendSeasonal};

/// Content hash of a configuration.
pub type Fingerprint = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Full configuration of a forecast run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastConfig {
    #[serde(default)]
    pub data: DataSection,

    #[serde(default)]
    pub validation: ValidationSection,

    #[serde(default = "default_strategies")]
    pub strategy: Vec<StrategyConfig>,
}

/// Which slice of the frequency panel to forecast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSection {
    /// Wide prices CSV; CLI flags take precedence.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_frequency")]
    pub frequency: Frequency,

    #[serde(default = "default_kind")]
    pub kind: ValueKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationSection {
    /// Requested walk-forward steps, before the headroom guard.
    #[serde(default = "default_steps")]
    pub steps: usize,
}

/// Forecast strategy selection (serializable enum).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    Benchmark {
        #[serde(default = "default_buy_positive")]
        buy_positive: bool,
    },
    Arima {
        #[serde(default = "default_order")]
        order: (usize, usize, usize),
    },
    TrendSeasonal,
}

impl StrategyConfig {
    /// Instantiate the configured provider.
    pub fn build(&self) -> Box<dyn ForecastProvider> {
        match self {
            StrategyConfig::Benchmark { buy_positive } => {
                Box::new(MomentumBenchmark::new(*buy_positive))
            }
            StrategyConfig::Arima { order } => Box::new(Arima::new(*order)),
            StrategyConfig::TrendSeasonal => Box::new(TrendSeasonal::default()),
        }
    }
}

impl ForecastConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Build every configured provider, in order.
    pub fn providers(&self) -> Vec<Box<dyn ForecastProvider>> {
        self.strategy.iter().map(StrategyConfig::build).collect()
    }

    /// Deterministic content hash. Identical configs share a fingerprint.
    pub fn fingerprint(&self) -> Result<Fingerprint, ConfigError> {
        let json = serde_json::to_string(self)?;
        let hash = blake3::hash(json.as_bytes());
        Ok(hash.to_hex().to_string())
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            data: DataSection::default(),
            validation: ValidationSection::default(),
            strategy: default_strategies(),
        }
    }
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            path: None,
            frequency: default_frequency(),
            kind: default_kind(),
        }
    }
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            steps: default_steps(),
        }
    }
}

fn default_frequency() -> Frequency {
    Frequency::BusinessMonthEnd
}

fn default_kind() -> ValueKind {
    ValueKind::Return
}

fn default_steps() -> usize {
    24
}

fn default_buy_positive() -> bool {
    true
}

fn default_order() -> (usize, usize, usize) {
    (1, 0, 0)
}

fn default_strategies() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::Benchmark { buy_positive: true },
        StrategyConfig::Arima { order: (1, 0, 0) },
    ]
}
