//! Serializable backtest configuration, loaded from TOML.
//!
//! ```toml
//! [backtest]
//! symbol = "SPY"
//! initial_capital = 10000.0
//! long_only = true
//! start_date = "2020-01-01"
//!
//! [sizing]
//! mode = "fixed_percent"
//! param = 0.95
//!
//! [costs]
//! commission_rate = 0.001
//! min_commission = 1.0
//! slippage = 0.0005
//!
//! [signal]
//! source = "triggers"
//! shift = true
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ledgerbt_core::engine::{CostConfig, EngineConfig, SizingConfig, Thresholds};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from reading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid engine config: {0}")]
    Engine(#[from] ledgerbt_core::ConfigError),
    #[error("start_date {start} is after end_date {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
    #[error("signal exposure must be within [-1, 1], got {0}")]
    InvalidExposure(f64),
}

/// Full configuration for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub costs: CostConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub signal: SignalSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    #[serde(default)]
    pub long_only: bool,
    /// First bar to simulate (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Last bar to simulate (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

fn default_initial_capital() -> f64 {
    10_000.0
}

/// Where the raw signal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// `date,signal[,target_size]` target-exposure file.
    #[default]
    Target,
    /// `date,entry,exit` trigger file, latched into a holding state.
    Triggers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSection {
    pub source: SignalSource,
    /// Move each signal one bar forward so a decision at T's close trades at
    /// T+1's open. Disable only for files that are already shifted.
    pub shift: bool,
    /// Target exposure while the trigger latch is holding.
    pub exposure: f64,
}

impl Default for SignalSection {
    fn default() -> Self {
        Self {
            source: SignalSource::Target,
            shift: true,
            exposure: 1.0,
        }
    }
}

impl BacktestConfig {
    /// Config with library defaults for `symbol`.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            backtest: BacktestSection {
                symbol: symbol.into(),
                initial_capital: default_initial_capital(),
                long_only: false,
                start_date: None,
                end_date: None,
            },
            sizing: SizingConfig::default(),
            costs: CostConfig::default(),
            thresholds: Thresholds::default(),
            signal: SignalSection::default(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine_config().validate()?;
        if let (Some(start), Some(end)) = (self.backtest.start_date, self.backtest.end_date) {
            if start > end {
                return Err(ConfigError::InvalidWindow { start, end });
            }
        }
        let exposure = self.signal.exposure;
        if !exposure.is_finite() || !(-1.0..=1.0).contains(&exposure) {
            return Err(ConfigError::InvalidExposure(exposure));
        }
        Ok(())
    }

    /// The immutable engine configuration this file describes.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.backtest.symbol.as_str(), self.backtest.initial_capital)
            .with_sizing(self.sizing)
            .with_costs(self.costs)
            .with_long_only(self.backtest.long_only)
            .with_thresholds(self.thresholds)
    }

    /// Deterministic hash of the full configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        let bytes = serde_json::to_vec(self).unwrap_or_else(|_| format!("{self:?}").into_bytes());
        blake3::hash(&bytes).to_hex().to_string()
    }
}
