//! Engine configuration, mutable state, and run result types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::cost_model::CostConfig;
use super::event::EventQueue;
use super::sizer::SizingConfig;
use crate::domain::{Account, EquityCurveRow, Trade};
use crate::error::ConfigError;

/// Governs every "effectively zero" comparison (quantities, deltas, equity).
pub const EPSILON: f64 = 1e-9;
/// Signals with a smaller magnitude are treated as flat.
pub const GHOST_THRESHOLD: f64 = 0.01;
/// Target notional below this fraction of equity is zeroed (0.1%).
pub const MIN_EXPOSURE_THRESHOLD: f64 = 0.001;

/// Numeric thresholds used by the simulation loop and the sizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub epsilon: f64,
    pub ghost_signal: f64,
    pub min_exposure: f64,
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("epsilon", self.epsilon),
            ("ghost_signal", self.ghost_signal),
            ("min_exposure", self.min_exposure),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { field, value });
            }
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            epsilon: EPSILON,
            ghost_signal: GHOST_THRESHOLD,
            min_exposure: MIN_EXPOSURE_THRESHOLD,
        }
    }
}

/// Configuration for a single simulation run. Immutable once the
/// `Simulation` is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub symbol: String,
    pub initial_capital: f64,
    pub sizing: SizingConfig,
    pub costs: CostConfig,
    /// Never hold a negative position.
    pub long_only: bool,
    pub thresholds: Thresholds,
}

impl EngineConfig {
    pub fn new(symbol: impl Into<String>, initial_capital: f64) -> Self {
        Self {
            symbol: symbol.into(),
            initial_capital,
            sizing: SizingConfig::default(),
            costs: CostConfig::default(),
            long_only: false,
            thresholds: Thresholds::default(),
        }
    }

    /// Zero-cost config, handy for exact-arithmetic scenarios.
    pub fn frictionless(symbol: impl Into<String>, initial_capital: f64) -> Self {
        Self {
            costs: CostConfig::frictionless(),
            ..Self::new(symbol, initial_capital)
        }
    }

    pub fn with_sizing(mut self, sizing: SizingConfig) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn with_costs(mut self, costs: CostConfig) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_long_only(mut self, long_only: bool) -> Self {
        self.long_only = long_only;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        self.sizing.validate()?;
        self.costs.validate()?;
        self.thresholds.validate()
    }
}

/// Mutable state that evolves bar-by-bar during one run.
#[derive(Debug)]
pub struct EngineState {
    pub account: Account,
    pub queue: EventQueue,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityCurveRow>,
    /// Date of the bar on which equity first fell to within epsilon of zero.
    pub ruined_at: Option<NaiveDate>,
}

impl EngineState {
    pub fn new(initial_capital: f64, bar_count: usize) -> Self {
        Self {
            account: Account::new(initial_capital),
            queue: EventQueue::new(),
            trades: Vec::new(),
            equity_curve: Vec::with_capacity(bar_count),
            ruined_at: None,
        }
    }

    pub fn is_ruined(&self) -> bool {
        self.ruined_at.is_some()
    }
}

/// Result of a complete simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// One entry per fill, in execution order.
    pub trades: Vec<Trade>,
    /// One row per input bar, zero-filled from the ruin bar onwards.
    pub equity_curve: Vec<EquityCurveRow>,
    pub ruined_at: Option<NaiveDate>,
    pub final_equity: f64,
    pub final_position: f64,
    pub total_commission: f64,
    pub total_slippage: f64,
    pub bar_count: usize,
}

impl RunResult {
    pub fn is_ruined(&self) -> bool {
        self.ruined_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_defaults() {
        let config = EngineConfig::new("SPY", 10_000.0);
        assert_eq!(config.initial_capital, 10_000.0);
        assert_eq!(config.sizing, SizingConfig::fixed_percent(0.95));
        assert_eq!(config.costs.commission_rate, 0.001);
        assert_eq!(config.costs.min_commission, 1.0);
        assert_eq!(config.thresholds.epsilon, 1e-9);
        assert!(!config.long_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_positive_capital_is_rejected() {
        let config = EngineConfig::new("SPY", 0.0);
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveCapital(0.0)));
    }

    #[test]
    fn negative_slippage_is_rejected() {
        let config =
            EngineConfig::new("SPY", 1_000.0).with_costs(CostConfig::new(0.0, 0.0, -0.01));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeCost {
                field: "slippage",
                ..
            })
        ));
    }

    #[test]
    fn engine_state_initial() {
        let state = EngineState::new(100_000.0, 10);
        assert_eq!(state.account.cash, 100_000.0);
        assert!(state.trades.is_empty());
        assert!(state.queue.is_empty());
        assert!(!state.is_ruined());
    }
}
