//! Backtest runner — wires configuration, loaded inputs and the engine.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads CSV inputs from disk, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded data. Used by parameter sweeps.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ledgerbt_core::domain::{EquityCurveRow, Trade};
use ledgerbt_core::engine::Simulation;
use ledgerbt_core::error::EngineError;

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_inputs, LoadError, LoadedData};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbol: String,
    pub config: BacktestConfig,
    pub dataset_hash: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: usize,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub final_position: f64,
    pub total_commission: f64,
    pub total_slippage: f64,
    /// First bar on which equity reached zero, if any.
    pub ruined_at: Option<NaiveDate>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityCurveRow>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn is_ruined(&self) -> bool {
        self.ruined_at.is_some()
    }

    /// Simple return over the run, `final / initial - 1`.
    pub fn total_return(&self) -> f64 {
        self.final_equity / self.initial_capital - 1.0
    }
}

/// Run a backtest from config plus CSV inputs on disk.
pub fn run_single_backtest(
    config: &BacktestConfig,
    bars_path: &Path,
    signal_path: &Path,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let data = load_inputs(config, bars_path, signal_path)?;
    run_backtest_from_data(config, &data)
}

/// Run a backtest with pre-loaded data. No I/O.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    data: &LoadedData,
) -> Result<BacktestResult, RunError> {
    let simulation = Simulation::new(config.engine_config()).map_err(ConfigError::from)?;
    let run = simulation.run_with_sizes(&data.bars, &data.signal, data.target_sizes.as_deref())?;
    let run_id = config.run_id();

    tracing::info!(
        run_id = %run_id,
        symbol = %config.backtest.symbol,
        trades = run.trades.len(),
        final_equity = run.final_equity,
        ruined = run.is_ruined(),
        "backtest finished"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        symbol: config.backtest.symbol.clone(),
        config: config.clone(),
        dataset_hash: data.dataset_hash.clone(),
        start_date: data.bars.first().map(|b| b.date),
        end_date: data.bars.last().map(|b| b.date),
        bar_count: run.bar_count,
        initial_capital: config.backtest.initial_capital,
        final_equity: run.final_equity,
        final_position: run.final_position,
        total_commission: run.total_commission,
        total_slippage: run.total_slippage,
        ruined_at: run.ruined_at,
        trades: run.trades,
        equity_curve: run.equity_curve,
    })
}
