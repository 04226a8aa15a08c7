//! LedgerBT Runner — everything around a single simulation.
//!
//! This crate builds on `ledgerbt-core` to provide:
//! - TOML backtest configuration with content-addressed run ids
//! - CSV loading of bars, target signals and entry/exit triggers
//! - Date alignment, T+1 signal shifting and date windowing
//! - Parallel parameter sweeps
//! - JSON / CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError, RunId, SignalSource};
pub use data_loader::{load_inputs, LoadError, LoadedData, SignalInput};
pub use export::{load_artifacts, save_artifacts};
pub use runner::{run_backtest_from_data, run_single_backtest, BacktestResult, RunError};
pub use sweep::{ParamGrid, ParamSweep, SweepResults};
