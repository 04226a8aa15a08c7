//! Backtesting engine — the single-instrument simulation loop and the pieces
//! it is built from.
//!
//! Per bar: Market → Signal → Order → Fill, then close valuation. See
//! [`loop_runner`] for the details.

pub mod cost_model;
pub mod event;
pub mod fill;
pub mod loop_runner;
pub mod sizer;
pub mod state;

pub use cost_model::CostConfig;
pub use event::{Event, EventQueue};
pub use fill::simulate_fill;
pub use loop_runner::Simulation;
pub use sizer::{size, SizingConfig, SizingMode};
pub use state::{
    EngineConfig, EngineState, RunResult, Thresholds, EPSILON, GHOST_THRESHOLD,
    MIN_EXPOSURE_THRESHOLD,
};
