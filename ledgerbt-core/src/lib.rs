//! LedgerBT Core — domain types, trigger latch, and the simulation engine.
//!
//! - Domain types (bars, orders, fills, trades, account, equity rows)
//! - Entry/exit trigger latch producing a position-state series
//! - Sizer, cost model and fill simulator
//! - Bar-by-bar event-driven simulation loop with ruin handling

pub mod domain;
pub mod engine;
pub mod error;
pub mod latch;

pub use engine::{EngineConfig, RunResult, Simulation};
pub use error::{ConfigError, EngineError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed to sweep workers are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::EquityCurveRow>();
        require_sync::<domain::EquityCurveRow>();

        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::Simulation>();
        require_sync::<engine::Simulation>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();

        require_send::<latch::TriggerPair>();
        require_sync::<latch::TriggerPair>();
        require_send::<EngineError>();
        require_sync::<EngineError>();
    }
}
