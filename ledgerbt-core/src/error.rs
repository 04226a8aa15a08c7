//! Error taxonomy for the engine.
//!
//! Only malformed inputs and invalid configuration are errors. Ruin and
//! degenerate numerics (zero price, zero equity, zero quantity) are normal
//! outcomes recorded in the run result.

use chrono::NaiveDate;
use thiserror::Error;

/// Fatal input errors surfaced before or at the start of a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("shape mismatch: {what} has length {actual}, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("date misalignment at index {index}: {left} != {right}")]
    DateMisalignment {
        index: usize,
        left: NaiveDate,
        right: NaiveDate,
    },
    #[error("dates must be strictly increasing (index {index}: {date})")]
    NonIncreasingDates { index: usize, date: NaiveDate },
    #[error("invalid {field} at index {index}")]
    InvalidInput { index: usize, field: &'static str },
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// True for every misaligned-input error (length or index).
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. } | Self::DateMisalignment { .. }
        )
    }
}

/// Invalid engine configuration, rejected when a `Simulation` is constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be >= 0 (got {value})")]
    NegativeCost { field: &'static str, value: f64 },
    #[error("initial capital must be > 0 (got {0})")]
    NonPositiveCapital(f64),
    #[error("sizing parameter must be finite and >= 0 (got {0})")]
    InvalidSizingParam(f64),
    #[error("threshold {field} must be finite and >= 0 (got {value})")]
    InvalidThreshold { field: &'static str, value: f64 },
}
