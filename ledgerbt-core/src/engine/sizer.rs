//! Order sizer — turns a target exposure into a signed target quantity.
//!
//! Two modes:
//! 1. **Fixed percent**: notional = equity * param * signal
//! 2. **Fixed amount**: notional = param * signal
//!
//! Sizers are portfolio-aware (they read equity) but never decide entry or
//! exit; the sign and magnitude of the signal do that.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::state::Thresholds;
use crate::error::ConfigError;

/// How a target signal is converted into notional exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    /// Fraction of current equity.
    FixedPercent,
    /// Fixed currency amount.
    FixedAmount,
}

impl fmt::Display for SizingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedPercent => write!(f, "fixed_percent"),
            Self::FixedAmount => write!(f, "fixed_amount"),
        }
    }
}

/// Sizing mode plus its parameter (a fraction for percent, currency for amount).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub mode: SizingMode,
    pub param: f64,
}

impl SizingConfig {
    pub fn fixed_percent(fraction: f64) -> Self {
        Self {
            mode: SizingMode::FixedPercent,
            param: fraction,
        }
    }

    pub fn fixed_amount(amount: f64) -> Self {
        Self {
            mode: SizingMode::FixedAmount,
            param: amount,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.param.is_finite() || self.param < 0.0 {
            return Err(ConfigError::InvalidSizingParam(self.param));
        }
        Ok(())
    }
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self::fixed_percent(0.95)
    }
}

/// Compute the signed target quantity.
///
/// Returns 0.0 for a non-positive price, for non-positive equity in percent
/// mode, and for any notional smaller than `equity * thresholds.min_exposure`
/// (a ghost position whose value cannot cover the minimum commission).
#[inline]
pub fn size(
    signal: f64,
    equity: f64,
    price: f64,
    mode: SizingMode,
    param: f64,
    thresholds: &Thresholds,
) -> f64 {
    if price <= 0.0 || signal == 0.0 {
        return 0.0;
    }

    let notional = match mode {
        SizingMode::FixedPercent => {
            if equity <= thresholds.epsilon {
                return 0.0;
            }
            equity * param * signal
        }
        SizingMode::FixedAmount => param * signal,
    };

    if notional.abs() < equity * thresholds.min_exposure {
        return 0.0;
    }

    notional / (price + thresholds.epsilon)
}
