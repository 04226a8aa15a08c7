//! Cost model — slippage and commission calculation.
//!
//! Slippage is directional: buyers pay more (higher price), sellers receive less (lower price).
//! Commission is a rate on the traded value with a per-fill minimum.

use serde::{Deserialize, Serialize};

use crate::domain::OrderSide;
use crate::error::ConfigError;

/// Execution friction applied to every fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Commission as a fraction of traded value (0.001 = 0.1%).
    pub commission_rate: f64,
    /// Minimum commission charged per fill, in currency.
    pub min_commission: f64,
    /// Slippage as a fraction of the reference price (0.0005 = 5 bps).
    pub slippage: f64,
}

impl CostConfig {
    pub fn new(commission_rate: f64, min_commission: f64, slippage: f64) -> Self {
        Self {
            commission_rate,
            min_commission,
            slippage,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("commission_rate", self.commission_rate),
            ("min_commission", self.min_commission),
            ("slippage", self.slippage),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeCost { field, value });
            }
        }
        Ok(())
    }

    /// Apply slippage to a reference price.
    ///
    /// Returns `(slipped_price, slippage_dollar_amount)`.
    pub fn apply_slippage(
        &self,
        reference_price: f64,
        side: OrderSide,
        quantity: f64,
    ) -> (f64, f64) {
        if self.slippage == 0.0 {
            return (reference_price, 0.0);
        }
        match side {
            OrderSide::Buy => {
                let slipped = reference_price * (1.0 + self.slippage);
                (slipped, (slipped - reference_price) * quantity)
            }
            OrderSide::Sell => {
                let slipped = reference_price * (1.0 - self.slippage);
                (slipped, (reference_price - slipped) * quantity)
            }
        }
    }

    /// Commission for a fill of `quantity` units worth `trade_value`.
    ///
    /// `commission = max(trade_value * commission_rate, min_commission)`. The
    /// base is always the traded delta, never the resulting position.
    pub fn compute_commission(&self, trade_value: f64, quantity: f64) -> f64 {
        if quantity <= 0.0 {
            return 0.0;
        }
        (trade_value.abs() * self.commission_rate).max(self.min_commission)
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self::new(0.001, 1.0, 0.0005)
    }
}
