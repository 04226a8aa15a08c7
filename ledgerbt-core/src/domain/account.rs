//! Account — cash plus a single-instrument position.

use super::fill::Fill;

/// Mutable account state for one run.
///
/// Owned by the simulation loop. The accounting identity must hold at every
/// bar: `equity == cash + position_quantity * price`.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub position_quantity: f64,
    /// Price of the most recent fill or valuation.
    pub last_price: f64,
    pub total_commission: f64,
    pub total_slippage: f64,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            position_quantity: 0.0,
            last_price: 0.0,
            total_commission: 0.0,
            total_slippage: 0.0,
        }
    }

    /// Market value of the position at `price`.
    pub fn position_value(&self, price: f64) -> f64 {
        self.position_quantity * price
    }

    /// Total equity = cash + position market value at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position_value(price)
    }

    /// Apply a fill: move cash by value and commission, move the position by
    /// the fill quantity. A residual position within `epsilon` of zero is
    /// snapped to exactly zero.
    pub fn apply_fill(&mut self, fill: &Fill, epsilon: f64) {
        self.cash += fill.cash_delta();
        self.position_quantity += fill.side.sign() * fill.quantity;
        if self.position_quantity.abs() < epsilon {
            self.position_quantity = 0.0;
        }
        self.last_price = fill.price;
        self.total_commission += fill.commission;
        self.total_slippage += fill.slippage;
    }

    /// Mark the account at `price` without changing holdings.
    pub fn mark(&mut self, price: f64) {
        self.last_price = price;
    }
}
