use crate::domain::order::OrderSide;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fill record produced by the fill simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub date: NaiveDate,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    /// Execution price after slippage.
    pub price: f64,
    pub commission: f64,
    /// Dollar cost of slippage relative to the reference price.
    pub slippage: f64,
}

impl Fill {
    /// Gross value of the fill, excluding commission.
    pub fn trade_value(&self) -> f64 {
        self.price * self.quantity
    }

    /// Cash impact: negative for buys (value + commission), positive for
    /// sells (value - commission).
    pub fn cash_delta(&self) -> f64 {
        match self.side {
            OrderSide::Buy => -(self.trade_value() + self.commission),
            OrderSide::Sell => self.trade_value() - self.commission,
        }
    }
}
