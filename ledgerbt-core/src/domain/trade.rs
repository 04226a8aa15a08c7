//! Trade — one immutable ledger record per fill.

use super::fill::Fill;
use super::order::OrderSide;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ledger entry for a single executed fill.
///
/// `equity_at_fill` is the account equity valued at the fill price right
/// after the fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: f64,
    pub equity_at_fill: f64,
    pub commission: f64,
}

impl Trade {
    pub fn from_fill(fill: &Fill, equity_at_fill: f64) -> Self {
        Self {
            date: fill.date,
            side: fill.side,
            price: fill.price,
            quantity: fill.quantity,
            equity_at_fill,
            commission: fill.commission,
        }
    }
}
