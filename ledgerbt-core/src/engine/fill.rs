//! Fill simulator — turns an order and a reference price into a fill.
//!
//! Applies directional slippage to the reference price, then charges
//! commission on the value of the filled quantity.

use chrono::NaiveDate;

use super::cost_model::CostConfig;
use crate::domain::{Fill, Order};

/// Simulate an immediate market fill of `order` at `reference_price`.
pub fn simulate_fill(
    order: &Order,
    date: NaiveDate,
    reference_price: f64,
    costs: &CostConfig,
) -> Fill {
    let (price, slippage) = costs.apply_slippage(reference_price, order.side, order.quantity);
    let trade_value = price * order.quantity;
    let commission = costs.compute_commission(trade_value, order.quantity);

    Fill {
        date,
        symbol: order.symbol.clone(),
        side: order.side,
        quantity: order.quantity,
        price,
        commission,
        slippage,
    }
}
