//! Bar-by-bar simulation loop over one instrument.
//!
//! Each bar runs one event cycle:
//! 1. Market: the bar opens; `open` becomes the execution reference price
//! 2. Signal: the pre-shifted raw signal is de-noised into a target exposure
//! 3. Order: the sizer turns the exposure into a target quantity; the delta
//!    against the current position becomes a market order (capped by cash
//!    and, under long-only, by the current position)
//! 4. Fill: the fill simulator prices the order; the fill is applied to the
//!    account and recorded in the trade ledger
//!
//! After the queue drains the account is valued at `close` and one equity
//! row is appended. Equity at or below zero is ruin: the remaining bars emit
//! zero rows and no further orders are generated.
//!
//! The loop never shifts signals. `raw_signal[t]` must already contain only
//! information available before bar `t` opens.

use chrono::NaiveDate;

use super::event::Event;
use super::fill::simulate_fill;
use super::sizer::size;
use super::state::{EngineConfig, EngineState, RunResult};
use crate::domain::{validate_bars, Bar, EquityCurveRow, Order, OrderSide, Trade};
use crate::error::{ConfigError, EngineError};

/// A configured simulation. Holds only immutable configuration, so one
/// instance can run any number of independent backtests.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: EngineConfig,
}

impl Simulation {
    /// Build a simulation, rejecting invalid configuration up front.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run over `bars` with one pre-shifted target signal per bar.
    pub fn run(&self, bars: &[Bar], raw_signal: &[f64]) -> Result<RunResult, EngineError> {
        self.run_with_sizes(bars, raw_signal, None)
    }

    /// Run with an optional per-bar sizing parameter that replaces
    /// `SizingConfig::param` bar by bar.
    pub fn run_with_sizes(
        &self,
        bars: &[Bar],
        raw_signal: &[f64],
        target_sizes: Option<&[f64]>,
    ) -> Result<RunResult, EngineError> {
        validate_inputs(bars, raw_signal, target_sizes)?;

        let mut state = EngineState::new(self.config.initial_capital, bars.len());

        for (t, bar) in bars.iter().enumerate() {
            if state.is_ruined() {
                state.equity_curve.push(EquityCurveRow::ruined(bar.date));
                continue;
            }

            let sizing_param = target_sizes.map_or(self.config.sizing.param, |s| s[t]);
            self.step(&mut state, bar, raw_signal[t], sizing_param);
            self.close_bar(&mut state, bar);
        }

        let final_equity = state
            .equity_curve
            .last()
            .map_or(self.config.initial_capital, |row| row.equity);

        tracing::info!(
            symbol = %self.config.symbol,
            bars = bars.len(),
            trades = state.trades.len(),
            final_equity,
            ruined = state.is_ruined(),
            "simulation complete"
        );

        Ok(RunResult {
            trades: state.trades,
            equity_curve: state.equity_curve,
            ruined_at: state.ruined_at,
            final_equity,
            final_position: state.account.position_quantity,
            total_commission: state.account.total_commission,
            total_slippage: state.account.total_slippage,
            bar_count: bars.len(),
        })
    }

    /// Push the bar's market event and drain the queue to completion.
    fn step(&self, state: &mut EngineState, bar: &Bar, raw_signal: f64, sizing_param: f64) {
        state.queue.push(Event::Market {
            date: bar.date,
            open: bar.open,
        });

        while let Some(event) = state.queue.pop() {
            match event {
                Event::Market { date, open } => {
                    state.account.mark(open);
                    state.queue.push(Event::Signal {
                        date,
                        symbol: self.config.symbol.clone(),
                        target_exposure: self.denoise(raw_signal),
                    });
                }
                Event::Signal {
                    date,
                    target_exposure,
                    ..
                } => {
                    let order = self.build_order(state, bar, target_exposure, sizing_param);
                    if let Some(order) = order {
                        state.queue.push(Event::Order { date, order });
                    }
                }
                Event::Order { date, order } => {
                    let fill = simulate_fill(&order, date, bar.open, &self.config.costs);
                    state.queue.push(Event::Fill { date, fill });
                }
                Event::Fill { fill, .. } => {
                    state.account.apply_fill(&fill, self.config.thresholds.epsilon);
                    let equity_at_fill = state.account.equity(fill.price);
                    tracing::debug!(
                        date = %fill.date,
                        side = %fill.side,
                        quantity = fill.quantity,
                        price = fill.price,
                        commission = fill.commission,
                        cash = state.account.cash,
                        "fill applied"
                    );
                    state.trades.push(Trade::from_fill(&fill, equity_at_fill));
                }
            }
        }
    }

    /// Clamp to [-1, 1] and suppress numerically negligible signals.
    #[inline]
    fn denoise(&self, raw_signal: f64) -> f64 {
        let signal = raw_signal.clamp(-1.0, 1.0);
        if signal.abs() < self.config.thresholds.ghost_signal {
            0.0
        } else {
            signal
        }
    }

    /// Size the target position and turn the delta into an executable order.
    ///
    /// Returns `None` for a non-positive open, when the delta is effectively
    /// zero, or when the cash / position caps leave nothing to trade.
    fn build_order(
        &self,
        state: &EngineState,
        bar: &Bar,
        target_exposure: f64,
        sizing_param: f64,
    ) -> Option<Order> {
        let eps = self.config.thresholds.epsilon;
        let account = &state.account;
        let price = bar.open;
        if price <= 0.0 {
            return None;
        }
        let equity = account.equity(price);

        let mut target = size(
            target_exposure,
            equity,
            price,
            self.config.sizing.mode,
            sizing_param,
            &self.config.thresholds,
        );
        if self.config.long_only {
            target = target.max(0.0);
        }

        let delta = target - account.position_quantity;
        if delta.abs() <= eps {
            return None;
        }

        let side = OrderSide::from_delta(delta);
        let quantity = match side {
            OrderSide::Buy => self.affordable_quantity(state, bar.date, price, delta.abs())?,
            OrderSide::Sell if self.config.long_only => {
                delta.abs().min(account.position_quantity.max(0.0))
            }
            OrderSide::Sell => delta.abs(),
        };

        if quantity <= eps {
            return None;
        }
        Some(Order::new(self.config.symbol.as_str(), side, quantity))
    }

    /// Cap a buy so `quantity * fill_price * (1 + commission_rate) <= cash`
    /// in whole units, then make sure value plus commission (including the
    /// minimum) is covered.
    fn affordable_quantity(
        &self,
        state: &EngineState,
        date: NaiveDate,
        price: f64,
        wanted: f64,
    ) -> Option<f64> {
        let eps = self.config.thresholds.epsilon;
        let costs = &self.config.costs;
        let cash = state.account.cash;

        let (fill_price, _) = costs.apply_slippage(price, OrderSide::Buy, wanted);
        let unit_cost = fill_price * (1.0 + costs.commission_rate);
        let max_by_cash = if unit_cost > eps {
            (cash / unit_cost).floor().max(0.0)
        } else {
            0.0
        };

        let quantity = wanted.min(max_by_cash);
        if quantity <= eps {
            return None;
        }

        let trade_value = quantity * fill_price;
        let total_cost = trade_value + costs.compute_commission(trade_value, quantity);
        if cash < total_cost - eps {
            tracing::warn!(
                %date,
                quantity,
                total_cost,
                cash,
                "buy skipped: cash does not cover value plus commission"
            );
            return None;
        }
        Some(quantity)
    }

    /// Value the account at the close and append the bar's equity row.
    fn close_bar(&self, state: &mut EngineState, bar: &Bar) {
        state.account.mark(bar.close);
        let equity = state.account.equity(bar.close);

        if equity <= self.config.thresholds.epsilon {
            tracing::warn!(
                date = %bar.date,
                equity,
                "equity exhausted; zero-filling the remaining curve"
            );
            state.ruined_at = Some(bar.date);
            state.queue.clear();
            state.equity_curve.push(EquityCurveRow::ruined(bar.date));
            return;
        }

        state.equity_curve.push(EquityCurveRow {
            date: bar.date,
            equity,
            cash: state.account.cash,
            position_value: state.account.position_value(bar.close),
        });
    }
}

fn validate_inputs(
    bars: &[Bar],
    raw_signal: &[f64],
    target_sizes: Option<&[f64]>,
) -> Result<(), EngineError> {
    if raw_signal.len() != bars.len() {
        return Err(EngineError::ShapeMismatch {
            what: "raw_signal",
            expected: bars.len(),
            actual: raw_signal.len(),
        });
    }
    if let Some(sizes) = target_sizes {
        if sizes.len() != bars.len() {
            return Err(EngineError::ShapeMismatch {
                what: "target_sizes",
                expected: bars.len(),
                actual: sizes.len(),
            });
        }
        if let Some(index) = sizes.iter().position(|s| !s.is_finite() || *s < 0.0) {
            return Err(EngineError::InvalidInput {
                index,
                field: "target_size",
            });
        }
    }
    if let Some(index) = raw_signal.iter().position(|s| s.is_nan()) {
        return Err(EngineError::InvalidInput {
            index,
            field: "signal",
        });
    }
    validate_bars(bars)
}
