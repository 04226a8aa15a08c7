//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// OHLCV bar for the simulated instrument on a single day.
///
/// `open` is the execution reference price; `close` values the account at
/// the end of the bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if either price used by the simulation is NaN or infinite.
    pub fn has_non_finite_prices(&self) -> bool {
        !self.open.is_finite() || !self.close.is_finite()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.has_non_finite_prices() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Check that a bar series is usable by the simulation.
///
/// Dates must be strictly increasing and `open`/`close` must be finite.
/// Insane-but-finite bars (zero or negative prices, crossed high/low) are
/// allowed through: the loop resolves them to no-ops rather than aborting.
pub fn validate_bars(bars: &[Bar]) -> Result<(), EngineError> {
    for (index, bar) in bars.iter().enumerate() {
        if !bar.open.is_finite() {
            return Err(EngineError::InvalidInput {
                index,
                field: "open",
            });
        }
        if !bar.close.is_finite() {
            return Err(EngineError::InvalidInput {
                index,
                field: "close",
            });
        }
        if index > 0 && bar.date <= bars[index - 1].date {
            return Err(EngineError::NonIncreasingDates {
                index,
                date: bar.date,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            100.0,
            105.0,
            98.0,
            103.0,
            50_000.0,
        )
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_non_finite() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.has_non_finite_prices());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0; // below low
        assert!(!bar.is_sane());
    }

    #[test]
    fn validate_accepts_increasing_dates() {
        let mut a = sample_bar();
        let mut b = sample_bar();
        a.date = day(2);
        b.date = day(3);
        assert!(validate_bars(&[a, b]).is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_dates() {
        let a = sample_bar();
        let b = sample_bar();
        let err = validate_bars(&[a, b]).unwrap_err();
        assert_eq!(
            err,
            EngineError::NonIncreasingDates {
                index: 1,
                date: day(2)
            }
        );
    }

    #[test]
    fn validate_rejects_infinite_close() {
        let mut bar = sample_bar();
        bar.close = f64::INFINITY;
        let err = validate_bars(&[bar]).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidInput {
                index: 0,
                field: "close"
            }
        );
    }

    #[test]
    fn validate_allows_zero_price_bars() {
        let mut bar = sample_bar();
        bar.open = 0.0;
        assert!(validate_bars(&[bar]).is_ok());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
