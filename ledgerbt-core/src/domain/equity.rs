use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the equity curve, appended per processed bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityCurveRow {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
    pub position_value: f64,
}

impl EquityCurveRow {
    /// Row emitted for the ruin bar and every bar after it.
    pub fn ruined(date: NaiveDate) -> Self {
        Self {
            date,
            equity: 0.0,
            cash: 0.0,
            position_value: 0.0,
        }
    }
}
