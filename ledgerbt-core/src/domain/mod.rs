//! Domain types for LedgerBT

pub mod account;
pub mod bar;
pub mod equity;
pub mod fill;
pub mod order;
pub mod trade;

pub use account::Account;
pub use bar::{validate_bars, Bar};
pub use equity::EquityCurveRow;
pub use fill::Fill;
pub use order::{Order, OrderSide};
pub use trade::Trade;
