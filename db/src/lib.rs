pub mod errors;
pub mod models;
pub mod sqlite;
pub mod trade_store;

pub use errors::{DBError, Result};
pub use models::{PortfolioSnapshot, Side, Trade, TradeLeg, TradeRow};
pub use sqlite::SQLiteDB;
pub use trade_store::TradeStore;

#[cfg(test)]
mod trade_store_test;
