use crate::{
    errors::Result,
    models::{PortfolioSnapshot, Side, Trade, TradeRow},
    sqlite::SQLiteDB,
};
use log::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trade_id INTEGER NOT NULL,
    timestamp_ms INTEGER NOT NULL,
    strategy_id TEXT NOT NULL,
    symbol TEXT NOT NULL,
    side TEXT NOT NULL,
    quantity REAL NOT NULL,
    price REAL
);
CREATE INDEX IF NOT EXISTS idx_trades_strategy ON trades (strategy_id, timestamp_ms);
CREATE TABLE IF NOT EXISTS portfolio_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp_ms INTEGER NOT NULL,
    strategy_id TEXT,
    total_value REAL NOT NULL,
    total_cash REAL NOT NULL,
    total_positions INTEGER NOT NULL
);
";

/// 交易与组合快照的落库
#[derive(Clone)]
pub struct TradeStore {
    db: SQLiteDB,
}

impl TradeStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let db = SQLiteDB::new(db_path)?;
        db.execute_batch(SCHEMA)?;
        Ok(Self { db })
    }

    /// 每条非零腿写一行，买卖方向由数量符号决定；没有非零腿的交易直接忽略。
    /// 返回写入的行数
    pub fn append_trade(&self, trade: &Trade) -> Result<usize> {
        if !trade.has_activity() {
            debug!("trade {} has no active legs, skipped", trade.trade_id);
            return Ok(0);
        }
        self.db.with_transaction(|tx| {
            let mut written = 0;
            for leg in trade.active_legs() {
                tx.execute(
                    "INSERT INTO trades
                        (trade_id, timestamp_ms, strategy_id, symbol, side, quantity, price)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![
                        trade.trade_id,
                        trade.timestamp_ms,
                        trade.strategy_id,
                        leg.symbol,
                        Side::from_qty(leg.qty).as_str(),
                        leg.qty,
                        leg.price,
                    ],
                )?;
                written += 1;
            }
            Ok(written)
        })
    }

    pub fn append_portfolio_snapshot(&self, snapshot: &PortfolioSnapshot) -> Result<()> {
        self.db.execute_update(
            "INSERT INTO portfolio_history
                (timestamp_ms, strategy_id, total_value, total_cash, total_positions)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            &[
                &snapshot.timestamp_ms,
                &snapshot.strategy_id,
                &snapshot.total_value,
                &snapshot.total_cash,
                &snapshot.total_positions,
            ],
        )?;
        Ok(())
    }

    pub fn trades_for(&self, strategy_id: &str) -> Result<Vec<TradeRow>> {
        self.db.query_map(
            "SELECT trade_id, timestamp_ms, strategy_id, symbol, side, quantity, price
             FROM trades WHERE strategy_id = ?1 ORDER BY id",
            &[&strategy_id],
            |row| {
                Ok(TradeRow {
                    trade_id: row.get(0)?,
                    timestamp_ms: row.get(1)?,
                    strategy_id: row.get(2)?,
                    symbol: row.get(3)?,
                    side: row.get(4)?,
                    quantity: row.get(5)?,
                    price: row.get(6)?,
                })
            },
        )
    }

    pub fn portfolio_snapshots(&self) -> Result<Vec<PortfolioSnapshot>> {
        self.db.query_map(
            "SELECT timestamp_ms, strategy_id, total_value, total_cash, total_positions
             FROM portfolio_history ORDER BY id",
            &[],
            |row| {
                Ok(PortfolioSnapshot {
                    timestamp_ms: row.get(0)?,
                    strategy_id: row.get(1)?,
                    total_value: row.get(2)?,
                    total_cash: row.get(3)?,
                    total_positions: row.get(4)?,
                })
            },
        )
    }
}
