use db::{PortfolioSnapshot, Trade, TradeStore};
use log::info;

/// 交易与组合快照的落地方，调用发生在阻塞线程池中
pub trait TradeSink: Send + Sync {
    fn append_trade(&self, trade: &Trade) -> db::Result<usize>;

    fn append_portfolio_snapshot(&self, snapshot: &PortfolioSnapshot) -> db::Result<()>;
}

impl TradeSink for TradeStore {
    fn append_trade(&self, trade: &Trade) -> db::Result<usize> {
        TradeStore::append_trade(self, trade)
    }

    fn append_portfolio_snapshot(&self, snapshot: &PortfolioSnapshot) -> db::Result<()> {
        TradeStore::append_portfolio_snapshot(self, snapshot)
    }
}

/// 未配置数据库时只打日志
#[derive(Debug, Default)]
pub struct LogTradeSink;

impl TradeSink for LogTradeSink {
    fn append_trade(&self, trade: &Trade) -> db::Result<usize> {
        let mut count = 0;
        for leg in trade.active_legs() {
            info!(
                "[{}] trade {} {} {} qty={} price={:?}",
                trade.strategy_id,
                trade.trade_id,
                db::Side::from_qty(leg.qty).as_str(),
                leg.symbol,
                leg.qty.abs(),
                leg.price
            );
            count += 1;
        }
        Ok(count)
    }

    fn append_portfolio_snapshot(&self, snapshot: &PortfolioSnapshot) -> db::Result<()> {
        info!(
            "[{}] portfolio value={} cash={} positions={}",
            snapshot.strategy_id.as_deref().unwrap_or("-"),
            snapshot.total_value,
            snapshot.total_cash,
            snapshot.total_positions
        );
        Ok(())
    }
}
