#[cfg(test)]
mod tests {
    use crate::{PortfolioSnapshot, Trade, TradeLeg, TradeStore};

    fn leg(symbol: &str, qty: f64, price: Option<f64>) -> TradeLeg {
        TradeLeg {
            symbol: symbol.to_string(),
            qty,
            price,
        }
    }

    fn open_store() -> (tempfile::TempDir, TradeStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.db");
        let store = TradeStore::open(path.to_str().unwrap()).expect("Failed to open store");
        (dir, store)
    }

    #[test]
    fn test_schema_created() {
        let (dir, _store) = open_store();
        let db = crate::SQLiteDB::new(dir.path().join("trades.db").to_str().unwrap()).unwrap();
        assert!(db.table_exists("trades").unwrap());
        assert!(db.table_exists("portfolio_history").unwrap());
        assert!(!db.table_exists("orders").unwrap());
    }

    #[test]
    fn test_append_trade_writes_active_legs() {
        let (_dir, store) = open_store();
        let trade = Trade::new(
            "pairs",
            1_700_000_000_000,
            vec![
                leg("AAPL", 2.0, Some(190.5)),
                leg("MSFT", -1.5, None),
                leg("NVDA", 0.0, Some(10.0)),
            ],
        );

        let written = store.append_trade(&trade).unwrap();
        assert_eq!(written, 2);

        let rows = store.trades_for("pairs").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "AAPL");
        assert_eq!(rows[0].side, "BUY");
        assert_eq!(rows[0].price, Some(190.5));
        assert_eq!(rows[0].trade_id, 1_700_000_000_000_000);
        assert_eq!(rows[1].symbol, "MSFT");
        assert_eq!(rows[1].side, "SELL");
        assert_eq!(rows[1].price, None);
    }

    #[test]
    fn test_append_trade_without_activity_is_ignored() {
        let (_dir, store) = open_store();
        let trade = Trade::new("idle", 1, vec![leg("AAPL", 0.0, None)]);

        assert_eq!(store.append_trade(&trade).unwrap(), 0);
        assert!(store.trades_for("idle").unwrap().is_empty());
    }

    #[test]
    fn test_trades_filtered_by_strategy() {
        let (_dir, store) = open_store();
        store
            .append_trade(&Trade::new("a", 1, vec![leg("AAPL", 1.0, None)]))
            .unwrap();
        store
            .append_trade(&Trade::new("b", 2, vec![leg("TSLA", -1.0, None)]).with_trade_id(42))
            .unwrap();

        let rows = store.trades_for("b").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trade_id, 42);
        assert_eq!(rows[0].symbol, "TSLA");
    }

    #[test]
    fn test_append_portfolio_snapshot() {
        let (_dir, store) = open_store();
        let snapshot = PortfolioSnapshot {
            timestamp_ms: 1_700_000_000_000,
            strategy_id: Some("pairs".to_string()),
            total_value: 10_500.0,
            total_cash: 500.0,
            total_positions: 3,
        };

        store.append_portfolio_snapshot(&snapshot).unwrap();

        let snapshots = store.portfolio_snapshots().unwrap();
        assert_eq!(snapshots, vec![snapshot]);
    }
}
