use serde::{Deserialize, Serialize};

/// 数量绝对值低于此阈值的腿视为未成交
pub const QTY_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn from_qty(qty: f64) -> Self {
        if qty > 0.0 { Side::Buy } else { Side::Sell }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeLeg {
    pub symbol: String,
    pub qty: f64, // 正数买入，负数卖出
    pub price: Option<f64>,
}

/// 策略单次tick产出的交易决策
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub trade_id: i64,
    pub strategy_id: String,
    pub timestamp_ms: i64,
    pub legs: Vec<TradeLeg>,
}

impl Trade {
    /// trade_id默认取微秒时间戳
    pub fn new(strategy_id: impl Into<String>, timestamp_ms: i64, legs: Vec<TradeLeg>) -> Self {
        Self {
            trade_id: timestamp_ms.saturating_mul(1000),
            strategy_id: strategy_id.into(),
            timestamp_ms,
            legs,
        }
    }

    pub fn with_trade_id(mut self, trade_id: i64) -> Self {
        self.trade_id = trade_id;
        self
    }

    pub fn active_legs(&self) -> impl Iterator<Item = &TradeLeg> {
        self.legs.iter().filter(|leg| leg.qty.abs() > QTY_EPSILON)
    }

    pub fn has_activity(&self) -> bool {
        self.active_legs().next().is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSnapshot {
    pub timestamp_ms: i64,
    pub strategy_id: Option<String>,
    pub total_value: f64,
    pub total_cash: f64,
    pub total_positions: i64,
}

/// trades表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRow {
    pub trade_id: i64,
    pub timestamp_ms: i64,
    pub strategy_id: String,
    pub symbol: String,
    pub side: String,
    pub quantity: f64,
    pub price: Option<f64>,
}
