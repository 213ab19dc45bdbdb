use crate::{
    algorithm::{
        registry::AlgorithmRegistry,
        traits::{Algorithm, AlgorithmBase, AlgorithmError, Result, TickOutput},
    },
    strategy::{Context, Params},
};
use async_trait::async_trait;
use db::{Trade, TradeLeg};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde_json::{json, Map, Value};

pub const DUMMY_TEST_MODULE: &str = "algorithms.dummy_test";
pub const DUMMY_TEST_ENTRY: &str = "DummyTest";
pub const HEARTBEAT_MODULE: &str = "algorithms.heartbeat";
pub const HEARTBEAT_ENTRY: &str = "ping";

const SYMBOLS: [&str; 4] = ["AAPL", "TSLA", "NVDA", "MSFT"];

pub fn register_builtins(registry: &mut AlgorithmRegistry) {
    registry
        .register_algorithm(DUMMY_TEST_MODULE, DUMMY_TEST_ENTRY, DummyTest::new)
        .register_fn(HEARTBEAT_MODULE, HEARTBEAT_ENTRY, heartbeat);
}

fn heartbeat(context: &Context) -> Result<Value> {
    Ok(json!({
        "strategy_id": context.strategy_id,
        "tick": context.tick,
        "scheduled_at": context.now_rfc3339(),
        "served_at": time::now_rfc3339(),
    }))
}

/// 随机买卖决策，用于联调调度链路
pub struct DummyTest {
    base: AlgorithmBase,
    ticks: u64,
    trades: u64,
}

impl DummyTest {
    pub fn new(base: AlgorithmBase) -> Self {
        Self {
            base,
            ticks: 0,
            trades: 0,
        }
    }

    fn defaults() -> Params {
        let mut defaults = Params::new();
        defaults.insert("trade_probability".to_string(), json!(0.3));
        defaults.insert("max_qty".to_string(), json!(2.0));
        defaults
    }
}

// ThreadRng不能跨await持有
fn draw(trade_probability: f64, max_qty: f64) -> (String, f64) {
    let mut rng = rand::rng();
    let symbol = SYMBOLS.choose(&mut rng).copied().unwrap_or(SYMBOLS[0]);
    let qty = if max_qty.is_finite() && max_qty > 0.0 && rng.random::<f64>() < trade_probability {
        rng.random_range(-max_qty..=max_qty)
    } else {
        0.0
    };
    (symbol.to_string(), qty)
}

#[async_trait]
impl Algorithm for DummyTest {
    fn name(&self) -> &str {
        "dummy_test"
    }

    fn base(&self) -> &AlgorithmBase {
        &self.base
    }

    async fn run(&mut self, context: &Context) -> Result<TickOutput> {
        if self.is_cancelled() {
            return Err(AlgorithmError::Cancelled);
        }
        let params = self.base.merged_params(&Self::defaults(), context);
        let probability = params
            .get("trade_probability")
            .and_then(Value::as_f64)
            .unwrap_or(0.3);
        let max_qty = params.get("max_qty").and_then(Value::as_f64).unwrap_or(2.0);

        let (symbol, qty) = draw(probability, max_qty);
        self.ticks += 1;

        let trade = Trade::new(
            self.base.strategy_id(),
            time::get_current_milli_timestamp(),
            vec![TradeLeg {
                symbol: symbol.clone(),
                qty,
                price: None,
            }],
        )
        .with_trade_id(time::get_current_nano_timestamp() / 1000);
        let output = TickOutput::new(json!({"symbol": symbol, "qty": qty, "tick": context.tick}));
        if trade.has_activity() {
            self.trades += 1;
            Ok(output.with_trade(trade))
        } else {
            Ok(output)
        }
    }

    fn diagnostics(&self) -> Map<String, Value> {
        let mut meta = self.base.meta(self.name(), self.version());
        meta.insert("ticks".to_string(), json!(self.ticks));
        meta.insert("trades".to_string(), json!(self.trades));
        meta
    }
}
