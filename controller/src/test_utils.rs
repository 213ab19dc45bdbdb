use crate::{
    algorithm::{Algorithm, AlgorithmBase, AlgorithmError, AlgorithmRegistry, Result, TickOutput},
    sink::TradeSink,
    strategy::Context,
};
use async_trait::async_trait;
use db::{DBError, PortfolioSnapshot, Trade, TradeLeg};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const RECORDING_MODULE: &str = "tests.recording";
pub const RECORDING_ENTRY: &str = "Recorder";

// 记录生命周期调用顺序，并按需注入失败
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
    pub fail_initialize: Arc<AtomicU32>,
    pub fail_run: Arc<AtomicBool>,
    pub panic_run: Arc<AtomicBool>,
    pub fail_close: Arc<AtomicBool>,
    pub run_delay_ms: Arc<AtomicU64>,
    pub emit_trade: Arc<AtomicBool>,
    pub instances: Arc<AtomicU32>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn registry(&self) -> AlgorithmRegistry {
        let mut registry = AlgorithmRegistry::new();
        let recorder = self.clone();
        registry.register_algorithm(RECORDING_MODULE, RECORDING_ENTRY, move |base| {
            RecordingAlgorithm::new(base, recorder.clone())
        });
        registry
    }
}

pub struct RecordingAlgorithm {
    base: AlgorithmBase,
    recorder: Recorder,
}

impl RecordingAlgorithm {
    pub fn new(base: AlgorithmBase, recorder: Recorder) -> Self {
        recorder.instances.fetch_add(1, Ordering::SeqCst);
        Self { base, recorder }
    }
}

#[async_trait]
impl Algorithm for RecordingAlgorithm {
    fn name(&self) -> &str {
        "recording"
    }

    fn base(&self) -> &AlgorithmBase {
        &self.base
    }

    async fn initialize(&mut self) -> Result<()> {
        self.recorder.push("initialize");
        let remaining = self.recorder.fail_initialize.load(Ordering::SeqCst);
        if remaining > 0 {
            self.recorder
                .fail_initialize
                .store(remaining - 1, Ordering::SeqCst);
            return Err(AlgorithmError::failed("initialize refused"));
        }
        Ok(())
    }

    async fn before_tick(&mut self, context: &Context) -> Result<()> {
        self.recorder.push(format!("before_tick:{}", context.tick));
        Ok(())
    }

    async fn run(&mut self, context: &Context) -> Result<TickOutput> {
        self.recorder.push(format!("run:{}", context.tick));
        let delay = self.recorder.run_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.recorder.panic_run.load(Ordering::SeqCst) {
            panic!("run exploded");
        }
        if self.recorder.fail_run.load(Ordering::SeqCst) {
            return Err(AlgorithmError::failed("run refused"));
        }
        let output = TickOutput::new(json!({"tick": context.tick}));
        if self.recorder.emit_trade.load(Ordering::SeqCst) {
            let trade = Trade::new(
                self.base.strategy_id(),
                1_700_000_000_000 + context.tick as i64,
                vec![TradeLeg {
                    symbol: "AAPL".to_string(),
                    qty: 1.0,
                    price: Some(10.0),
                }],
            );
            let snapshot = PortfolioSnapshot {
                timestamp_ms: trade.timestamp_ms,
                strategy_id: Some(trade.strategy_id.clone()),
                total_value: 100.0,
                total_cash: 90.0,
                total_positions: 1,
            };
            return Ok(output.with_trade(trade).with_portfolio(snapshot));
        }
        Ok(output)
    }

    async fn after_tick(&mut self, context: &Context, _output: &TickOutput) -> Result<()> {
        self.recorder.push(format!("after_tick:{}", context.tick));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.recorder.push("close");
        if self.recorder.fail_close.load(Ordering::SeqCst) {
            return Err(AlgorithmError::failed("close refused"));
        }
        Ok(())
    }
}

// 内存中的交易落地，可模拟写入失败
#[derive(Default)]
pub struct MemoryTradeSink {
    pub trades: Mutex<Vec<Trade>>,
    pub snapshots: Mutex<Vec<PortfolioSnapshot>>,
    pub fail: AtomicBool,
}

impl MemoryTradeSink {
    pub fn trades(&self) -> Vec<Trade> {
        self.trades.lock().unwrap().clone()
    }

    pub fn snapshots(&self) -> Vec<PortfolioSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl TradeSink for MemoryTradeSink {
    fn append_trade(&self, trade: &Trade) -> db::Result<usize> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DBError::ConnectionError {
                message: "sink offline".to_string(),
            });
        }
        self.trades.lock().unwrap().push(trade.clone());
        Ok(trade.active_legs().count())
    }

    fn append_portfolio_snapshot(&self, snapshot: &PortfolioSnapshot) -> db::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DBError::ConnectionError {
                message: "sink offline".to_string(),
            });
        }
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

/// mock服务器收到的一次请求
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
    pub delay: Duration,
}

impl MockResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

// 模拟HTTP服务器，每个连接只处理一个请求
pub struct MockHttpServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl MockHttpServer {
    pub async fn start(response: MockResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let response = response.clone();
                tokio::spawn(async move {
                    if let Err(e) = Self::handle_connection(stream, recorded, response).await {
                        eprintln!("Connection handling error: {}", e);
                    }
                });
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    async fn handle_connection(
        mut stream: TcpStream,
        recorded: Arc<Mutex<Vec<RecordedRequest>>>,
        response: MockResponse,
    ) -> std::io::Result<()> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let target = parts.next().unwrap_or_default().to_string();
        let headers: HashMap<String, String> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
            .collect();

        let content_length = headers
            .get("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

        recorded.lock().unwrap().push(RecordedRequest {
            method,
            target,
            headers,
            body,
        });

        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }

        let reason = match response.status {
            200 => "OK",
            201 => "Created",
            404 => "Not Found",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Unknown",
        };
        let raw = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            response.status,
            reason,
            response.content_type,
            response.body.len(),
            response.body
        );
        stream.write_all(raw.as_bytes()).await?;
        stream.shutdown().await
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
