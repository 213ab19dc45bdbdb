use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 取消信号的只读视图，分发给所有策略循环和算法实例
#[derive(Clone)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    /// 不会被触发的信号，用于单次调度
    pub fn never() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// 可中断的定时等待，被取消时返回true
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }
}

/// 持有取消信号的唯一写入方
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    triggered: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            token: self.token.clone(),
        }
    }

    /// 只有第一次调用生效，返回是否由本次调用触发
    pub fn trigger(&self, reason: &str) -> bool {
        if self.triggered.swap(true, Ordering::SeqCst) {
            debug!("shutdown already requested, ignoring: {}", reason);
            return false;
        }
        info!("shutdown requested: {}", reason);
        self.token.cancel();
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        self.token.cancelled().await
    }

    /// 监听SIGINT/SIGTERM；不支持信号的平台只能依赖外部终止进程
    pub fn install_signal_handlers(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = listen(coordinator).await {
                warn!(
                    "failed to install signal handlers: {}, relying on external termination",
                    e
                );
            }
        })
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn listen(coordinator: ShutdownCoordinator) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    loop {
        let name = tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        };
        coordinator.trigger(name);
    }
}

#[cfg(not(unix))]
async fn listen(coordinator: ShutdownCoordinator) -> std::io::Result<()> {
    loop {
        tokio::signal::ctrl_c().await?;
        coordinator.trigger("ctrl-c");
    }
}
