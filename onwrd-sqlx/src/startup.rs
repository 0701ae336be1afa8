//! 投递循环启动（RelayStartup）
//!
//! 由连接钩子在首个连接建立时触发一次：
//! - 使用独立的连接池（不安装任何钩子）访问 outbox；
//! - 以选定的处理器构建 `DrainLoop` 并启动，保存其运行句柄。
//!
use crate::store::SqliteOutboxStore;
use onwrd_domain::config::OutboxConfig;
use onwrd_domain::relay::{DrainHandle, DrainLoop, OnwardProcessor};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::Notify;
use tracing::{info, warn};

pub struct RelayStartup {
    options: SqliteConnectOptions,
    config: OutboxConfig,
    processor: Arc<dyn OnwardProcessor>,
    wake: Arc<Notify>,
    handle: OnceLock<DrainHandle>,
    launches: AtomicUsize,
}

impl RelayStartup {
    pub fn new(
        options: SqliteConnectOptions,
        config: OutboxConfig,
        processor: Arc<dyn OnwardProcessor>,
        wake: Arc<Notify>,
    ) -> Self {
        Self {
            options,
            config,
            processor,
            wake,
            handle: OnceLock::new(),
            launches: AtomicUsize::new(0),
        }
    }

    /// 构建并启动投递循环；需在 tokio 运行时内调用
    pub fn start(&self) {
        self.launches.fetch_add(1, Ordering::SeqCst);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_lazy_with(self.options.clone());
        let relay = Arc::new(
            DrainLoop::builder()
                .store(Arc::new(SqliteOutboxStore::new(pool)))
                .processor(self.processor.clone())
                .config(self.config.clone())
                .wake(self.wake.clone())
                .build(),
        );

        info!(
            claimant = relay.claimant(),
            processor = self.processor.name(),
            "starting outbox relay"
        );

        if self.handle.set(relay.start()).is_err() {
            // 被拒绝的句柄在 drop 时即取消对应任务
            warn!("outbox relay already running, discarding duplicate");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.get().is_some_and(|h| !h.is_shutdown())
    }

    /// `start` 被调用的次数
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// 关闭投递循环并等待其结束
    pub async fn stop(&self) {
        if let Some(handle) = self.handle.get() {
            handle.stop().await;
        }
    }
}
