//! 连接钩子（ConnectionHook）
//!
//! 通过 `SqlitePoolOptions::after_connect` 在每个新连接上触发：
//! - 在该连接上执行 outbox 迁移，进程内首次成功后不再重复；
//! - 经 `RunOnce` 守卫启动投递循环，任意多次通知只启动一次。
//!
use crate::migrations::MigrationAdapter;
use crate::startup::RelayStartup;
use onwrd_domain::error::OutboxResult;
use onwrd_domain::run_once::RunOnce;
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

pub struct ConnectionHook {
    migrations: MigrationAdapter,
    run_once: Arc<RunOnce>,
    startup: Arc<RelayStartup>,
    schema_ready: AtomicBool,
    notifications: AtomicUsize,
}

impl ConnectionHook {
    pub fn new(
        migrations: MigrationAdapter,
        run_once: Arc<RunOnce>,
        startup: Arc<RelayStartup>,
    ) -> Self {
        Self {
            migrations,
            run_once,
            startup,
            schema_ready: AtomicBool::new(false),
            notifications: AtomicUsize::new(0),
        }
    }

    /// 新连接建立后的通知
    pub async fn on_connect(&self, conn: &mut SqliteConnection) -> OutboxResult<()> {
        let seen = self.notifications.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.schema_ready.load(Ordering::Acquire) {
            self.migrations.run(conn).await?;
            self.schema_ready.store(true, Ordering::Release);
        }

        let started = self.run_once.try_run(|| self.startup.start());
        debug!(notification = seen, relay_started = started, "connection opened");
        Ok(())
    }

    /// 收到的连接通知次数
    pub fn notifications(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }

    pub fn schema_ready(&self) -> bool {
        self.schema_ready.load(Ordering::Acquire)
    }

    /// 将钩子安装到连接池配置上；钩子错误以 `sqlx::Error::Configuration` 形式返回
    pub fn install(self: &Arc<Self>, options: SqlitePoolOptions) -> SqlitePoolOptions {
        let hook = self.clone();
        options.after_connect(move |conn, _meta| {
            let hook = hook.clone();
            Box::pin(async move {
                hook.on_connect(conn)
                    .await
                    .map_err(|e| sqlx::Error::Configuration(Box::new(e)))
            })
        })
    }
}
