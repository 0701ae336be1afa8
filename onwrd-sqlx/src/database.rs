//! 装配入口（Outboxing / OutboxedDatabase）
//!
//! `Outboxing` 汇总连接参数、运行配置、处理器注册表与额外的提交前钩子，
//! `connect` 完成全部装配：
//! 1. 校验配置并按名称选出活动处理器；
//! 2. 构建连接钩子（迁移 + 单次启动投递循环）；
//! 3. 在首个连接上直接触发钩子，迁移失败原样返回；
//! 4. 创建安装了钩子的连接池，得到 `OutboxedDatabase`。
//!
use crate::connection_hook::ConnectionHook;
use crate::interceptor::OutboxInterceptor;
use crate::migrations::MigrationAdapter;
use crate::startup::RelayStartup;
use crate::unit_of_work::{PreCommitHook, UnitOfWork};
use bon::Builder;
use onwrd_domain::config::OutboxConfig;
use onwrd_domain::error::OutboxResult;
use onwrd_domain::relay::ProcessorRegistry;
use onwrd_domain::run_once::RunOnce;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, Connection, SqlitePool};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

#[derive(Builder)]
pub struct Outboxing {
    options: SqliteConnectOptions,
    #[builder(default)]
    config: OutboxConfig,
    #[builder(default = ProcessorRegistry::with_defaults())]
    registry: ProcessorRegistry,
    /// 追加在 outbox 拦截器之后执行的提交前钩子
    #[builder(default)]
    hooks: Vec<Arc<dyn PreCommitHook>>,
    #[builder(default = 5)]
    max_connections: u32,
    /// 投递循环的启动守卫，默认为进程级共享实例：同一进程内无论装配多少次，
    /// 投递循环只启动一次。同一进程服务多个数据库文件时，应为每个数据库传入独立的守卫。
    #[builder(default = RunOnce::process_wide())]
    run_once: Arc<RunOnce>,
}

impl Outboxing {
    pub async fn connect(self) -> OutboxResult<OutboxedDatabase> {
        self.config.validate()?;
        let processor = self.registry.resolve(&self.config.processor)?;

        let wake = Arc::new(Notify::new());
        let relay = Arc::new(RelayStartup::new(
            self.options.clone(),
            self.config.clone(),
            processor,
            wake.clone(),
        ));
        let connection_hook = Arc::new(ConnectionHook::new(
            MigrationAdapter::new(),
            self.run_once.clone(),
            relay.clone(),
        ));

        let mut first = self.options.connect().await?;
        connection_hook.on_connect(&mut first).await?;
        first.close().await?;

        let pool = connection_hook
            .install(SqlitePoolOptions::new().max_connections(self.max_connections))
            .connect_with(self.options)
            .await?;

        let mut hooks: Vec<Arc<dyn PreCommitHook>> = vec![Arc::new(OutboxInterceptor)];
        hooks.extend(self.hooks);

        info!(
            processor = %self.config.processor,
            hooks = hooks.len(),
            relay_started = relay.is_running(),
            "outboxed database ready"
        );

        Ok(OutboxedDatabase {
            pool,
            hooks: Arc::new(hooks),
            relay,
            connection_hook,
            wake,
        })
    }
}

/// 装配完成的数据库：业务写入经由 `begin()` 获得的工作单元
pub struct OutboxedDatabase {
    pool: SqlitePool,
    hooks: Arc<Vec<Arc<dyn PreCommitHook>>>,
    relay: Arc<RelayStartup>,
    connection_hook: Arc<ConnectionHook>,
    wake: Arc<Notify>,
}

impl OutboxedDatabase {
    /// 开启一个工作单元（事务）
    pub async fn begin<'a>(&self) -> OutboxResult<UnitOfWork<'a>> {
        let tx = self.pool.begin().await?;
        Ok(UnitOfWork::new(tx, self.hooks.clone(), self.wake.clone()))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn relay(&self) -> &RelayStartup {
        &self.relay
    }

    pub fn connection_hook(&self) -> &ConnectionHook {
        &self.connection_hook
    }

    /// 提前唤醒投递循环
    pub fn wake_relay(&self) {
        self.wake.notify_one();
    }

    /// 在 outbox 迁移之后执行应用自身的迁移
    pub async fn migrate(&self, app: &Migrator) -> OutboxResult<()> {
        MigrationAdapter::new().migrate_with(&self.pool, app).await
    }

    /// 关闭投递循环与连接池；未投递的行保持待投递
    pub async fn shutdown(&self) {
        self.relay.stop().await;
        self.pool.close().await;
        info!("outboxed database closed");
    }
}
