#![allow(dead_code)]

use async_trait::async_trait;
use onwrd_domain::config::OutboxConfig;
use onwrd_domain::domain_event::DomainEvent;
use onwrd_domain::event_raiser::EventRaiser;
use onwrd_domain::outbox::OutboundEvent;
use onwrd_domain::relay::{OnwardProcessor, ProcessorRegistry};
use onwrd_domain::run_once::RunOnce;
use onwrd_macros::{domain_event, event_raiser};
use onwrd_sqlx::{OutboxedDatabase, Outboxing};
use serde::{Serialize, Serializer};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[domain_event]
pub enum OrderEvent {
    #[event(event_type = "OrderPlaced")]
    Placed { order_id: String, total: i64 },
    #[event(event_type = "InventoryReserved")]
    Reserved { order_id: String, sku: String },
}

#[event_raiser(event = OrderEvent)]
#[derive(Debug, Default)]
pub struct Order {
    pub id: String,
    pub total: i64,
    pub reserved: Vec<String>,
}

impl Order {
    pub fn place(id: &str, total: i64) -> Self {
        let mut order = Order {
            id: id.to_string(),
            total,
            ..Default::default()
        };
        order.raise(OrderEvent::Placed {
            order_id: id.to_string(),
            total,
        });
        order
    }

    pub fn reserve(&mut self, sku: &str) {
        self.reserved.push(sku.to_string());
        self.raise(OrderEvent::Reserved {
            order_id: self.id.clone(),
            sku: sku.to_string(),
        });
    }
}

/// 序列化必定失败的事件
pub struct Poison;

impl Serialize for Poison {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("poisoned payload"))
    }
}

impl DomainEvent for Poison {
    fn event_type(&self) -> &str {
        "Poison"
    }
}

#[event_raiser(event = Poison)]
#[derive(Default)]
pub struct Ledger {
    pub entries: u32,
}

/// 总是失败的处理器，使出站行保持 pending
pub struct RejectingProcessor;

#[async_trait]
impl OnwardProcessor for RejectingProcessor {
    fn name(&self) -> &str {
        "reject"
    }

    async fn deliver(&self, _event: &OutboundEvent) -> anyhow::Result<()> {
        anyhow::bail!("downstream unavailable")
    }
}

pub fn options(dir: &TempDir) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(dir.path().join("app.db"))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
}

/// 测试共用一个进程，每个数据库使用独立的启动守卫
pub fn own_guard() -> Arc<RunOnce> {
    Arc::new(RunOnce::new())
}

pub fn quiet_config(processor: &str) -> OutboxConfig {
    OutboxConfig {
        processor: processor.to_string(),
        poll_interval: Duration::from_secs(3600),
        ..Default::default()
    }
}

/// 使用总是失败的处理器打开数据库（出站行不会被投递）
pub async fn open_parked(dir: &TempDir) -> OutboxedDatabase {
    let db = Outboxing::builder()
        .options(options(dir))
        .run_once(own_guard())
        .config(quiet_config("reject"))
        .registry(ProcessorRegistry::new().register(Arc::new(RejectingProcessor)))
        .build()
        .connect()
        .await
        .unwrap();
    create_orders_table(db.pool()).await;
    db
}

pub async fn create_orders_table(pool: &SqlitePool) {
    sqlx::query("CREATE TABLE IF NOT EXISTS orders (id TEXT PRIMARY KEY, total INTEGER NOT NULL)")
        .execute(pool)
        .await
        .unwrap();
}

pub async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

/// (id, event_type, status) 按 id 升序
pub async fn outbox_rows(pool: &SqlitePool) -> Vec<(i64, String, String)> {
    sqlx::query_as("SELECT id, event_type, status FROM onwrd_outbox ORDER BY id")
        .fetch_all(pool)
        .await
        .unwrap()
}

/// 轮询直到条件成立，超时则失败
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..250 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}
