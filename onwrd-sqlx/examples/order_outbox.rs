use onwrd_domain::config::OutboxConfig;
use onwrd_domain::event_raiser::EventRaiser;
use onwrd_domain::outbox::OutboxStatus;
use onwrd_domain::relay::ProcessorRegistry;
use onwrd_macros::{domain_event, event_raiser};
use onwrd_sqlx::{Outboxing, SqliteOutboxStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[domain_event(prefix = "order")]
enum OrderEvent {
    Placed { order_id: String, total: i64 },
    Shipped { order_id: String },
}

#[event_raiser(event = OrderEvent)]
#[derive(Debug, Default)]
struct Order {
    id: String,
    total: i64,
    shipped: bool,
}

impl Order {
    fn place(id: &str, total: i64) -> Self {
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

    fn ship(&mut self) {
        self.shipped = true;
        self.raise(OrderEvent::Shipped {
            order_id: self.id.clone(),
        });
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let dir = tempfile::tempdir()?;
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("orders.db"))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    // 配置可由 ONWRD_* 环境变量覆盖
    let config = OutboxConfig::from_env()?;
    let db = Outboxing::builder()
        .options(options)
        .config(config)
        .registry(ProcessorRegistry::with_defaults())
        .build()
        .connect()
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY, total INTEGER NOT NULL, shipped INTEGER NOT NULL
        )",
    )
    .execute(db.pool())
    .await?;

    // 下单并发货：业务写入与两条出站行在同一事务内提交
    let mut order = Order::place("order-1", 1200);
    order.ship();

    let mut uow = db.begin().await?;
    sqlx::query("INSERT INTO orders (id, total, shipped) VALUES (?, ?, ?)")
        .bind(&order.id)
        .bind(order.total)
        .bind(order.shipped)
        .execute(uow.conn())
        .await?;
    uow.track(&mut order);
    let written = uow.commit().await?;
    println!("committed order with {written} outbox rows");

    let store = SqliteOutboxStore::new(db.pool().clone());
    for _ in 0..50 {
        if store.count_by_status(OutboxStatus::Pending).await? == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    for message in store.messages().await? {
        println!(
            "#{} {} -> {}",
            message.id(),
            message.event_type(),
            message.status()
        );
    }

    db.shutdown().await;
    Ok(())
}
