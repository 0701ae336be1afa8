mod support;

use async_trait::async_trait;
use onwrd_domain::error::{OutboxError, OutboxResult};
use onwrd_domain::event_raiser::EventRaiser;
use onwrd_domain::relay::ProcessorRegistry;
use onwrd_sqlx::{CommitContext, Outboxing, PreCommitHook};
use std::sync::Arc;
use support::{
    Ledger, Order, Poison, RejectingProcessor, count, open_parked, options, outbox_rows,
    quiet_config,
};
use tempfile::TempDir;

async fn insert_order(conn: &mut sqlx::SqliteConnection, order: &Order) {
    sqlx::query("INSERT INTO orders (id, total) VALUES (?, ?)")
        .bind(&order.id)
        .bind(order.total)
        .execute(conn)
        .await
        .unwrap();
}

#[tokio::test]
async fn commit_writes_one_pending_row_per_event_in_raise_order() {
    let dir = TempDir::new().unwrap();
    let db = open_parked(&dir).await;

    let mut order = Order::place("o-1", 250);
    order.reserve("sku-1");
    order.reserve("sku-2");

    let mut uow = db.begin().await.unwrap();
    insert_order(uow.conn(), &order).await;
    uow.track(&mut order);
    assert_eq!(uow.commit().await.unwrap(), 3);

    assert!(order.pending_events().is_empty());
    let rows = outbox_rows(db.pool()).await;
    let types: Vec<&str> = rows.iter().map(|(_, t, _)| t.as_str()).collect();
    assert_eq!(
        types,
        vec!["OrderPlaced", "InventoryReserved", "InventoryReserved"]
    );
    assert!(rows.iter().all(|(_, _, status)| status == "pending"));
    assert!(rows.windows(2).all(|w| w[0].0 < w[1].0));

    let payload: String = sqlx::query_scalar("SELECT payload FROM onwrd_outbox ORDER BY id LIMIT 1")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&payload).unwrap(),
        serde_json::json!({"Placed": {"order_id": "o-1", "total": 250}})
    );

    db.shutdown().await;
}

#[tokio::test]
async fn cross_aggregate_order_follows_track_order() {
    let dir = TempDir::new().unwrap();
    let db = open_parked(&dir).await;

    let mut first = Order::place("o-1", 10);
    let mut second = Order::place("o-2", 20);
    second.reserve("sku-9");

    let mut uow = db.begin().await.unwrap();
    uow.track(&mut second).track(&mut first);
    assert_eq!(uow.tracked(), 2);
    assert_eq!(uow.commit().await.unwrap(), 3);

    let payloads: Vec<String> = sqlx::query_scalar("SELECT payload FROM onwrd_outbox ORDER BY id")
        .fetch_all(db.pool())
        .await
        .unwrap();
    assert!(payloads[0].contains("o-2"));
    assert!(payloads[1].contains("sku-9"));
    assert!(payloads[2].contains("o-1"));

    db.shutdown().await;
}

#[tokio::test]
async fn rollback_persists_nothing_and_keeps_events() {
    let dir = TempDir::new().unwrap();
    let db = open_parked(&dir).await;

    let mut order = Order::place("o-1", 250);
    let mut uow = db.begin().await.unwrap();
    insert_order(uow.conn(), &order).await;
    uow.track(&mut order);
    uow.rollback().await.unwrap();

    assert_eq!(count(db.pool(), "SELECT COUNT(*) FROM orders").await, 0);
    assert_eq!(count(db.pool(), "SELECT COUNT(*) FROM onwrd_outbox").await, 0);
    assert_eq!(order.pending_events().len(), 1);

    db.shutdown().await;
}

#[tokio::test]
async fn empty_buffer_commits_without_outbox_write() {
    let dir = TempDir::new().unwrap();
    let db = open_parked(&dir).await;

    let mut order = Order::place("o-1", 250);
    let _ = order.drain_events();

    let mut uow = db.begin().await.unwrap();
    insert_order(uow.conn(), &order).await;
    uow.track(&mut order);
    assert_eq!(uow.commit().await.unwrap(), 0);

    assert_eq!(count(db.pool(), "SELECT COUNT(*) FROM orders").await, 1);
    assert_eq!(count(db.pool(), "SELECT COUNT(*) FROM onwrd_outbox").await, 0);

    db.shutdown().await;
}

#[tokio::test]
async fn serialization_failure_rolls_back_business_change() {
    let dir = TempDir::new().unwrap();
    let db = open_parked(&dir).await;

    let mut order = Order::place("o-1", 250);
    let mut ledger = Ledger::default();
    ledger.raise(Poison);

    let mut uow = db.begin().await.unwrap();
    insert_order(uow.conn(), &order).await;
    uow.track(&mut order).track(&mut ledger);

    match uow.commit().await {
        Err(OutboxError::Extraction { event_type, reason }) => {
            assert_eq!(event_type, "Poison");
            assert!(reason.contains("poisoned payload"));
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(count(db.pool(), "SELECT COUNT(*) FROM orders").await, 0);
    assert_eq!(count(db.pool(), "SELECT COUNT(*) FROM onwrd_outbox").await, 0);

    db.shutdown().await;
}

#[tokio::test]
async fn persistence_failure_rolls_back_business_change() {
    let dir = TempDir::new().unwrap();
    let db = open_parked(&dir).await;

    sqlx::query(
        "CREATE TRIGGER reject_outbox BEFORE INSERT ON onwrd_outbox
         BEGIN SELECT RAISE(ABORT, 'outbox rejected'); END;",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let mut order = Order::place("o-1", 250);
    let mut uow = db.begin().await.unwrap();
    insert_order(uow.conn(), &order).await;
    uow.track(&mut order);

    match uow.commit().await {
        Err(OutboxError::Persistence { reason }) => assert!(reason.contains("outbox rejected")),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(count(db.pool(), "SELECT COUNT(*) FROM orders").await, 0);

    db.shutdown().await;
}

// 记录提交时事务内可见的出站行数
struct AuditHook;

#[async_trait]
impl PreCommitHook for AuditHook {
    fn name(&self) -> &str {
        "audit"
    }

    async fn before_commit(&self, ctx: &mut CommitContext<'_, '_>) -> OutboxResult<()> {
        let staged: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM onwrd_outbox")
            .fetch_one(&mut *ctx.conn())
            .await?;
        sqlx::query("INSERT INTO audit (staged) VALUES (?)")
            .bind(staged)
            .execute(&mut *ctx.conn())
            .await?;
        Ok(())
    }
}

struct VetoHook;

#[async_trait]
impl PreCommitHook for VetoHook {
    fn name(&self) -> &str {
        "veto"
    }

    async fn before_commit(&self, _ctx: &mut CommitContext<'_, '_>) -> OutboxResult<()> {
        Err(OutboxError::Persistence {
            reason: "vetoed".into(),
        })
    }
}

#[tokio::test]
async fn extra_hooks_run_after_interceptor_in_same_transaction() {
    let dir = TempDir::new().unwrap();
    let db = Outboxing::builder()
        .options(options(&dir))
        .run_once(support::own_guard())
        .config(quiet_config("reject"))
        .registry(ProcessorRegistry::new().register(Arc::new(RejectingProcessor)))
        .hooks(vec![Arc::new(AuditHook) as Arc<dyn PreCommitHook>])
        .build()
        .connect()
        .await
        .unwrap();
    sqlx::query("CREATE TABLE audit (staged INTEGER NOT NULL)")
        .execute(db.pool())
        .await
        .unwrap();

    let mut order = Order::place("o-1", 5);
    order.reserve("sku-1");
    let mut uow = db.begin().await.unwrap();
    uow.track(&mut order);
    uow.commit().await.unwrap();

    let staged: i64 = sqlx::query_scalar("SELECT staged FROM audit")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(staged, 2);

    db.shutdown().await;
}

#[tokio::test]
async fn failing_hook_rolls_back_outbox_rows() {
    let dir = TempDir::new().unwrap();
    let db = Outboxing::builder()
        .options(options(&dir))
        .run_once(support::own_guard())
        .config(quiet_config("reject"))
        .registry(ProcessorRegistry::new().register(Arc::new(RejectingProcessor)))
        .hooks(vec![Arc::new(VetoHook) as Arc<dyn PreCommitHook>])
        .build()
        .connect()
        .await
        .unwrap();

    let mut order = Order::place("o-1", 5);
    let mut uow = db.begin().await.unwrap();
    uow.track(&mut order);
    assert!(matches!(
        uow.commit().await,
        Err(OutboxError::Persistence { .. })
    ));
    assert_eq!(count(db.pool(), "SELECT COUNT(*) FROM onwrd_outbox").await, 0);

    db.shutdown().await;
}
