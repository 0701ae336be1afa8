//! SQLite 出站存储（SqliteOutboxStore）
//!
//! - `insert_messages`：在调用方的事务连接上写入待投递行；
//! - `SqliteOutboxStore`：基于连接池实现 `OutboxStore`，认领通过条件更新完成，
//!   `rows_affected == 1` 视为认领成功，多进程共享同一数据库文件时同样成立；
//!   取批次时失败过的行排在从未尝试过的行之后。
//!
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onwrd_domain::error::{OutboxError, OutboxResult as Result};
use onwrd_domain::outbox::{NewOutboxMessage, OutboxMessage, OutboxStatus, OutboxStore};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::time::Duration;

/// 在给定连接（通常是事务）上按顺序写入出站行，返回分配的 id
pub async fn insert_messages(
    conn: &mut SqliteConnection,
    messages: &[NewOutboxMessage],
) -> std::result::Result<Vec<i64>, sqlx::Error> {
    let mut ids = Vec::with_capacity(messages.len());
    for m in messages {
        let id = sqlx::query(
            "INSERT INTO onwrd_outbox (event_type, payload, created_at, status)
             VALUES (?, ?, ?, 'pending')",
        )
        .bind(m.event_type())
        .bind(m.payload())
        .bind(m.created_at())
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        ids.push(id);
    }
    Ok(ids)
}

const SELECT_COLUMNS: &str = "SELECT id, event_type, payload, created_at, status, delivered_at, \
     claimed_by, claimed_until, attempts, last_error FROM onwrd_outbox";

#[derive(FromRow)]
struct OutboxRow {
    id: i64,
    event_type: String,
    payload: String,
    created_at: DateTime<Utc>,
    status: String,
    delivered_at: Option<DateTime<Utc>>,
    claimed_by: Option<String>,
    claimed_until: Option<i64>,
    attempts: i64,
    last_error: Option<String>,
}

impl TryFrom<OutboxRow> for OutboxMessage {
    type Error = OutboxError;

    fn try_from(row: OutboxRow) -> Result<Self> {
        let status: OutboxStatus = row.status.parse()?;
        Ok(OutboxMessage::builder()
            .id(row.id)
            .event_type(row.event_type)
            .payload(row.payload)
            .created_at(row.created_at)
            .status(status)
            .maybe_delivered_at(row.delivered_at)
            .maybe_claimed_by(row.claimed_by)
            .maybe_claimed_until(row.claimed_until.and_then(DateTime::<Utc>::from_timestamp_millis))
            .attempts(u32::try_from(row.attempts).unwrap_or(u32::MAX))
            .maybe_last_error(row.last_error)
            .build())
    }
}

#[derive(Debug, Clone)]
pub struct SqliteOutboxStore {
    pool: SqlitePool,
}

impl SqliteOutboxStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 按 id 升序返回全部行
    pub async fn messages(&self) -> Result<Vec<OutboxMessage>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY id ASC");
        sqlx::query_as::<_, OutboxRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(OutboxMessage::try_from)
            .collect()
    }

    pub async fn get(&self, id: i64) -> Result<Option<OutboxMessage>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        sqlx::query_as::<_, OutboxRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(OutboxMessage::try_from)
            .transpose()
    }

    pub async fn count_by_status(&self, status: OutboxStatus) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM onwrd_outbox WHERE status = ?")
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await?,
        )
    }
}

fn millis(lease: Duration) -> i64 {
    i64::try_from(lease.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl OutboxStore for SqliteOutboxStore {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxMessage>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE status = 'pending' \
             AND (claimed_until IS NULL OR claimed_until < ?) \
             ORDER BY attempts > 0, id ASC LIMIT ?"
        );
        sqlx::query_as::<_, OutboxRow>(&sql)
            .bind(Utc::now().timestamp_millis())
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(OutboxMessage::try_from)
            .collect()
    }

    async fn claim(&self, id: i64, claimant: &str, lease: Duration) -> Result<bool> {
        let now = Utc::now().timestamp_millis();
        let result = sqlx::query(
            "UPDATE onwrd_outbox SET claimed_by = ?, claimed_until = ?
             WHERE id = ? AND status = 'pending'
               AND (claimed_until IS NULL OR claimed_until < ?)",
        )
        .bind(claimant)
        .bind(now.saturating_add(millis(lease)))
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_delivered(&self, id: i64, claimant: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE onwrd_outbox
             SET status = 'delivered', delivered_at = ?, claimed_by = NULL, claimed_until = NULL
             WHERE id = ? AND status = 'pending' AND claimed_by = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(claimant)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, id: i64, claimant: &str, reason: &str) -> Result<()> {
        sqlx::query(
            "UPDATE onwrd_outbox
             SET claimed_by = NULL, claimed_until = NULL,
                 attempts = attempts + 1, last_error = ?
             WHERE id = ? AND status = 'pending' AND claimed_by = ?",
        )
        .bind(reason)
        .bind(id)
        .bind(claimant)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn release_claims(&self, claimant: &str, reason: &str) -> Result<usize> {
        let result = sqlx::query(
            "UPDATE onwrd_outbox
             SET claimed_by = NULL, claimed_until = NULL,
                 attempts = attempts + 1, last_error = ?
             WHERE status = 'pending' AND claimed_by = ?",
        )
        .bind(reason)
        .bind(claimant)
        .execute(&self.pool)
        .await?;
        Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
    }
}
