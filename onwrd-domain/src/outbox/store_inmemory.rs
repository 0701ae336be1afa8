//! 内存版出站存储（InMemoryOutboxStore）
//!
//! 基于 `Mutex<Vec<OutboxMessage>>` 的 `OutboxStore` 实现，语义与数据库实现一致：
//! - `append` 分配单调递增的 id；
//! - 认领以租约表示，过期后可被其他认领方重新认领；
//! - 典型用途：测试环境与本地开发。
//!
use crate::error::{OutboxError, OutboxResult as Result};
use crate::outbox::{NewOutboxMessage, OutboxMessage, OutboxStore};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: Vec<OutboxMessage>,
}

#[derive(Default)]
pub struct InMemoryOutboxStore {
    inner: Mutex<Inner>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| OutboxError::store(format!("lock poisoned: {e}")))
    }

    /// 追加待投递行，返回分配的 id（保持输入顺序）
    pub fn append(&self, messages: &[NewOutboxMessage]) -> Result<Vec<i64>> {
        let mut inner = self.lock()?;
        let mut ids = Vec::with_capacity(messages.len());
        for m in messages {
            inner.next_id += 1;
            let id = inner.next_id;
            inner.rows.push(
                OutboxMessage::builder()
                    .id(id)
                    .event_type(m.event_type().to_string())
                    .payload(m.payload().to_string())
                    .created_at(m.created_at())
                    .build(),
            );
            ids.push(id);
        }
        Ok(ids)
    }

    /// 当前全部行的快照
    pub fn messages(&self) -> Result<Vec<OutboxMessage>> {
        Ok(self.lock()?.rows.clone())
    }

    pub fn get(&self, id: i64) -> Result<Option<OutboxMessage>> {
        Ok(self.lock()?.rows.iter().find(|m| m.id() == id).cloned())
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxMessage>> {
        let now = Utc::now();
        let inner = self.lock()?;
        let mut claimable: Vec<&OutboxMessage> =
            inner.rows.iter().filter(|m| m.is_claimable(now)).collect();
        claimable.sort_by_key(|m| (m.attempts() > 0, m.id()));
        Ok(claimable.into_iter().take(limit).cloned().collect())
    }

    async fn claim(&self, id: i64, claimant: &str, lease: Duration) -> Result<bool> {
        let now = Utc::now();
        // 超出时间范围的租约按最大时刻处理
        let until = TimeDelta::from_std(lease)
            .ok()
            .and_then(|lease| now.checked_add_signed(lease))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut inner = self.lock()?;
        match inner.rows.iter_mut().find(|m| m.id() == id) {
            Some(m) if m.is_claimable(now) => {
                m.set_claim(claimant, until);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_delivered(&self, id: i64, claimant: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        match inner.rows.iter_mut().find(|m| m.id() == id) {
            Some(m) if m.is_pending() && m.claimed_by() == Some(claimant) => {
                m.mark_delivered(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, id: i64, claimant: &str, reason: &str) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(m) = inner
            .rows
            .iter_mut()
            .find(|m| m.id() == id && m.claimed_by() == Some(claimant))
        {
            m.record_failure(reason);
        }
        Ok(())
    }

    async fn release_claims(&self, claimant: &str, reason: &str) -> Result<usize> {
        let mut inner = self.lock()?;
        let mut released = 0;
        for m in inner
            .rows
            .iter_mut()
            .filter(|m| m.is_pending() && m.claimed_by() == Some(claimant))
        {
            m.record_failure(reason);
            released += 1;
        }
        Ok(released)
    }
}
