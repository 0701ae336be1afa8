//! 出站消息持久化模型（OutboxMessage）
//!
//! 定义 outbox 表中一行的标准形态与投递状态：
//! - 稳定列：`id`、`event_type`、`payload`、`created_at`、`status`、`delivered_at`；
//! - 附加的认领/重试记录：`claimed_by`、`claimed_until`、`attempts`、`last_error`。
//!
use crate::error::{OutboxError, OutboxResult};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 投递状态：`Pending → Delivered` 为唯一合法迁移，`Delivered` 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    Delivered,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = OutboxError;

    fn from_str(s: &str) -> OutboxResult<Self> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "delivered" => Ok(OutboxStatus::Delivered),
            other => Err(OutboxError::InvalidStatus(other.to_string())),
        }
    }
}

/// 待写入的出站行（尚未分配 id，状态固定为 pending）
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct NewOutboxMessage {
    /// 事件类型
    event_type: String,
    /// 序列化后的事件载荷（JSON 文本）
    payload: String,
    /// 抽取时间
    created_at: DateTime<Utc>,
}

impl NewOutboxMessage {
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// 已持久化的出站消息
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq)]
pub struct OutboxMessage {
    /// 自增主键，同时作为排序键
    id: i64,
    event_type: String,
    payload: String,
    created_at: DateTime<Utc>,
    #[builder(default = OutboxStatus::Pending)]
    status: OutboxStatus,
    delivered_at: Option<DateTime<Utc>>,
    /// 当前持有认领的投递方
    claimed_by: Option<String>,
    /// 认领租约到期时间
    claimed_until: Option<DateTime<Utc>>,
    #[builder(default)]
    attempts: u32,
    last_error: Option<String>,
}

impl OutboxMessage {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> OutboxStatus {
        self.status
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn claimed_by(&self) -> Option<&str> {
        self.claimed_by.as_deref()
    }

    pub fn claimed_until(&self) -> Option<DateTime<Utc>> {
        self.claimed_until
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.status == OutboxStatus::Pending
    }

    pub fn is_delivered(&self) -> bool {
        self.status == OutboxStatus::Delivered
    }

    /// 是否可被认领：待投递，且无认领或租约已过期
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.claimed_until.is_none_or(|until| until < now)
    }

    pub(crate) fn set_claim(&mut self, claimant: &str, until: DateTime<Utc>) {
        self.claimed_by = Some(claimant.to_string());
        self.claimed_until = Some(until);
    }

    pub(crate) fn clear_claim(&mut self) {
        self.claimed_by = None;
        self.claimed_until = None;
    }

    pub(crate) fn mark_delivered(&mut self, at: DateTime<Utc>) {
        self.status = OutboxStatus::Delivered;
        self.delivered_at = Some(at);
        self.clear_claim();
    }

    pub(crate) fn record_failure(&mut self, reason: &str) {
        self.attempts += 1;
        self.last_error = Some(reason.to_string());
        self.clear_claim();
    }
}
