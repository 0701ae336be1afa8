//! Outbox 统一错误定义
//!
//! 覆盖事件抽取/序列化、出站持久化、投递、迁移与配置等最小必要集合，
//! 便于在各实现层统一转换为 `OutboxError`。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OutboxError {
    // --- 序列化/抽取 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("event extraction failed: type={event_type}, reason={reason}")]
    Extraction { event_type: String, reason: String },

    // --- 出站持久化 ---
    #[error("outbox persistence failed: {reason}")]
    Persistence { reason: String },
    #[error("outbox store error: {reason}")]
    Store { reason: String },
    #[error("database error: {reason}")]
    Database { reason: String },
    #[error("invalid outbox status: {0}")]
    InvalidStatus(String),

    // --- 投递 ---
    #[error("delivery failed: message_id={message_id}, reason={reason}")]
    Delivery { message_id: i64, reason: String },
    #[error("onward processor not registered: {0}")]
    ProcessorNotFound(String),

    // --- 迁移/配置 ---
    #[error("migration failed: version={version}, reason={reason}")]
    Migration { version: i64, reason: String },
    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl OutboxError {
    pub fn store(reason: impl Into<String>) -> Self {
        Self::Store {
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type OutboxResult<T> = Result<T, OutboxError>;

// 允许在基础设施层直接使用 `?` 将 sqlx 错误转换为 OutboxError
#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for OutboxError {
    fn from(err: sqlx::Error) -> Self {
        OutboxError::Database {
            reason: err.to_string(),
        }
    }
}
