use crate::error::{OutboxError, OutboxResult};
use crate::outbox::OutboxMessage;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 交给下游处理器的事件视图
///
/// 与 `OutboxMessage` 不同，这里的 `payload` 已解析为 JSON 值，
/// 同时暴露稳定的幂等键，下游据此对至少一次投递去重。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    message_id: i64,
    event_type: String,
    payload: Value,
    created_at: DateTime<Utc>,
}

impl OutboundEvent {
    pub fn message_id(&self) -> i64 {
        self.message_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 幂等键：同一 outbox 行的每次重投都相同
    pub fn idempotency_key(&self) -> String {
        format!("outbox:{}", self.message_id)
    }

    /// 将载荷反序列化为具体的事件类型
    pub fn decode<T: DeserializeOwned>(&self) -> OutboxResult<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

impl TryFrom<&OutboxMessage> for OutboundEvent {
    type Error = OutboxError;

    fn try_from(message: &OutboxMessage) -> OutboxResult<Self> {
        let payload = serde_json::from_str(message.payload()).map_err(|err| {
            OutboxError::Delivery {
                message_id: message.id(),
                reason: format!("malformed payload: {err}"),
            }
        })?;

        Ok(Self {
            message_id: message.id(),
            event_type: message.event_type().to_string(),
            payload,
            created_at: message.created_at(),
        })
    }
}
