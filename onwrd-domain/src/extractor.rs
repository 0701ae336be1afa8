//! 事件抽取器（Extractor）
//!
//! 给定一次工作单元中登记的聚合集合，按登记顺序逐个取出其缓冲的事件并清空，
//! 拼接为一个序列：
//! - 同一聚合内保持 `raise` 顺序；
//! - 跨聚合的顺序即登记（遍历）顺序，确定但不构成业务保证。
//!
//! 同时提供将抽取结果序列化为待写入行（`NewOutboxMessage`）的工具函数，
//! 序列化失败映射为 `OutboxError::Extraction`。
//!
use crate::error::{OutboxError, OutboxResult};
use crate::event_raiser::{EventSource, OutboxEvent};
use crate::outbox::NewOutboxMessage;
use chrono::Utc;

/// 依次取出所有来源的事件
pub fn extract_events(sources: &mut [&mut dyn EventSource]) -> Vec<Box<dyn OutboxEvent>> {
    let mut events = Vec::with_capacity(sources.iter().map(|s| s.pending_count()).sum());
    for source in sources.iter_mut() {
        events.extend(source.take_events());
    }
    events
}

/// 将抽取到的事件序列化为待写入的出站行，保持输入顺序
pub fn serialize_events(events: &[Box<dyn OutboxEvent>]) -> OutboxResult<Vec<NewOutboxMessage>> {
    let created_at = Utc::now();

    events
        .iter()
        .map(|event| {
            let payload = event
                .to_payload()
                .map_err(|err| OutboxError::Extraction {
                    event_type: event.outbox_event_type().to_string(),
                    reason: err.to_string(),
                })?;

            Ok(NewOutboxMessage::builder()
                .event_type(event.outbox_event_type().to_string())
                .payload(payload)
                .created_at(created_at)
                .build())
        })
        .collect()
}
