//! 下游处理器（OnwardProcessor）
//!
//! 投递循环把每条出站消息交给一个处理器，处理器负责送达外部系统。
//! 处理器返回错误时，该行保持待投递并在下一次 pass 重试，因此实现需要
//! 容忍重复投递（可借助 `OutboundEvent::idempotency_key` 去重）。
//!
use crate::outbox::OutboundEvent;
use async_trait::async_trait;
use tokio::sync::mpsc;

#[async_trait]
pub trait OnwardProcessor: Send + Sync {
    /// 处理器名称（用于注册、选择与日志）
    fn name(&self) -> &str;

    async fn deliver(&self, event: &OutboundEvent) -> anyhow::Result<()>;
}

/// 仅输出一条 tracing 日志的处理器
#[derive(Debug, Clone, Default)]
pub struct LoggingProcessor;

impl LoggingProcessor {
    pub const NAME: &'static str = "log";
}

#[async_trait]
impl OnwardProcessor for LoggingProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn deliver(&self, event: &OutboundEvent) -> anyhow::Result<()> {
        tracing::info!(
            message_id = event.message_id(),
            event_type = event.event_type(),
            idempotency_key = %event.idempotency_key(),
            payload = %event.payload(),
            "outbound event"
        );
        Ok(())
    }
}

/// 将事件转发到 tokio mpsc 通道的处理器；接收端关闭后投递失败
#[derive(Debug, Clone)]
pub struct ChannelProcessor {
    name: String,
    tx: mpsc::Sender<OutboundEvent>,
}

impl ChannelProcessor {
    pub const NAME: &'static str = "channel";

    pub fn new(tx: mpsc::Sender<OutboundEvent>) -> Self {
        Self::named(Self::NAME, tx)
    }

    pub fn named(name: impl Into<String>, tx: mpsc::Sender<OutboundEvent>) -> Self {
        Self {
            name: name.into(),
            tx,
        }
    }

    /// 创建处理器及其接收端
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl OnwardProcessor for ChannelProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, event: &OutboundEvent) -> anyhow::Result<()> {
        self.tx
            .send(event.clone())
            .await
            .map_err(|_| anyhow::anyhow!("channel `{}` receiver closed", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::OutboxMessage;
    use chrono::Utc;

    fn event(id: i64) -> OutboundEvent {
        let m = OutboxMessage::builder()
            .id(id)
            .event_type("OrderPlaced".to_string())
            .payload(r#"{"order_id":"o-1"}"#.to_string())
            .created_at(Utc::now())
            .build();
        OutboundEvent::try_from(&m).unwrap()
    }

    #[tokio::test]
    async fn logging_processor_always_succeeds() {
        let p = LoggingProcessor;
        assert_eq!(p.name(), "log");
        p.deliver(&event(1)).await.unwrap();
    }

    #[tokio::test]
    async fn channel_processor_forwards_in_order() {
        let (p, mut rx) = ChannelProcessor::channel(4);
        p.deliver(&event(1)).await.unwrap();
        p.deliver(&event(2)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().message_id(), 1);
        assert_eq!(rx.recv().await.unwrap().message_id(), 2);
    }

    #[tokio::test]
    async fn channel_processor_fails_when_receiver_dropped() {
        let (p, rx) = ChannelProcessor::channel(1);
        drop(rx);
        let err = p.deliver(&event(1)).await.unwrap_err();
        assert!(err.to_string().contains("receiver closed"));
    }
}
