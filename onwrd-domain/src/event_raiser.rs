//! 事件产生能力（EventRaiser）
//!
//! 任意聚合都可以通过实现 `EventRaiser` 声明"会产生领域事件"：
//! - 聚合在自身状态变化时调用 `raise` 追加事件；
//! - 工作单元提交前由抽取器调用 `drain_events` 取出并清空。
//!
//! 为了让一次提交可以同时追踪多种聚合（事件类型各不相同），这里提供两层类型擦除：
//! - `OutboxEvent`：对象安全的事件视图，只暴露类型名与序列化；
//! - `EventSource`：对象安全的事件来源，供工作单元以 `&mut dyn EventSource` 形式登记。
//!
use crate::domain_event::{DomainEvent, EventBuffer};
use std::fmt;

/// 聚合的事件产生能力
pub trait EventRaiser {
    /// 该聚合产生的领域事件类型
    type Event: DomainEvent;

    fn event_buffer(&self) -> &EventBuffer<Self::Event>;

    fn event_buffer_mut(&mut self) -> &mut EventBuffer<Self::Event>;

    /// 追加一个领域事件
    fn raise(&mut self, event: Self::Event) {
        self.event_buffer_mut().raise(event);
    }

    /// 尚未抽取的事件
    fn pending_events(&self) -> &[Self::Event] {
        self.event_buffer().events()
    }

    /// 取出全部未抽取事件并清空缓冲区
    fn drain_events(&mut self) -> Vec<Self::Event> {
        self.event_buffer_mut().drain()
    }
}

/// 类型擦除后的待出站事件
pub trait OutboxEvent: Send + Sync {
    /// 写入 outbox `event_type` 列的类型名
    fn outbox_event_type(&self) -> &str;

    /// 序列化为 outbox `payload` 列的 JSON 文本
    fn to_payload(&self) -> serde_json::Result<String>;
}

impl<E: DomainEvent> OutboxEvent for E {
    fn outbox_event_type(&self) -> &str {
        DomainEvent::event_type(self)
    }

    fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Debug for dyn OutboxEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboxEvent")
            .field("event_type", &self.outbox_event_type())
            .finish()
    }
}

/// 可被工作单元登记的事件来源
pub trait EventSource: Send {
    /// 取出全部事件（擦除为 `OutboxEvent`）并清空来源的缓冲区
    fn take_events(&mut self) -> Vec<Box<dyn OutboxEvent>>;

    /// 当前缓冲的事件数量
    fn pending_count(&self) -> usize;
}

impl<T> EventSource for T
where
    T: EventRaiser + Send,
{
    fn take_events(&mut self) -> Vec<Box<dyn OutboxEvent>> {
        self.drain_events()
            .into_iter()
            .map(|e| Box::new(e) as Box<dyn OutboxEvent>)
            .collect()
    }

    fn pending_count(&self) -> usize {
        self.event_buffer().len()
    }
}
