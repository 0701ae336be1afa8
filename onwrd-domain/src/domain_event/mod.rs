//! 领域事件（Domain Event）与事件缓冲
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`），以及聚合内部暂存
//! 未抽取事件的有序缓冲区 `EventBuffer`。

mod domain_event_trait;
mod event_buffer;

pub use domain_event_trait::DomainEvent;
pub use event_buffer::EventBuffer;
