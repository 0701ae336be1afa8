//! 出站表（Outbox）模型与存储协议
//!
//! - `NewOutboxMessage`/`OutboxMessage`：待写入行与已持久化行；
//! - `OutboundEvent`：交给下游处理器的事件视图（带幂等键）；
//! - `OutboxStore`：投递循环使用的认领/标记协议；
//! - `InMemoryOutboxStore`：协议的内存实现。
//!
//! 具体数据库后端由基础设施层实现并注入。
//!
mod outbound_event;
mod outbox_message;
mod store;
mod store_inmemory;

pub use outbound_event::OutboundEvent;
pub use outbox_message::{NewOutboxMessage, OutboxMessage, OutboxStatus};
pub use store::OutboxStore;
pub use store_inmemory::InMemoryOutboxStore;
