//! 事务性出站（transactional outbox）核心库（onwrd-domain）
//!
//! 让聚合产生的领域事件与业务状态变更在同一事务中落库，再由后台循环
//! 异步投递到下游，提供：
//! - 领域事件（`domain_event`）与聚合的事件产生能力（`event_raiser`）
//! - 提交前的事件抽取与序列化（`extractor`）
//! - 出站消息模型与存储协议（`outbox`）
//! - 投递子系统（`relay`）：下游处理器、处理器注册表与投递循环
//! - 进程级单次执行守卫（`run_once`）与运行配置（`config`）
//!
//! 本 crate 不绑定具体数据库，存储后端（例如 SQLite）由基础设施层实现
//! `OutboxStore` 并负责事务内写入。
//!
//! 典型用法：
//! 1. 为事件类型实现 `DomainEvent`（或使用 `#[domain_event]`）；
//! 2. 让聚合实现 `EventRaiser`（或使用 `#[event_raiser]`），在状态变化时 `raise`；
//! 3. 基础设施层在提交前调用 `extract_events`/`serialize_events` 写入出站行；
//! 4. 使用 `DrainLoop` 配合选定的 `OnwardProcessor` 投递。
//!
pub mod config;
pub mod domain_event;
pub mod error;
pub mod event_raiser;
pub mod extractor;
pub mod outbox;
#[cfg(feature = "relay")]
pub mod relay;
pub mod run_once;

// 允许在本 crate 内部通过 ::onwrd_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::onwrd_domain 路径。
extern crate self as onwrd_domain;
