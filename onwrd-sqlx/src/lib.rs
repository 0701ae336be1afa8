//! onwrd 的 SQLite 基础设施实现（onwrd-sqlx）
//!
//! 基于 sqlx 把 `onwrd-domain` 的协议落到 SQLite 上：
//! - `migrations`：outbox 表结构与独立的迁移历史；
//! - `store`：事务内写入出站行与 `OutboxStore` 实现；
//! - `unit_of_work`/`interceptor`：事务 + 提交前钩子，提交时把事件写入 outbox；
//! - `connection_hook`/`startup`：连接建立时迁移，并只启动一次投递循环；
//! - `database`：`Outboxing` 装配入口与 `OutboxedDatabase`。
//!
//! 投递循环使用独立连接池访问同一数据库文件，因此需要文件型数据库
//! （建议开启 WAL），不支持 `sqlite::memory:`。
//!
pub mod connection_hook;
pub mod database;
pub mod interceptor;
pub mod migrations;
pub mod startup;
pub mod store;
pub mod unit_of_work;

pub use connection_hook::ConnectionHook;
pub use database::{OutboxedDatabase, Outboxing};
pub use interceptor::OutboxInterceptor;
pub use migrations::MigrationAdapter;
pub use startup::RelayStartup;
pub use store::{SqliteOutboxStore, insert_messages};
pub use unit_of_work::{CommitContext, PreCommitHook, UnitOfWork};
