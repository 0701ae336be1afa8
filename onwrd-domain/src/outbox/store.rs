//! 出站存储协议（OutboxStore）
//!
//! 投递循环只依赖这一组操作访问 outbox 表：
//! - `fetch_pending`：取出可认领的待投递行，从未尝试过的行按 id 升序排在前面，
//!   已失败过的行按 id 升序排在其后，队头持续失败的行不会挡住新行；
//! - `claim`：以租约方式认领一行，同一时刻至多一个认领方成功；
//! - `mark_delivered`：认领方在下游成功后把行标记为终态；
//! - `release`：下游失败时放弃认领并记录原因，行保持待投递；
//! - `release_claims`：投递循环被中止时一次性放弃某认领方持有的全部行。
//!
use crate::error::OutboxResult as Result;
use crate::outbox::OutboxMessage;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// 取出最多 `limit` 条可认领的待投递行（未尝试过的在前，各自按 id 升序）
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxMessage>>;

    /// 认领一行；行已被他人持有（租约未过期）或已投递时返回 `false`
    async fn claim(&self, id: i64, claimant: &str, lease: Duration) -> Result<bool>;

    /// 标记投递成功；仅当该行仍为 pending 且由 `claimant` 持有时生效
    async fn mark_delivered(&self, id: i64, claimant: &str) -> Result<bool>;

    /// 放弃认领并记录失败原因
    async fn release(&self, id: i64, claimant: &str, reason: &str) -> Result<()>;

    /// 放弃 `claimant` 持有的全部待投递行并记录原因，返回释放的行数
    async fn release_claims(&self, claimant: &str, reason: &str) -> Result<usize>;
}
