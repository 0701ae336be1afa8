use crate::store::insert_messages;
use crate::unit_of_work::{CommitContext, PreCommitHook};
use async_trait::async_trait;
use onwrd_domain::error::{OutboxError, OutboxResult};
use onwrd_domain::extractor::serialize_events;
use tracing::debug;

/// 事务拦截器：提交前把已登记聚合的事件写入 outbox
///
/// 步骤：抽取 → 无事件则不做任何写入 → 序列化（失败为 `Extraction`）
/// → 在同一事务内插入（失败为 `Persistence`）。任一步失败都会使整个提交回滚。
#[derive(Debug, Clone, Copy, Default)]
pub struct OutboxInterceptor;

impl OutboxInterceptor {
    pub const NAME: &'static str = "outbox";
}

#[async_trait]
impl PreCommitHook for OutboxInterceptor {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn before_commit(&self, ctx: &mut CommitContext<'_, '_>) -> OutboxResult<()> {
        let events = ctx.extract_events();
        if events.is_empty() {
            return Ok(());
        }

        let rows = serialize_events(&events)?;
        let ids = insert_messages(ctx.conn(), &rows)
            .await
            .map_err(|e| OutboxError::Persistence {
                reason: e.to_string(),
            })?;

        debug!(
            rows = ids.len(),
            first_id = ids.first().copied(),
            tracked = ctx.tracked(),
            "outbox rows staged in transaction"
        );
        ctx.record_outbox_rows(ids.len());
        Ok(())
    }
}
