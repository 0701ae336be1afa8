//! 工作单元（UnitOfWork）与提交前钩子（PreCommitHook）
//!
//! 一个工作单元对应一个 SQLite 事务：
//! - 业务代码通过 `conn()` 在事务内执行写操作；
//! - `track` 登记本次修改过的聚合，提交时由钩子抽取其事件；
//! - `commit` 依次执行提交前钩子，任一钩子失败则回滚整个事务并返回错误。
//!
use async_trait::async_trait;
use onwrd_domain::error::OutboxResult;
use onwrd_domain::event_raiser::{EventSource, OutboxEvent};
use onwrd_domain::extractor::extract_events;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::warn;

/// 提交前钩子：在事务提交前、于同一连接上执行
#[async_trait]
pub trait PreCommitHook: Send + Sync {
    fn name(&self) -> &str;

    async fn before_commit(&self, ctx: &mut CommitContext<'_, '_>) -> OutboxResult<()>;
}

/// 钩子可见的提交上下文
pub struct CommitContext<'c, 'a> {
    conn: &'c mut SqliteConnection,
    sources: &'c mut Vec<&'a mut dyn EventSource>,
    outbox_rows: usize,
}

impl<'a> CommitContext<'_, 'a> {
    /// 当前事务连接
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.conn
    }

    /// 取出并清空所有已登记聚合的事件
    pub fn extract_events(&mut self) -> Vec<Box<dyn OutboxEvent>> {
        extract_events(self.sources.as_mut_slice())
    }

    pub fn tracked(&self) -> usize {
        self.sources.len()
    }

    /// 记录本次提交写入的出站行数，提交成功后据此唤醒投递循环
    pub fn record_outbox_rows(&mut self, rows: usize) {
        self.outbox_rows += rows;
    }
}

pub struct UnitOfWork<'a> {
    tx: Transaction<'static, Sqlite>,
    sources: Vec<&'a mut dyn EventSource>,
    hooks: Arc<Vec<Arc<dyn PreCommitHook>>>,
    wake: Arc<Notify>,
}

impl<'a> UnitOfWork<'a> {
    pub(crate) fn new(
        tx: Transaction<'static, Sqlite>,
        hooks: Arc<Vec<Arc<dyn PreCommitHook>>>,
        wake: Arc<Notify>,
    ) -> Self {
        Self {
            tx,
            sources: Vec::new(),
            hooks,
            wake,
        }
    }

    /// 事务连接，用于执行业务写操作
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// 登记一个会产生事件的聚合；事件按登记顺序抽取
    pub fn track<A>(&mut self, aggregate: &'a mut A) -> &mut Self
    where
        A: EventSource + 'a,
    {
        self.sources.push(aggregate);
        self
    }

    pub fn tracked(&self) -> usize {
        self.sources.len()
    }

    /// 执行提交前钩子并提交，返回写入的出站行数
    ///
    /// 钩子失败时事务回滚，业务修改与出站行一并撤销；已抽取的事件随之丢弃，
    /// 调用方应重新加载聚合后再重试。
    pub async fn commit(mut self) -> OutboxResult<usize> {
        let mut ctx = CommitContext {
            conn: &mut *self.tx,
            sources: &mut self.sources,
            outbox_rows: 0,
        };

        for hook in self.hooks.iter() {
            if let Err(err) = hook.before_commit(&mut ctx).await {
                warn!(hook = hook.name(), error = %err, "pre-commit hook failed, rolling back");
                self.tx.rollback().await?;
                return Err(err);
            }
        }

        let written = ctx.outbox_rows;
        self.tx.commit().await?;

        if written > 0 {
            self.wake.notify_one();
        }
        Ok(written)
    }

    /// 放弃本次工作单元；未抽取的事件仍保留在聚合中
    pub async fn rollback(self) -> OutboxResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
