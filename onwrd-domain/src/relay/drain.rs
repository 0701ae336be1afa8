//! 投递循环（DrainLoop）
//!
//! 长驻任务，反复执行 pass：
//! - 取出最多 `batch_size` 条可认领的待投递行：从未尝试过的行按 id 升序在前，
//!   已失败过的行在后，队头反复失败的行不会让新行饿死；
//! - 逐行认领 → 解析载荷 → 在 `delivery_timeout` 内交给处理器；
//! - 成功则标记为 delivered，失败则释放认领并记录原因，同一 pass 内不重试；
//! - 满批且有成功时立即开始下一次 pass，否则等待 `poll_interval` 或唤醒信号。
//!
//! `start` 返回 `DrainHandle`，用于唤醒、关闭与等待任务结束。关闭超时而中止任务时，
//! 句柄会释放该认领方仍持有的行，重启后的下一次 pass 即可重新投递，无需等待租约过期。
//!
use super::OnwardProcessor;
use crate::config::OutboxConfig;
use crate::error::OutboxResult;
use crate::outbox::{OutboundEvent, OutboxMessage, OutboxStore};
use bon::Builder;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 中止在途投递时记录在行上的原因
pub const ABORTED_REASON: &str = "delivery aborted by shutdown";

#[derive(Builder)]
pub struct DrainLoop {
    store: Arc<dyn OutboxStore>,
    processor: Arc<dyn OnwardProcessor>,
    #[builder(default)]
    config: OutboxConfig,
    /// 认领标识，多进程共享同一存储时需各不相同
    #[builder(into, default = format!("drain-{}", uuid::Uuid::new_v4()))]
    claimant: String,
    /// 提交写入出站行后的唤醒信号
    #[builder(default)]
    wake: Arc<Notify>,
}

/// 单次 pass 的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub fetched: usize,
    pub delivered: usize,
    pub failed: usize,
    /// 被其他认领方抢先的行
    pub contended: usize,
}

impl DrainLoop {
    pub fn claimant(&self) -> &str {
        &self.claimant
    }

    pub fn config(&self) -> &OutboxConfig {
        &self.config
    }

    pub fn wake_signal(&self) -> Arc<Notify> {
        self.wake.clone()
    }

    /// 执行一次 pass；`token` 取消后不再处理新的行
    pub async fn run_pass(&self, token: &CancellationToken) -> OutboxResult<PassReport> {
        let batch = self.store.fetch_pending(self.config.batch_size).await?;
        let mut report = PassReport {
            fetched: batch.len(),
            ..Default::default()
        };

        for message in &batch {
            if token.is_cancelled() {
                break;
            }

            let id = message.id();
            if !self
                .store
                .claim(id, &self.claimant, self.config.claim_lease)
                .await?
            {
                report.contended += 1;
                continue;
            }

            match self.deliver_one(message).await {
                Ok(()) => {
                    if self.store.mark_delivered(id, &self.claimant).await? {
                        debug!(message_id = id, event_type = message.event_type(), "delivered");
                        report.delivered += 1;
                    } else {
                        // 租约已过期并被他人接管
                        warn!(message_id = id, "claim lost before marking delivered");
                        report.contended += 1;
                    }
                }
                Err(reason) => {
                    warn!(
                        message_id = id,
                        event_type = message.event_type(),
                        attempts = message.attempts() + 1,
                        reason = %reason,
                        "delivery failed, row stays pending"
                    );
                    self.store.release(id, &self.claimant, &reason).await?;
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn deliver_one(&self, message: &OutboxMessage) -> Result<(), String> {
        let event = OutboundEvent::try_from(message).map_err(|e| e.to_string())?;

        match time::timeout(self.config.delivery_timeout, self.processor.deliver(&event)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(format!("{err:#}")),
            Err(_) => Err(format!(
                "delivery timed out after {:?}",
                self.config.delivery_timeout
            )),
        }
    }

    /// 启动投递循环，返回可用于唤醒/关闭/等待的句柄
    pub fn start(self: Arc<Self>) -> DrainHandle {
        let token = CancellationToken::new();
        let wake = self.wake.clone();
        let shutdown_timeout = self.config.shutdown_timeout;
        let store = self.store.clone();
        let claimant = self.claimant.clone();
        let task = tokio::spawn(self.run(token.clone()));

        DrainHandle {
            token,
            wake,
            shutdown_timeout,
            store,
            claimant,
            task: Mutex::new(Some(task)),
        }
    }

    async fn run(self: Arc<Self>, token: CancellationToken) {
        info!(
            claimant = %self.claimant,
            processor = self.processor.name(),
            batch_size = self.config.batch_size,
            "drain loop started"
        );

        while !token.is_cancelled() {
            let full_batch = match self.run_pass(&token).await {
                Ok(report) => {
                    if report.fetched > 0 {
                        debug!(
                            fetched = report.fetched,
                            delivered = report.delivered,
                            failed = report.failed,
                            contended = report.contended,
                            "drain pass finished"
                        );
                    }
                    report.fetched == self.config.batch_size && report.delivered > 0
                }
                Err(err) => {
                    error!(error = %err, "drain pass aborted");
                    false
                }
            };

            if full_batch {
                continue;
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = time::sleep(self.config.poll_interval) => {}
                _ = self.wake.notified() => {}
            }
        }

        info!(claimant = %self.claimant, "drain loop stopped");
    }
}

/// 投递循环运行句柄
pub struct DrainHandle {
    token: CancellationToken,
    wake: Arc<Notify>,
    shutdown_timeout: Duration,
    store: Arc<dyn OutboxStore>,
    claimant: String,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DrainHandle {
    /// 提前开始下一次 pass
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// 停止调度新的 pass 与新的行
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 等待任务结束；超过 `shutdown_timeout` 仍未结束则中止任务，并释放其持有的认领
    pub async fn join(&self) {
        let task = self.task.lock().ok().and_then(|mut slot| slot.take());
        let Some(mut task) = task else {
            return;
        };

        if time::timeout(self.shutdown_timeout, &mut task).await.is_err() {
            warn!(
                timeout = ?self.shutdown_timeout,
                "drain loop did not stop in time, aborting in-flight delivery"
            );
            task.abort();
            let _ = task.await;

            match self.store.release_claims(&self.claimant, ABORTED_REASON).await {
                Ok(released) => info!(
                    claimant = %self.claimant,
                    released,
                    "released claims of aborted drain loop"
                ),
                Err(err) => error!(
                    claimant = %self.claimant,
                    error = %err,
                    "failed to release claims of aborted drain loop"
                ),
            }
        }
    }

    /// 关闭并等待
    pub async fn stop(&self) {
        self.shutdown();
        self.join().await;
    }
}

impl Drop for DrainHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
