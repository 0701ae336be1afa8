//! Outbox 运行配置（OutboxConfig）
//!
//! 配置可以三种方式获得：
//! - `OutboxConfig::default()`；
//! - 反序列化（时长字段以毫秒表示，缺省字段取默认值）；
//! - `OutboxConfig::from_env()` 读取 `ONWRD_*` 环境变量。
//!
use crate::error::{OutboxError, OutboxResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_PROCESSOR: &str = "ONWRD_PROCESSOR";
pub const ENV_BATCH_SIZE: &str = "ONWRD_BATCH_SIZE";
pub const ENV_POLL_INTERVAL_MS: &str = "ONWRD_POLL_INTERVAL_MS";
pub const ENV_DELIVERY_TIMEOUT_MS: &str = "ONWRD_DELIVERY_TIMEOUT_MS";
pub const ENV_CLAIM_LEASE_MS: &str = "ONWRD_CLAIM_LEASE_MS";
pub const ENV_SHUTDOWN_TIMEOUT_MS: &str = "ONWRD_SHUTDOWN_TIMEOUT_MS";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// 当前进程启用的 onward processor 名称
    pub processor: String,
    /// 单次 pass 最多处理的行数
    pub batch_size: usize,
    /// 两次 pass 之间的等待时长
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,
    /// 单条投递的超时
    #[serde(rename = "delivery_timeout_ms", with = "duration_ms")]
    pub delivery_timeout: Duration,
    /// 认领租约时长，需不短于投递超时
    #[serde(rename = "claim_lease_ms", with = "duration_ms")]
    pub claim_lease: Duration,
    /// 关闭时等待在途投递的最长时间
    #[serde(rename = "shutdown_timeout_ms", with = "duration_ms")]
    pub shutdown_timeout: Duration,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            processor: "log".to_string(),
            batch_size: 100,
            poll_interval: Duration::from_millis(1000),
            delivery_timeout: Duration::from_secs(30),
            claim_lease: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl OutboxConfig {
    /// 从进程环境变量加载，未设置的项取默认值
    pub fn from_env() -> OutboxResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过任意键值来源加载（便于测试与自定义配置源）
    pub fn from_lookup<F>(lookup: F) -> OutboxResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(processor) = lookup(ENV_PROCESSOR) {
            config.processor = processor.trim().to_string();
        }
        if let Some(v) = lookup(ENV_BATCH_SIZE) {
            config.batch_size = parse_number(ENV_BATCH_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_POLL_INTERVAL_MS) {
            config.poll_interval = Duration::from_millis(parse_number(ENV_POLL_INTERVAL_MS, &v)?);
        }
        if let Some(v) = lookup(ENV_DELIVERY_TIMEOUT_MS) {
            config.delivery_timeout =
                Duration::from_millis(parse_number(ENV_DELIVERY_TIMEOUT_MS, &v)?);
        }
        if let Some(v) = lookup(ENV_CLAIM_LEASE_MS) {
            config.claim_lease = Duration::from_millis(parse_number(ENV_CLAIM_LEASE_MS, &v)?);
        }
        if let Some(v) = lookup(ENV_SHUTDOWN_TIMEOUT_MS) {
            config.shutdown_timeout =
                Duration::from_millis(parse_number(ENV_SHUTDOWN_TIMEOUT_MS, &v)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> OutboxResult<()> {
        if self.processor.is_empty() {
            return Err(OutboxError::config("processor name must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(OutboxError::config("batch_size must be greater than zero"));
        }
        for (name, value) in [
            ("poll_interval", self.poll_interval),
            ("delivery_timeout", self.delivery_timeout),
            ("claim_lease", self.claim_lease),
            ("shutdown_timeout", self.shutdown_timeout),
        ] {
            if value.is_zero() {
                return Err(OutboxError::config(format!("{name} must be non-zero")));
            }
        }
        if self.claim_lease < self.delivery_timeout {
            return Err(OutboxError::config(format!(
                "claim_lease ({:?}) must not be shorter than delivery_timeout ({:?})",
                self.claim_lease, self.delivery_timeout
            )));
        }
        Ok(())
    }
}

fn parse_number<T>(key: &str, raw: &str) -> OutboxResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| OutboxError::config(format!("{key}={raw:?}: {e}")))
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
