//! 投递子系统（relay）
//!
//! 把 outbox 中的待投递行异步送往下游：
//! - `OnwardProcessor`：下游处理器协议，内置 `LoggingProcessor`、`ChannelProcessor`；
//! - `ProcessorRegistry`：按名称登记处理器，按配置选出活动处理器；
//! - `DrainLoop`/`DrainHandle`：认领、投递、标记的长驻循环及其运行句柄。
//!
pub mod drain;
pub mod processor;
pub mod registry;

pub use drain::{ABORTED_REASON, DrainHandle, DrainLoop, PassReport};
pub use processor::{ChannelProcessor, LoggingProcessor, OnwardProcessor};
pub use registry::ProcessorRegistry;
