use serde::Serialize;

/// 领域事件载荷需要满足的通用能力边界
///
/// 事件一经产生即不可变；在被抽取写入 Outbox 前仅存在于聚合的缓冲区中。
pub trait DomainEvent: Serialize + Send + Sync + 'static {
    /// 事件类型（形如 `OrderEvent.Placed` 或自定义类型名），写入 outbox 的 `event_type` 列
    fn event_type(&self) -> &str;
}
