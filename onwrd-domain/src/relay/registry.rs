use super::OnwardProcessor;
use crate::error::{OutboxError, OutboxResult};
use std::collections::HashMap;
use std::sync::Arc;

/// 按名称登记的处理器集合，进程启动时根据配置选出唯一的活动处理器
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    by_name: HashMap<String, Arc<dyn OnwardProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置内置的 `LoggingProcessor`
    pub fn with_defaults() -> Self {
        Self::new().register(Arc::new(super::LoggingProcessor))
    }

    /// 登记处理器；同名登记会覆盖之前的处理器
    pub fn register(mut self, processor: Arc<dyn OnwardProcessor>) -> Self {
        self.by_name.insert(processor.name().to_string(), processor);
        self
    }

    pub fn resolve(&self, name: &str) -> OutboxResult<Arc<dyn OnwardProcessor>> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| OutboxError::ProcessorNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
