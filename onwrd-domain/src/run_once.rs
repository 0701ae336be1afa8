use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// 进程级"只执行一次"守卫
///
/// 并发调用 `try_run` 时恰好一个调用方执行动作，其余立即返回 `false`，
/// 不会等待动作结束。守卫一旦触发即不可重置，即使动作本身失败。
#[derive(Debug, Default)]
pub struct RunOnce {
    fired: AtomicBool,
}

impl RunOnce {
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// 首次调用时执行 `action` 并返回 `true`；之后的调用不执行并返回 `false`
    pub fn try_run<F: FnOnce()>(&self, action: F) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            action();
            true
        } else {
            false
        }
    }

    pub fn has_run(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// 进程内共享的守卫
    ///
    /// 首次调用时创建，之后每次返回同一实例；它随进程存在，不会被释放或重置。
    pub fn process_wide() -> Arc<RunOnce> {
        static PROCESS: OnceLock<Arc<RunOnce>> = OnceLock::new();
        PROCESS.get_or_init(|| Arc::new(RunOnce::new())).clone()
    }
}
