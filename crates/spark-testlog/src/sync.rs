//! 登记簿状态锁。
//!
// 教案级说明：`loom` 运行时需要接管互斥锁以枚举调度交错，因此在模型检查配置下
// 切换到 `loom::sync::Mutex`；常规构建使用 `parking_lot::Mutex`。

use core::ops::DerefMut;

#[cfg(any(loom, spark_loom))]
use loom::sync::Mutex;
#[cfg(not(any(loom, spark_loom)))]
use parking_lot::Mutex;

/// 对两种互斥锁实现的统一封装，仅暴露 `lock`。
pub(crate) struct StateLock<T> {
    inner: Mutex<T>,
}

impl<T> StateLock<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    #[cfg(not(any(loom, spark_loom)))]
    pub(crate) fn lock(&self) -> impl DerefMut<Target = T> + '_ {
        self.inner.lock()
    }

    // 临界区内不会 panic；即便中毒也继续使用内部状态，与 parking_lot 的语义保持一致。
    #[cfg(any(loom, spark_loom))]
    pub(crate) fn lock(&self) -> impl DerefMut<Target = T> + '_ {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
