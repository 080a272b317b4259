//! 进程终止信号。
//!
//! 登记簿在最后一个必选用例完成、汇总已交给 reporter 之后调用一次 [`Terminator::terminate_with`]，
//! 默认实现直接转到无参的 [`Terminator::terminate`]。
//! 真正如何结束进程（直接退出、通知事件循环退出、测试中仅计数）由注入的实现决定。

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::registry::Totals;

/// 终止请求的接收方；调用语义为“发出即忘”。
pub trait Terminator: Send + Sync {
    fn terminate(&self);

    /// 携带最终汇总的终止请求。需要按结果决定退出码的实现覆盖此方法。
    fn terminate_with(&self, totals: Totals) {
        let _ = totals;
        self.terminate();
    }
}

impl<F> Terminator for F
where
    F: Fn() + Send + Sync,
{
    fn terminate(&self) {
        self()
    }
}

/// [`ExitProcess`] 的退出码取值规则，在收尾时按最终汇总求值。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExitCodePolicy {
    /// 存在失败时为 1，否则为 0。
    #[default]
    FailuresAsOne,
    /// 与结果无关的固定退出码。
    Fixed(i32),
}

impl ExitCodePolicy {
    pub fn code_for(&self, totals: Totals) -> i32 {
        match self {
            Self::FailuresAsOne => i32::from(!totals.is_success()),
            Self::Fixed(code) => *code,
        }
    }
}

/// 以 [`ExitCodePolicy`] 求得的退出码调用 [`std::process::exit`]。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExitProcess {
    policy: ExitCodePolicy,
}

impl ExitProcess {
    pub fn new(policy: ExitCodePolicy) -> Self {
        Self { policy }
    }

    pub fn fixed(code: i32) -> Self {
        Self::new(ExitCodePolicy::Fixed(code))
    }

    pub fn policy(&self) -> ExitCodePolicy {
        self.policy
    }

    fn exit(code: i32) -> ! {
        tracing::debug!(code, "exiting process after final report");
        std::process::exit(code)
    }
}

impl Terminator for ExitProcess {
    /// 没有汇总可用时按“无失败”求值。
    fn terminate(&self) {
        Self::exit(self.policy.code_for(Totals::default()))
    }

    fn terminate_with(&self, totals: Totals) {
        Self::exit(self.policy.code_for(totals))
    }
}

/// 记录调用次数与最后一次汇总的终止器，供测试与嵌入场景使用。
#[derive(Debug, Default)]
pub struct RecordingTerminator {
    calls: AtomicUsize,
    last_totals: Mutex<Option<Totals>>,
}

impl RecordingTerminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }

    pub fn was_terminated(&self) -> bool {
        self.calls() > 0
    }

    /// 最近一次 `terminate_with` 收到的汇总；仅调用过无参 `terminate` 时为 `None`。
    pub fn last_totals(&self) -> Option<Totals> {
        *self.last_totals.lock()
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self) {
        self.calls.fetch_add(1, Ordering::AcqRel);
    }

    fn terminate_with(&self, totals: Totals) {
        *self.last_totals.lock() = Some(totals);
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn exit_code_follows_policy() {
        let clean = Totals {
            passed: 4,
            failed: 0,
            skipped: 2,
        };
        let broken = Totals { failed: 1, ..clean };

        let process = ExitProcess::default();
        assert_eq!(process.policy().code_for(clean), 0);
        assert_eq!(process.policy().code_for(broken), 1);
        assert_eq!(ExitProcess::fixed(3).policy().code_for(broken), 3);
    }

    #[test]
    fn closures_are_terminators() {
        let recorder = Arc::new(RecordingTerminator::new());
        let inner = Arc::clone(&recorder);
        let terminator = move || inner.terminate();
        terminator.terminate();
        terminator.terminate_with(Totals::default());
        assert_eq!(recorder.calls(), 2);
        assert_eq!(recorder.last_totals(), None);
    }

    #[test]
    fn recording_terminator_keeps_last_totals() {
        let recorder = RecordingTerminator::new();
        let totals = Totals {
            passed: 1,
            failed: 2,
            skipped: 0,
        };
        recorder.terminate_with(totals);
        assert_eq!(recorder.calls(), 1);
        assert_eq!(recorder.last_totals(), Some(totals));
    }
}
