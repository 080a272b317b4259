//! Reporter 契约及内置实现。
//!
//! # 教案式说明
//! - **意图 (Why)**：登记簿只负责计数与完成度追踪，结果的格式化与展示交给 [`Reporter`]；
//!   测试框架可以接入控制台、XML、IDE 协议等任意展示层。
//! - **逻辑 (How)**：所有方法同步执行、无返回值；登记簿在释放内部锁之后才调用 reporter，
//!   因此实现方可以在回调中再次访问登记簿。
//! - **契约 (What)**：实现必须为 `Send + Sync`，且不得 panic；登记簿不捕获也不转换 reporter 侧的失败。

use parking_lot::Mutex;
use serde::Serialize;

use crate::registry::Totals;

/// 结果展示层需要实现的能力集合。
pub trait Reporter: Send + Sync {
    /// 一次断言失败。
    fn log_fail(&self, testcase: &str, message: &str);

    /// 预期失败且确实失败；`message` 已由登记簿拼接好预期说明与细节。
    fn log_expect_fail(&self, testcase: &str, message: &str);

    /// 预期失败却意外通过。
    fn log_expect_fail_pass(&self, testcase: &str);

    fn log_skip(&self, testcase: &str, message: &str);

    fn log_pass(&self, testcase: &str);

    /// 与计数无关的自由文本。
    fn log_message(&self, message: &str);

    /// 整个测试运行的最终汇总，每个进程至多调用一次。
    fn report(&self, totals: Totals);
}

/// 以 `tracing` 事件输出结果的 reporter。
///
/// 每条转发对应一条事件，target 固定为 `spark_testlog::reporter`，行格式沿用常见的
/// `PASS   : suite::case()` 风格，便于在 CI 日志中 grep。
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl TracingReporter {
    pub fn new() -> Self {
        Self
    }
}

const TARGET: &str = "spark_testlog::reporter";

impl Reporter for TracingReporter {
    fn log_fail(&self, testcase: &str, message: &str) {
        tracing::error!(target: TARGET, "FAIL!  : {} {}", testcase, message);
    }

    fn log_expect_fail(&self, testcase: &str, message: &str) {
        tracing::info!(target: TARGET, "XFAIL  : {} {}", testcase, message);
    }

    fn log_expect_fail_pass(&self, testcase: &str) {
        tracing::error!(target: TARGET, "XPASS  : {}", testcase);
    }

    fn log_skip(&self, testcase: &str, message: &str) {
        tracing::info!(target: TARGET, "SKIP   : {} {}", testcase, message);
    }

    fn log_pass(&self, testcase: &str) {
        tracing::info!(target: TARGET, "PASS   : {}", testcase);
    }

    fn log_message(&self, message: &str) {
        tracing::info!(target: TARGET, "INFO   : {}", message);
    }

    fn report(&self, totals: Totals) {
        tracing::info!(
            target: TARGET,
            passed = totals.passed,
            failed = totals.failed,
            skipped = totals.skipped,
            "Totals: {}",
            totals
        );
    }
}

/// [`RecordingReporter`] 记录下的一次转发。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReporterEvent {
    Fail { testcase: String, message: String },
    ExpectFail { testcase: String, message: String },
    ExpectFailPass { testcase: String },
    Skip { testcase: String, message: String },
    Pass { testcase: String },
    Message { message: String },
    Report(Totals),
}

/// 把所有转发按顺序保存在内存中的 reporter。
///
/// # 教案式说明
/// - **意图 (Why)**：测试与嵌入方需要对“登记簿向展示层发了什么”做精确断言；
/// - **契约 (What)**：内部使用 `parking_lot::Mutex`，可在多个线程间共享；`events` 返回快照副本。
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReporterEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按到达顺序返回全部事件的副本。
    pub fn events(&self) -> Vec<ReporterEvent> {
        self.events.lock().clone()
    }

    /// 仅返回最终汇总，正常运行下长度至多为 1。
    pub fn reports(&self) -> Vec<Totals> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ReporterEvent::Report(totals) => Some(*totals),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReporterEvent) {
        self.events.lock().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn log_fail(&self, testcase: &str, message: &str) {
        self.push(ReporterEvent::Fail {
            testcase: testcase.to_owned(),
            message: message.to_owned(),
        });
    }

    fn log_expect_fail(&self, testcase: &str, message: &str) {
        self.push(ReporterEvent::ExpectFail {
            testcase: testcase.to_owned(),
            message: message.to_owned(),
        });
    }

    fn log_expect_fail_pass(&self, testcase: &str) {
        self.push(ReporterEvent::ExpectFailPass {
            testcase: testcase.to_owned(),
        });
    }

    fn log_skip(&self, testcase: &str, message: &str) {
        self.push(ReporterEvent::Skip {
            testcase: testcase.to_owned(),
            message: message.to_owned(),
        });
    }

    fn log_pass(&self, testcase: &str) {
        self.push(ReporterEvent::Pass {
            testcase: testcase.to_owned(),
        });
    }

    fn log_message(&self, message: &str) {
        self.push(ReporterEvent::Message {
            message: message.to_owned(),
        });
    }

    fn report(&self, totals: Totals) {
        self.push(ReporterEvent::Report(totals));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn recording_reporter_keeps_arrival_order() {
        let reporter = RecordingReporter::new();
        reporter.log_pass("a()");
        reporter.log_fail("b()", "boom");
        reporter.report(Totals {
            passed: 1,
            failed: 1,
            skipped: 0,
        });

        let events = reporter.events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[1],
            ReporterEvent::Fail {
                testcase: "b()".into(),
                message: "boom".into()
            }
        );
        assert_eq!(reporter.reports().len(), 1);
    }

    #[test]
    #[traced_test]
    fn tracing_reporter_emits_prefixed_lines() {
        let reporter = TracingReporter::new();
        reporter.log_fail("Suite::case()", "values differ");
        reporter.log_expect_fail_pass("Suite::other()");
        reporter.log_pass("Suite::ok()");
        reporter.log_expect_fail("Suite::known()", "bug-17 still open");
        reporter.log_skip("Suite::gpu()", "no display");
        reporter.log_message("scene loaded");
        reporter.report(Totals {
            passed: 3,
            failed: 2,
            skipped: 1,
        });

        assert!(logs_contain("FAIL!  : Suite::case() values differ"));
        assert!(logs_contain("XPASS  : Suite::other()"));
        assert!(logs_contain("PASS   : Suite::ok()"));
        assert!(logs_contain("XFAIL  : Suite::known() bug-17 still open"));
        assert!(logs_contain("SKIP   : Suite::gpu() no display"));
        assert!(logs_contain("INFO   : scene loaded"));
        assert!(logs_contain("Totals: 3 passed, 2 failed, 1 skipped"));
    }
}
