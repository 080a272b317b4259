//! 单个测试用例持有的登记句柄。
//!
//! # 教案式说明
//! - **意图 (Why)**：用例在构造时拿到共享登记簿的 `Arc`，此后通过句柄上报结果，
//!   不必自己保管 id、名称和 reporter；
//! - **逻辑 (How)**：句柄记录 `register` 分配的 id、用例名以及 `start` 时绑定的 reporter，
//!   各上报方法按 `"<name>::<function>()"` 生成展示名后委托给 [`ResultsRegistry`]；
//! - **契约 (What)**：`complete` 消费句柄，保证同一个句柄不会被完成两次。

use std::fmt;
use std::sync::Arc;

use crate::error::TestLogError;
use crate::registry::{CompletionOutcome, ResultsRegistry};
use crate::reporter::Reporter;

/// 注入了共享登记簿的测试用例句柄。
pub struct TestCase {
    registry: Arc<ResultsRegistry>,
    id: u64,
    name: Option<String>,
    reporter: Option<Arc<dyn Reporter>>,
}

impl TestCase {
    /// 在登记簿中登记一个新用例。空名称视为未命名。
    pub fn register(registry: Arc<ResultsRegistry>, name: Option<&str>) -> Self {
        let id = registry.register(name);
        Self {
            registry,
            id,
            name: name.filter(|name| !name.is_empty()).map(str::to_owned),
            reporter: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn registry(&self) -> &Arc<ResultsRegistry> {
        &self.registry
    }

    /// 切换用例是否阻塞收尾。
    ///
    /// 设为可选总是成功；恢复为必选时沿用 [`ResultsRegistry::mark_mandatory`] 的错误语义。
    pub fn set_optional(&self, optional: bool) -> Result<(), TestLogError> {
        if optional {
            self.registry.mark_optional(self.id);
            Ok(())
        } else {
            self.registry.mark_mandatory(self.id)
        }
    }

    /// 绑定 reporter 并通知登记簿；返回值同 [`ResultsRegistry::start_run`]。
    pub fn start(&mut self, reporter: Arc<dyn Reporter>) -> bool {
        self.reporter = Some(Arc::clone(&reporter));
        self.registry.start_run(reporter)
    }

    pub fn is_started(&self) -> bool {
        self.reporter.is_some()
    }

    /// 当前用例某个测试函数的展示名。
    pub fn display_name(&self, function: &str) -> String {
        self.registry.qualified_name(self.name.as_deref(), function)
    }

    pub fn fail(&self, function: &str, message: &str) -> Result<(), TestLogError> {
        self.registry.fail(&self.display_name(function), message)
    }

    pub fn expect_fail(
        &self,
        function: &str,
        expected: &str,
        message: &str,
    ) -> Result<(), TestLogError> {
        self.registry.expect_fail(&self.display_name(function), expected, message)
    }

    pub fn expect_fail_but_passed(&self, function: &str) -> Result<(), TestLogError> {
        self.registry.expect_fail_but_passed(&self.display_name(function))
    }

    pub fn skip(&self, function: &str, message: &str) -> Result<(), TestLogError> {
        self.registry.skip(&self.display_name(function), message)
    }

    pub fn pass(&self, function: &str) -> Result<(), TestLogError> {
        self.registry.pass(&self.display_name(function))
    }

    pub fn message(&self, message: &str) -> Result<(), TestLogError> {
        self.registry.message(message)
    }

    /// 以 `start` 时绑定的 reporter 完成用例。
    ///
    /// # 契约说明
    /// - **错误**：从未 `start` 的句柄返回 [`TestLogError::ReporterNotBound`]，此时登记簿状态不变；
    ///   需要以其它 reporter 收尾时使用 [`TestCase::complete_with`]。
    pub fn complete(self) -> Result<CompletionOutcome, TestLogError> {
        let reporter = self
            .reporter
            .as_ref()
            .ok_or_else(|| TestLogError::not_bound("complete"))?;
        Ok(self.registry.complete(self.id, &**reporter))
    }

    pub fn complete_with(self, reporter: &dyn Reporter) -> CompletionOutcome {
        self.registry.complete(self.id, reporter)
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Totals;
    use crate::reporter::{RecordingReporter, ReporterEvent};
    use crate::terminator::RecordingTerminator;

    fn registry() -> Arc<ResultsRegistry> {
        Arc::new(ResultsRegistry::new(Arc::new(RecordingTerminator::new())))
    }

    #[test]
    fn outcomes_carry_qualified_names() {
        let registry = registry();
        let reporter = Arc::new(RecordingReporter::new());
        let mut case = TestCase::register(Arc::clone(&registry), Some("tst_cube"));
        case.start(reporter.clone());

        case.fail("test_rotate", "angle mismatch").unwrap();
        case.pass("test_scale").unwrap();

        assert_eq!(
            reporter.events(),
            vec![
                ReporterEvent::Fail {
                    testcase: "tst_cube::test_rotate()".into(),
                    message: "angle mismatch".into(),
                },
                ReporterEvent::Pass {
                    testcase: "tst_cube::test_scale()".into(),
                },
            ]
        );
    }

    #[test]
    fn unnamed_case_uses_suite_name() {
        let registry = registry();
        let _named = TestCase::register(Arc::clone(&registry), Some("Suite"));
        let unnamed = TestCase::register(Arc::clone(&registry), None);
        assert_eq!(unnamed.name(), None);
        assert_eq!(unnamed.display_name("init"), "Suite::init()");
    }

    #[test]
    fn complete_without_start_is_rejected() {
        let registry = registry();
        let case = TestCase::register(Arc::clone(&registry), None);
        assert_eq!(
            case.complete(),
            Err(TestLogError::ReporterNotBound {
                operation: "complete"
            })
        );
        assert_eq!(registry.pending_ids(), vec![0]);
    }

    #[test]
    fn set_optional_round_trips_through_pending_set() {
        let registry = registry();
        let case = TestCase::register(Arc::clone(&registry), None);
        case.set_optional(true).unwrap();
        assert!(registry.pending_ids().is_empty());
        case.set_optional(false).unwrap();
        assert_eq!(registry.pending_ids(), vec![case.id()]);
    }

    #[test]
    fn complete_with_reports_to_the_given_reporter() {
        let registry = registry();
        let start_reporter = Arc::new(RecordingReporter::new());
        let final_reporter = RecordingReporter::new();
        let mut case = TestCase::register(Arc::clone(&registry), Some("Suite"));
        case.start(start_reporter.clone());
        case.pass("ok").unwrap();

        let outcome = case.complete_with(&final_reporter);

        assert!(outcome.is_finalized());
        assert_eq!(
            final_reporter.reports(),
            vec![Totals {
                passed: 1,
                failed: 0,
                skipped: 0,
            }]
        );
        assert!(start_reporter.reports().is_empty());
        assert_eq!(
            start_reporter.events(),
            vec![ReporterEvent::Pass {
                testcase: "Suite::ok()".into(),
            }]
        );
    }
}
