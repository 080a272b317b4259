//! # ResultsRegistry：进程级结果登记簿
//!
//! ## 核心意图（Why）
//! - 多个相互独立创建的测试用例共享同一份计数器与“待完成集合”，只有全局视角才能判断
//!   “最后一个必选用例何时结束”；
//! - 登记簿以显式对象的形式构造一次，再以 `Arc<ResultsRegistry>` 注入每个用例，不依赖隐藏的全局变量。
//!
//! ## 行为契约（What）
//! - `register`：分配严格递增、永不复用的 id，并默认把用例计入待完成集合；
//! - `mark_optional` / `mark_mandatory`：在待完成集合中移除 / 恢复某个 id，集合内同一 id 至多出现一次；
//! - `start_run`：绑定 reporter，首次调用视为整个运行的开始；
//! - `fail` / `expect_fail` / `expect_fail_but_passed` / `skip` / `pass` / `message`：转发给 reporter 并累加计数；
//! - `complete`：移除 id；待完成集合为空时汇总并终止进程，整个运行只发生一次。
//!
//! ## 并发模型（How）
//! - 全部状态位于一把互斥锁之后；`complete` 的“移除 → 判空 → 标记已收尾”在同一临界区完成；
//! - reporter 与终止器一律在释放锁之后调用，回调中再次访问登记簿不会死锁；
//! - 结论转发时计数在锁内累加、reporter 在释放锁后才收到该行，因此与 `complete` 竞争时，
//!   最终的 `report` 可能早于最后一条结论行到达 reporter；汇总中的计数仍包含该结论。

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::config::{RegistryConfig, ReporterBinding, UnboundReporterPolicy};
use crate::error::TestLogError;
use crate::reporter::Reporter;
use crate::sync::StateLock;
use crate::terminator::Terminator;

/// 通过 / 失败 / 跳过 三类计数的快照。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Totals {
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl Totals {
    /// 三类计数之和。预期失败计入 `passed`，因此与转发事件数不一定相等。
    pub fn total(&self) -> u64 {
        self.passed + self.failed + self.skipped
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, tally: Tally) {
        match tally {
            Tally::Passed => self.passed += 1,
            Tally::Failed => self.failed += 1,
            Tally::Skipped => self.skipped += 1,
            Tally::Uncounted => {}
        }
    }
}

impl fmt::Display for Totals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} skipped",
            self.passed, self.failed, self.skipped
        )
    }
}

/// 一次转发对计数器的影响。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tally {
    Passed,
    Failed,
    Skipped,
    Uncounted,
}

/// [`ResultsRegistry::complete`] 的结果。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// 仍有必选用例未完成。
    Pending { remaining: usize },
    /// 本次调用触发了收尾：汇总已交给 reporter，终止信号已发出。
    Finalized(Totals),
    /// 运行早已收尾，本次调用没有任何副作用。
    AlreadyFinalized,
}

impl CompletionOutcome {
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized(_))
    }
}

struct RegistryState {
    suite_name: Option<String>,
    reported_start: bool,
    totals: Totals,
    next_id: u64,
    pending: Vec<u64>,
    completed: BTreeSet<u64>,
    reporter: Option<Arc<dyn Reporter>>,
    finalized: bool,
}

impl RegistryState {
    fn new(suite_name: Option<String>) -> Self {
        Self {
            suite_name,
            reported_start: false,
            totals: Totals::default(),
            next_id: 0,
            pending: Vec::new(),
            completed: BTreeSet::new(),
            reporter: None,
            finalized: false,
        }
    }

    fn remove_pending(&mut self, id: u64) -> bool {
        match self.pending.iter().position(|pending| *pending == id) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }
}

/// 进程级结果登记簿。
///
/// # 教案式说明
/// - **意图 (Why)**：集中保存套件名、计数器、待完成集合与当前 reporter，让所有用例看到同一份全局状态；
/// - **逻辑 (How)**：状态位于 [`StateLock`] 之后；终止器在构造时注入，收尾时调用一次；
/// - **契约 (What)**：
///   - id 从 0 开始严格递增，进程内永不复用；
///   - 计数器只增不减；
///   - 收尾（`report` + `terminate`）整个生命周期内至多发生一次。
pub struct ResultsRegistry {
    config: RegistryConfig,
    terminator: Arc<dyn Terminator>,
    state: StateLock<RegistryState>,
}

impl ResultsRegistry {
    /// 以默认配置构造登记簿。
    pub fn new(terminator: Arc<dyn Terminator>) -> Self {
        Self::with_config(RegistryConfig::default(), terminator)
    }

    pub fn with_config(config: RegistryConfig, terminator: Arc<dyn Terminator>) -> Self {
        let state = RegistryState::new(config.suite_name.clone());
        Self {
            config,
            terminator,
            state: StateLock::new(state),
        }
    }

    /// 幂等的惰性初始化：槽位为空时以 `init` 构造登记簿，否则返回已有实例。
    ///
    /// # 契约说明
    /// - **输入**：宿主持有的 `OnceLock` 槽位，通常是一个 `static`；
    /// - **后置条件**：同一槽位上的所有调用返回同一个 `Arc`，`init` 至多执行一次。
    pub fn initialize(slot: &OnceLock<Arc<Self>>, init: impl FnOnce() -> Self) -> Arc<Self> {
        Arc::clone(slot.get_or_init(|| Arc::new(init())))
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// 登记一个新用例并返回其 id。
    ///
    /// # 教案式说明
    /// - **逻辑 (How)**：套件名尚未确定且 `name` 非空时写入套件名（先到先得，之后不再改变）；
    ///   随后分配 `next_id` 并把 id 追加到待完成集合；
    /// - **契约 (What)**：总是成功；新用例默认为必选。
    pub fn register(&self, name: Option<&str>) -> u64 {
        let name = name.filter(|name| !name.is_empty());
        let id = {
            let mut state = self.state.lock();
            if state.suite_name.is_none()
                && let Some(name) = name
            {
                state.suite_name = Some(name.to_owned());
            }
            let id = state.next_id;
            state.next_id += 1;
            state.pending.push(id);
            id
        };
        tracing::debug!(id, name = name.unwrap_or_default(), "registered test case");
        id
    }

    /// 把用例移出待完成集合；id 不存在时什么也不做。
    pub fn mark_optional(&self, id: u64) {
        let removed = self.state.lock().remove_pending(id);
        tracing::debug!(id, removed, "test case marked optional");
    }

    /// 确保用例位于待完成集合中且只出现一次。
    ///
    /// # 契约说明
    /// - **错误**：id 从未分配时返回 [`TestLogError::UnknownTestCase`]；
    ///   已经 `complete` 过的用例返回 [`TestLogError::AlreadyCompleted`]，已完成的用例不能重新阻塞收尾；
    /// - **幂等**：已在集合中时不重复插入。
    pub fn mark_mandatory(&self, id: u64) -> Result<(), TestLogError> {
        let mut state = self.state.lock();
        if id >= state.next_id {
            return Err(TestLogError::UnknownTestCase { id });
        }
        if state.completed.contains(&id) {
            return Err(TestLogError::AlreadyCompleted { id });
        }
        if !state.pending.contains(&id) {
            state.pending.push(id);
        }
        drop(state);
        tracing::debug!(id, "test case marked mandatory");
        Ok(())
    }

    /// 绑定 reporter 并发出运行开始信号。
    ///
    /// # 教案式说明
    /// - **逻辑 (How)**：按 [`ReporterBinding`] 决定是否替换当前 reporter；默认每次调用都重新绑定；
    /// - **契约 (What)**：返回 `true` 表示本次调用是整个进程内首次开始，即规范意义上的“运行开始”；
    ///   之后的调用只影响绑定，返回 `false`。
    pub fn start_run(&self, reporter: Arc<dyn Reporter>) -> bool {
        let mut state = self.state.lock();
        let keep_existing = matches!(self.config.reporter_binding, ReporterBinding::FirstWriterWins)
            && state.reporter.is_some();
        if !keep_existing {
            state.reporter = Some(reporter);
        }
        if state.reported_start {
            return false;
        }
        state.reported_start = true;
        let suite = state.suite_name.clone().unwrap_or_default();
        drop(state);
        tracing::info!(suite = %suite, "test run started");
        true
    }

    /// 记录一次断言失败，`failed` 加一。
    pub fn fail(&self, testcase: &str, message: &str) -> Result<(), TestLogError> {
        self.forward("fail", Tally::Failed, |reporter| {
            reporter.log_fail(testcase, message)
        })
    }

    /// 记录一次符合预期的失败，计为通过。
    ///
    /// `expected` 非空时转发 `"<expected> <message>"`，否则只转发 `message`。
    pub fn expect_fail(
        &self,
        testcase: &str,
        expected: &str,
        message: &str,
    ) -> Result<(), TestLogError> {
        let combined = if expected.is_empty() {
            message.to_owned()
        } else {
            format!("{expected} {message}")
        };
        self.forward("expect_fail", Tally::Passed, |reporter| {
            reporter.log_expect_fail(testcase, &combined)
        })
    }

    /// 预期失败却通过，按回归处理，`failed` 加一。
    pub fn expect_fail_but_passed(&self, testcase: &str) -> Result<(), TestLogError> {
        self.forward("expect_fail_but_passed", Tally::Failed, |reporter| {
            reporter.log_expect_fail_pass(testcase)
        })
    }

    pub fn skip(&self, testcase: &str, message: &str) -> Result<(), TestLogError> {
        self.forward("skip", Tally::Skipped, |reporter| {
            reporter.log_skip(testcase, message)
        })
    }

    pub fn pass(&self, testcase: &str) -> Result<(), TestLogError> {
        self.forward("pass", Tally::Passed, |reporter| reporter.log_pass(testcase))
    }

    /// 转发自由文本，不影响计数。
    pub fn message(&self, message: &str) -> Result<(), TestLogError> {
        self.forward("message", Tally::Uncounted, |reporter| {
            reporter.log_message(message)
        })
    }

    /// 标记用例完成，必要时触发收尾。
    ///
    /// # 教案式说明
    /// - **逻辑 (How)**：
    ///   1. 在锁内移除 id（不存在则忽略，例如此前已 `mark_optional`），并记入已完成集合；
    ///   2. 若运行已收尾返回 [`CompletionOutcome::AlreadyFinalized`]；若仍有待完成用例返回 `Pending`；
    ///   3. 否则在同一临界区内置位“已收尾”，释放锁后调用 `reporter.report` 与终止器；
    /// - **契约 (What)**：
    ///   - 收尾使用的是参数 `reporter` 而非共享绑定的 reporter，调用方应传入自己 `start_run` 时的那个；
    ///   - 并发的多个 `complete` 中只有一个能观察到“集合变空且尚未收尾”，收尾恰好一次；
    ///   - 待完成集合早已为空（例如全部用例都是可选的）时，首次 `complete` 同样触发收尾。
    pub fn complete(&self, id: u64, reporter: &dyn Reporter) -> CompletionOutcome {
        let totals = {
            let mut state = self.state.lock();
            let removed = state.remove_pending(id);
            if id < state.next_id {
                state.completed.insert(id);
            }
            if state.finalized {
                return CompletionOutcome::AlreadyFinalized;
            }
            if !state.pending.is_empty() {
                let remaining = state.pending.len();
                drop(state);
                tracing::debug!(id, removed, remaining, "test case completed");
                return CompletionOutcome::Pending { remaining };
            }
            state.finalized = true;
            state.totals
        };

        tracing::info!(
            id,
            passed = totals.passed,
            failed = totals.failed,
            skipped = totals.skipped,
            "last mandatory test case completed; finalizing run"
        );
        reporter.report(totals);
        self.terminator.terminate_with(totals);
        CompletionOutcome::Finalized(totals)
    }

    /// 生成 `"<name>::<function>()"` 形式的展示名。
    ///
    /// `name` 缺省或为空时使用套件名；两者都没有时返回 `"<function>()"`。无副作用。
    pub fn qualified_name(&self, name: Option<&str>, function: &str) -> String {
        match name.filter(|name| !name.is_empty()) {
            Some(name) => format_qualified(Some(name), function),
            None => {
                let state = self.state.lock();
                format_qualified(state.suite_name.as_deref(), function)
            }
        }
    }

    pub fn suite_name(&self) -> Option<String> {
        self.state.lock().suite_name.clone()
    }

    pub fn totals(&self) -> Totals {
        self.state.lock().totals
    }

    /// 待完成的 id，按加入顺序排列。
    pub fn pending_ids(&self) -> Vec<u64> {
        self.state.lock().pending.clone()
    }

    /// 下一个将被分配的 id，也等于已登记用例的数量。
    pub fn next_id(&self) -> u64 {
        self.state.lock().next_id
    }

    pub fn has_started(&self) -> bool {
        self.state.lock().reported_start
    }

    pub fn is_finalized(&self) -> bool {
        self.state.lock().finalized
    }

    /// 所有转发的公共路径：检查绑定、累加计数、释放锁后再调用 reporter。
    fn forward(
        &self,
        operation: &'static str,
        tally: Tally,
        send: impl FnOnce(&dyn Reporter),
    ) -> Result<(), TestLogError> {
        let reporter = {
            let mut state = self.state.lock();
            let reporter = state.reporter.clone();
            if reporter.is_none() && self.config.unbound_reporter == UnboundReporterPolicy::Error {
                return Err(TestLogError::not_bound(operation));
            }
            state.totals.record(tally);
            reporter
        };

        match reporter {
            Some(reporter) => {
                tracing::debug!(operation, "forwarding test outcome");
                send(&*reporter);
            }
            None => tracing::warn!(
                operation,
                "no reporter bound yet; outcome counted but not forwarded"
            ),
        }
        Ok(())
    }
}

impl fmt::Debug for ResultsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ResultsRegistry")
            .field("config", &self.config)
            .field("suite_name", &state.suite_name)
            .field("totals", &state.totals)
            .field("pending", &state.pending)
            .field("finalized", &state.finalized)
            .finish_non_exhaustive()
    }
}

fn format_qualified(name: Option<&str>, function: &str) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("{name}::{function}()"),
        _ => format!("{function}()"),
    }
}
