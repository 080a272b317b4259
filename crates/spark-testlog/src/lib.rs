//! # spark-testlog
//!
//! ## 定位与职责（Why）
//! - 声明式 UI 测试框架中，每个测试用例都是独立创建、独立调度的执行单元；
//!   本 crate 为它们提供共享的结果登记簿：汇总通过 / 失败 / 跳过计数，追踪仍有未完成工作的用例，
//!   并在最后一个必选用例结束时交给 reporter 输出汇总、发出进程终止信号。
//! - 用例执行引擎、渲染层与结果展示都不在本 crate 范围内：展示通过 [`Reporter`] 契约接入，
//!   终止通过 [`Terminator`] 契约接入。
//!
//! ## 模块结构（How）
//! - `registry`：[`ResultsRegistry`] 本体与 [`Totals`]、[`CompletionOutcome`]；
//! - `case`：注入登记簿后供单个用例使用的 [`TestCase`] 句柄；
//! - `reporter` / `terminator`：外部协作方契约及内置实现；
//! - `config`：可从 TOML 加载的 [`RegistryConfig`]；
//! - `error`：[`TestLogError`]。
//!
//! ## 使用示例
//! ```
//! use std::sync::Arc;
//! use spark_testlog::{RecordingReporter, RecordingTerminator, ResultsRegistry, TestCase};
//!
//! let terminator = Arc::new(RecordingTerminator::new());
//! let registry = Arc::new(ResultsRegistry::new(terminator.clone()));
//! let reporter = Arc::new(RecordingReporter::new());
//!
//! let mut case = TestCase::register(Arc::clone(&registry), Some("tst_scene"));
//! case.start(reporter.clone());
//! case.pass("test_render").unwrap();
//! assert!(case.complete().unwrap().is_finalized());
//! assert_eq!(terminator.calls(), 1);
//! ```

mod case;
mod config;
mod error;
mod registry;
mod reporter;
mod sync;
mod terminator;

pub use case::TestCase;
pub use config::{RegistryConfig, ReporterBinding, UnboundReporterPolicy};
pub use error::TestLogError;
pub use registry::{CompletionOutcome, ResultsRegistry, Totals};
pub use reporter::{RecordingReporter, Reporter, ReporterEvent, TracingReporter};
pub use terminator::{ExitCodePolicy, ExitProcess, RecordingTerminator, Terminator};
