//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 结果登记簿的大部分操作是“全函数”：`mark_optional` 与 `complete` 对未知 id 静默忽略；
//!   真正需要上报的只有契约违规，例如尚未 `start_run` 就发出测试结论，
//!   或对未登记 / 已完成的用例调用 `mark_mandatory`（分别返回 `UnknownTestCase` / `AlreadyCompleted`）。
//! - 配置解析失败同样归入本模块，便于调用方统一用 `?` 传播。
//!
//! ## 设计要求（What）
//! - 所有错误派生 `thiserror::Error`，可直接交给 `anyhow` 等上层框架处理；
//! - 变体携带足够定位信息（操作名、用例 id），不携带 reporter 等运行期对象。

use thiserror::Error;

/// 结果登记簿的错误域。
///
/// # 教案式说明
/// - **契约 (What)**：
///   - 所有变体均为 `Send + Sync + 'static`，可跨线程传播；
///   - 发生错误时登记簿状态保持不变（计数器、待完成集合均未被修改）。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TestLogError {
    /// 在任何 `start_run` 之前调用了需要 reporter 的操作。
    #[error("`{operation}` called before any test case started the run: no reporter is bound")]
    ReporterNotBound { operation: &'static str },

    /// 传入的 id 从未由 `register` 分配。
    #[error("test case #{id} was never registered")]
    UnknownTestCase { id: u64 },

    /// 用例已经完成，不允许重新进入待完成集合。
    #[error("test case #{id} already completed and cannot become mandatory again")]
    AlreadyCompleted { id: u64 },

    /// 配置文本无法解析。
    #[error("invalid test log configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl TestLogError {
    /// 构造 [`TestLogError::ReporterNotBound`]。
    pub(crate) fn not_bound(operation: &'static str) -> Self {
        Self::ReporterNotBound { operation }
    }
}

impl From<toml::de::Error> for TestLogError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidConfig {
            reason: err.to_string(),
        }
    }
}
