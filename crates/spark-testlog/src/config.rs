//! 结果登记簿的运行期配置。
//!
//! # 教案式说明
//! - **逻辑 (How)**：[`RegistryConfig`] 通过 `serde` 反序列化，宿主可以直接从 TOML 文本加载；
//!   缺省字段回落到 [`Default`]，未知字段直接拒绝，避免拼写错误被静默吞掉。
//! - **契约 (What)**：配置在构造 [`ResultsRegistry`](crate::ResultsRegistry) 时一次性生效，之后不可修改。
//!
//! ```toml
//! suite_name = "tst_scene"
//! unbound_reporter = "count-only"
//! reporter_binding = "first-writer-wins"
//! ```

use serde::Deserialize;

use crate::error::TestLogError;

/// 在 reporter 尚未绑定时发出测试结论的处理策略。
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UnboundReporterPolicy {
    /// 返回 [`TestLogError::ReporterNotBound`]，计数器保持不变。
    #[default]
    Error,
    /// 照常计数，丢弃转发并记录一条 `warn` 日志。
    CountOnly,
}

/// 多个用例先后调用 `start_run` 时 reporter 的绑定规则。
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReporterBinding {
    /// 每次 `start_run` 都重新绑定，最后一次调用生效。
    #[default]
    LastWriterWins,
    /// 仅首次绑定生效，后续 `start_run` 不再替换 reporter。
    FirstWriterWins,
}

/// 登记簿配置。
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// 预置的套件名；为空时由首个带名称的 `register` 写入。
    pub suite_name: Option<String>,
    pub unbound_reporter: UnboundReporterPolicy,
    pub reporter_binding: ReporterBinding,
}

impl RegistryConfig {
    /// 从 TOML 文本解析配置。
    ///
    /// # 契约说明
    /// - **输入**：完整的 TOML 文档，允许为空字符串（得到默认配置）；
    /// - **错误**：语法错误、类型不符或未知字段均返回 [`TestLogError::InvalidConfig`]；
    /// - **后置条件**：空白的 `suite_name` 被视为未设置。
    pub fn from_toml_str(raw: &str) -> Result<Self, TestLogError> {
        let mut config: Self = toml::from_str(raw)?;
        if config
            .suite_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            config.suite_name = None;
        }
        Ok(config)
    }

    /// 以链式调用设置预置套件名。
    #[must_use]
    pub fn with_suite_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.suite_name = (!name.trim().is_empty()).then_some(name);
        self
    }

    #[must_use]
    pub fn with_unbound_reporter(mut self, policy: UnboundReporterPolicy) -> Self {
        self.unbound_reporter = policy;
        self
    }

    #[must_use]
    pub fn with_reporter_binding(mut self, binding: ReporterBinding) -> Self {
        self.reporter_binding = binding;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = RegistryConfig::from_toml_str("").expect("空配置应可解析");
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.unbound_reporter, UnboundReporterPolicy::Error);
        assert_eq!(config.reporter_binding, ReporterBinding::LastWriterWins);
    }

    #[test]
    fn kebab_case_values_are_accepted() {
        let config = RegistryConfig::from_toml_str(
            r#"
            suite_name = "tst_scene"
            unbound_reporter = "count-only"
            reporter_binding = "first-writer-wins"
            "#,
        )
        .expect("合法配置应可解析");
        assert_eq!(config.suite_name.as_deref(), Some("tst_scene"));
        assert_eq!(config.unbound_reporter, UnboundReporterPolicy::CountOnly);
        assert_eq!(config.reporter_binding, ReporterBinding::FirstWriterWins);
    }

    #[test]
    fn blank_suite_name_is_treated_as_unset() {
        let config = RegistryConfig::from_toml_str("suite_name = \"  \"").expect("应可解析");
        assert_eq!(config.suite_name, None);
    }

    #[test]
    fn builder_treats_blank_suite_name_as_unset() {
        let config = RegistryConfig::default().with_suite_name("  ");
        assert_eq!(config.suite_name, None);
        let config = config.with_suite_name("tst_scene");
        assert_eq!(config.suite_name.as_deref(), Some("tst_scene"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RegistryConfig::from_toml_str("quit_on_finish = false").unwrap_err();
        assert!(matches!(err, TestLogError::InvalidConfig { .. }));
    }
}
