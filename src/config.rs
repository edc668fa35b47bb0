//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `STEPWISE__*` 覆盖（双下划线表示嵌套，如 `STEPWISE__LLM__PROVIDER=openai`）。
//! 配置在进程启动时解析一次，之后以 `&AppConfig` 传入各构造函数；测试用 `AppConfig::default()` 加 `with_*` 覆盖。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentSection,
    pub context: ContextSection,
    pub cache: CacheSection,
    pub llm: LlmSection,
    pub timeouts: TimeoutsSection,
}

/// [agent] 段：报告分组名、基础动作上下文、执行记录落盘路径
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub group_name: String,
    pub group_description: Option<String>,
    /// 附加在每次 ai_action 规划前的系统上下文
    pub action_context: Option<String>,
    /// 执行记录（GroupedActionDump）写入的 JSON 文件；未设置则只保留在内存
    pub dump_path: Option<PathBuf>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            group_name: "Stepwise Report".to_string(),
            group_description: None,
            action_context: None,
            dump_path: None,
        }
    }
}

/// [context] 段：上下文引擎
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContextSection {
    pub enabled: bool,
    pub max_steps: usize,
    pub ai_summaries: bool,
}

impl Default for ContextSection {
    fn default() -> Self {
        Self {
            enabled: false,
            max_steps: crate::memory::types::DEFAULT_MAX_STEPS,
            ai_summaries: true,
        }
    }
}

/// [cache] 段：推理结果缓存
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub enabled: bool,
    /// 缓存文件中的标识；与文件内记录不符时丢弃旧记录
    pub cache_id: Option<String>,
    /// JSON 缓存文件；未设置时使用进程内缓存
    pub path: Option<PathBuf>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_id: None,
            path: None,
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 未设置时读取 OPENAI_API_KEY（仅在启动时读取一次）
    pub api_key: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "gpt-4o".to_string(),
            base_url: None,
            api_key: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [timeouts] 段：waitFor 默认值与 ai_action 软超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutsSection {
    pub wait_for_ms: u64,
    pub wait_for_interval_ms: u64,
    /// ai_action 的软超时（毫秒）；超时只停止等待，不回滚已执行的操作
    pub action_ms: Option<u64>,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            wait_for_ms: 15_000,
            wait_for_interval_ms: 3_000,
            action_ms: None,
        }
    }
}

impl AppConfig {
    pub fn with_context_enabled(mut self, enabled: bool) -> Self {
        self.context.enabled = enabled;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.context.max_steps = max_steps;
        self
    }

    pub fn with_ai_summaries(mut self, enabled: bool) -> Self {
        self.context.ai_summaries = enabled;
        self
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache.enabled = enabled;
        self
    }

    pub fn with_group_name(mut self, name: impl Into<String>) -> Self {
        self.agent.group_name = name.into();
        self
    }

    pub fn with_action_context(mut self, context: impl Into<String>) -> Self {
        self.agent.action_context = Some(context.into());
        self
    }

    pub fn with_dump_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.agent.dump_path = Some(path.into());
        self
    }

    pub fn with_action_timeout_ms(mut self, ms: u64) -> Self {
        self.timeouts.action_ms = Some(ms);
        self
    }

    /// 解析 API Key：配置优先，其次 OPENAI_API_KEY
    pub fn resolve_api_key(&self) -> Option<String> {
        self.llm
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// 从 config 目录加载配置，环境变量 STEPWISE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 STEPWISE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("STEPWISE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.agent.group_name, "Stepwise Report");
        assert!(!config.context.enabled);
        assert_eq!(config.context.max_steps, 10);
        assert!(config.cache.enabled);
        assert_eq!(config.llm.provider, "mock");
        assert_eq!(config.timeouts.wait_for_ms, 15_000);
        assert_eq!(config.timeouts.wait_for_interval_ms, 3_000);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::default()
            .with_context_enabled(true)
            .with_max_steps(3)
            .with_action_context("You are testing a shop");
        assert!(config.context.enabled);
        assert_eq!(config.context.max_steps, 3);
        assert_eq!(
            config.agent.action_context.as_deref(),
            Some("You are testing a shop")
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[context]\nenabled = true\nmax_steps = 4\n\n[cache]\nenabled = false\n\n[agent]\ngroup_name = \"checkout\""
        )
        .unwrap();
        let config = load_config(Some(file.path().to_path_buf())).unwrap();
        assert!(config.context.enabled);
        assert_eq!(config.context.max_steps, 4);
        assert!(!config.cache.enabled);
        assert_eq!(config.agent.group_name, "checkout");
    }
}
