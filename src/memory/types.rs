//! 上下文引擎的数据模型
//!
//! Run 是一次多步操作序列，Step 是其中一次被记录的动作。结果值在线上用小写字符串
//! （pending / success / failure），与下游报告工具一致。

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 默认保留的步骤数
pub const DEFAULT_MAX_STEPS: usize = 10;

/// 步骤 / Run 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Success,
    Failure,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Success => "success",
            StepStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 步骤元数据：已知用途的字段带类型，其余放入 extra
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepMetadata {
    /// 定位描述（tap / input 等带目标元素的动作）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locate_prompt: Option<String>,
    /// 输入值或按键名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// 动作发生时的页面 URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 重试场景下的第几次尝试（从 1 开始）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl StepMetadata {
    pub fn with_locate_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.locate_prompt = Some(prompt.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// Run 中的一个步骤；创建时为 Pending，之后只会被改写一次为终态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub action: String,
    pub description: String,
    pub result: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StepMetadata>,
    /// 创建时间（毫秒时间戳）
    pub timestamp: i64,
}

impl Step {
    pub(crate) fn pending(action: String, description: String, metadata: Option<StepMetadata>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action,
            description,
            result: StepStatus::Pending,
            error: None,
            action_result: None,
            summary: None,
            metadata,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// 摘要缺失时的单行描述：`{action}: {description} ({result})`
    pub fn digest_line(&self) -> String {
        match &self.summary {
            Some(s) => s.clone(),
            None => format!("{}: {} ({})", self.action, self.description, self.result),
        }
    }
}

/// 一次多步操作序列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<Step>,
    pub result: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_timestamp: Option<i64>,
}

impl Run {
    pub(crate) fn new(name: String, description: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            steps: Vec::new(),
            result: StepStatus::Pending,
            summary: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
            completed_timestamp: None,
        }
    }

    /// 聚合结果：任一保留步骤失败即为 Failure
    pub fn derived_result(&self) -> StepStatus {
        if self.steps.iter().any(|s| s.result == StepStatus::Failure) {
            StepStatus::Failure
        } else {
            StepStatus::Success
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_timestamp.is_some()
    }
}

/// 上下文引擎选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextEngineOptions {
    /// 保留的最大步骤数；0 视为默认值
    pub max_steps: usize,
    /// 是否生成 AI 摘要（需同时配置 Summarizer）
    pub use_ai_summaries: bool,
}

impl Default for ContextEngineOptions {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            use_ai_summaries: true,
        }
    }
}
