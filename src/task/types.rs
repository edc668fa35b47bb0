//! 子操作（ExecutionTask）数据模型
//!
//! 每条指令的执行被拆成一串子操作：Planning / Insight / Action / Assertion。
//! 状态只会沿 pending → running → success | failed 前进。

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::inference::{InferenceError, LocateParam, PrimitiveAction};
use crate::llm::TokenUsage;
use crate::page::PageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskKind {
    Planning,
    Insight,
    Action,
    Assertion,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Planning => "Planning",
            TaskKind::Insight => "Insight",
            TaskKind::Action => "Action",
            TaskKind::Assertion => "Assertion",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 计时（毫秒时间戳 / 毫秒耗时）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaskTiming {
    pub start: i64,
    pub end: i64,
    pub cost: u64,
}

/// 缓存命中标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheHit {
    pub hit: bool,
}

/// 子操作参数；Planning 任务完成后带上生成的 plans
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskParam {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plans: Option<Vec<PrimitiveAction>>,
}

impl TaskParam {
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTask {
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub sub_type: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locate: Option<LocateParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<TaskParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<TaskTiming>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl ExecutionTask {
    pub fn new(kind: TaskKind, sub_type: impl Into<String>) -> Self {
        Self {
            kind,
            sub_type: sub_type.into(),
            status: TaskStatus::Pending,
            thought: None,
            locate: None,
            param: None,
            timing: None,
            usage: None,
            cache: None,
            error: None,
            output: None,
        }
    }

    pub fn with_locate(mut self, locate: LocateParam) -> Self {
        self.locate = Some(locate);
        self
    }

    pub fn with_param(mut self, param: TaskParam) -> Self {
        self.param = Some(param);
        self
    }

    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }

    /// 单行描述，如 "Insight / Locate - the login button"
    pub fn title(&self) -> String {
        let param = self
            .locate
            .as_ref()
            .map(|l| l.prompt.clone())
            .or_else(|| self.param.as_ref().and_then(|p| p.prompt.clone()));
        match param {
            Some(p) => format!("{} / {} - {}", self.kind, self.sub_type, p),
            None => format!("{} / {}", self.kind, self.sub_type),
        }
    }
}

/// 子操作成功时交给 Executor 记录的信息
#[derive(Debug, Clone, Default)]
pub struct TaskOutcome {
    pub output: Option<Value>,
    pub thought: Option<String>,
    pub usage: Option<TokenUsage>,
    pub cache: Option<CacheHit>,
    pub plans: Option<Vec<PrimitiveAction>>,
}

impl TaskOutcome {
    pub fn output(output: Value) -> Self {
        Self {
            output: Some(output),
            ..Self::default()
        }
    }

    pub fn with_thought(mut self, thought: Option<String>) -> Self {
        self.thought = thought;
        self
    }

    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_cache(mut self, hit: bool) -> Self {
        self.cache = Some(CacheHit { hit });
        self
    }

    pub fn with_plans(mut self, plans: Vec<PrimitiveAction>) -> Self {
        self.plans = Some(plans);
        self
    }
}

/// 子操作失败：error 为诊断文本，thought 为推理服务给出的解释（若有）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFailure {
    pub error: String,
    pub thought: Option<String>,
    pub usage: Option<TokenUsage>,
}

impl TaskFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::default()
        }
    }

    pub fn with_thought(mut self, thought: Option<String>) -> Self {
        self.thought = thought;
        self
    }

    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }
}

impl From<PageError> for TaskFailure {
    fn from(e: PageError) -> Self {
        TaskFailure::new(e.to_string())
    }
}

impl From<InferenceError> for TaskFailure {
    fn from(e: InferenceError) -> Self {
        TaskFailure::new(e.to_string())
    }
}

/// 一条指令的执行记录（报告 / 调试用）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDump {
    pub name: String,
    pub log_time: i64,
    pub tasks: Vec<ExecutionTask>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_wire_format() {
        let mut task = ExecutionTask::new(TaskKind::Insight, "Locate")
            .with_locate(LocateParam::new("login button"));
        task.cache = Some(CacheHit { hit: true });
        let v = serde_json::to_value(&task).unwrap();
        assert_eq!(v["type"], "Insight");
        assert_eq!(v["subType"], "Locate");
        assert_eq!(v["status"], "pending");
        assert_eq!(v["cache"], json!({"hit": true}));
        assert!(v.get("error").is_none());
    }

    #[test]
    fn test_title() {
        let task = ExecutionTask::new(TaskKind::Action, "Tap")
            .with_locate(LocateParam::new("login button"));
        assert_eq!(task.title(), "Action / Tap - login button");
        assert_eq!(
            ExecutionTask::new(TaskKind::Planning, "Plan").title(),
            "Planning / Plan"
        );
    }

    #[test]
    fn test_status_terminal() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }
}
