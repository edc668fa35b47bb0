//! 推理请求 / 响应类型
//!
//! 字段名与下游的报告 / 调试工具保持一致（camelCase，动作类型为 Tap / Input ...）。

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::TokenUsage;

/// 原语操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ActionType {
    Tap,
    Hover,
    Input,
    KeyboardPress,
    Scroll,
    Locate,
    Sleep,
    Finished,
    Error,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::Tap => "Tap",
            ActionType::Hover => "Hover",
            ActionType::Input => "Input",
            ActionType::KeyboardPress => "KeyboardPress",
            ActionType::Scroll => "Scroll",
            ActionType::Locate => "Locate",
            ActionType::Sleep => "Sleep",
            ActionType::Finished => "Finished",
            ActionType::Error => "Error",
        };
        f.write_str(s)
    }
}

fn default_true() -> bool {
    true
}

/// 目标元素的定位描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocateParam {
    /// 自然语言描述，如 "the blue Sign in button"
    pub prompt: String,
    #[serde(default)]
    pub deep_think: bool,
    /// false 时跳过缓存，强制请求推理服务
    #[serde(default = "default_true")]
    pub cacheable: bool,
}

impl LocateParam {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            deep_think: false,
            cacheable: true,
        }
    }

    pub fn with_deep_think(mut self, enabled: bool) -> Self {
        self.deep_think = enabled;
        self
    }

    pub fn with_cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }
}

impl From<&str> for LocateParam {
    fn from(prompt: &str) -> Self {
        LocateParam::new(prompt)
    }
}

impl From<String> for LocateParam {
    fn from(prompt: String) -> Self {
        LocateParam::new(prompt)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ScrollType {
    #[default]
    Once,
    UntilBottom,
    UntilTop,
    UntilLeft,
    UntilRight,
}

/// Scroll 操作参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScrollParam {
    #[serde(default)]
    pub direction: ScrollDirection,
    #[serde(default)]
    pub scroll_type: ScrollType,
    /// 滚动距离（px）；None 表示一屏
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl ScrollParam {
    pub fn new(direction: ScrollDirection, scroll_type: ScrollType) -> Self {
        Self {
            direction,
            scroll_type,
            distance: None,
        }
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    /// 用于任务标题，如 "down, once, distance-not-set"
    pub fn describe(&self) -> String {
        let direction = serde_json::to_value(self.direction)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let scroll_type = serde_json::to_value(self.scroll_type)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let distance = self
            .distance
            .map(|d| d.to_string())
            .unwrap_or_else(|| "distance-not-set".to_string());
        format!("{}, {}, {}", direction, scroll_type, distance)
    }
}

/// 规划出的原语操作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PrimitiveAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locate: Option<LocateParam>,
    /// 操作参数：Input 的 value、KeyboardPress 的 value、Scroll 的方向与距离、Sleep 的 timeMs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<Value>,
}

impl PrimitiveAction {
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            thought: None,
            locate: None,
            param: None,
        }
    }

    pub fn with_locate(mut self, locate: LocateParam) -> Self {
        self.locate = Some(locate);
        self
    }

    pub fn with_param(mut self, param: Value) -> Self {
        self.param = Some(param);
        self
    }

    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }
}

/// 规划响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    #[serde(default)]
    pub actions: Vec<PrimitiveAction>,
    /// 无需操作页面即可回答时的直接答案
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 执行完本批操作后是否需要基于新页面继续规划
    #[serde(default)]
    pub more_actions_needed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub usage: Option<TokenUsage>,
}

/// 定位响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocateResponse {
    /// 命中的元素 id；None 表示未找到
    #[serde(default)]
    pub element_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub usage: Option<TokenUsage>,
}

/// 数据提取响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub usage: Option<TokenUsage>,
}

/// 断言响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssertResponse {
    pub pass: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub usage: Option<TokenUsage>,
}

/// 数据提取需求：自由结构查询或期望特定类型的单值
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractDemand {
    Query(Value),
    Boolean(String),
    Number(String),
    String(String),
}

impl ExtractDemand {
    pub fn sub_type(&self) -> &'static str {
        match self {
            ExtractDemand::Query(_) => "Query",
            ExtractDemand::Boolean(_) => "Boolean",
            ExtractDemand::Number(_) => "Number",
            ExtractDemand::String(_) => "String",
        }
    }

    /// 发给推理服务的需求文本
    pub fn prompt(&self) -> String {
        match self {
            ExtractDemand::Query(Value::String(s)) => s.clone(),
            ExtractDemand::Query(v) => v.to_string(),
            ExtractDemand::Boolean(p) => format!("Boolean, {}", p),
            ExtractDemand::Number(p) => format!("Number, {}", p),
            ExtractDemand::String(p) => format!("String, {}", p),
        }
    }

    /// 校验返回值类型；Query 不做约束
    pub fn accepts(&self, data: &Value) -> bool {
        match self {
            ExtractDemand::Query(_) => true,
            ExtractDemand::Boolean(_) => data.is_boolean(),
            ExtractDemand::Number(_) => data.is_number(),
            ExtractDemand::String(_) => data.is_string(),
        }
    }
}
