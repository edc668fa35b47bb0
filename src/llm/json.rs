//! 从 LLM 回复中提取 JSON
//!
//! 模型常把 JSON 包在 ```json 代码块里，或在前后夹带说明文字；这里按顺序尝试：
//! 代码块 → 第一个 `{` 到最后一个 `}` 的片段。

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::llm::LlmError;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid fence regex")
    })
}

/// 返回回复中的 JSON 对象片段；没有找到时返回 None
pub fn extract_json_block(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(caps) = fence_regex().captures(trimmed) {
        return caps.get(1).map(|m| m.as_str());
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}

/// 提取并反序列化 JSON 回复
pub fn parse_json_reply<T: DeserializeOwned>(output: &str) -> Result<T, LlmError> {
    let block = extract_json_block(output)
        .ok_or_else(|| LlmError::InvalidResponse(format!("no JSON object in reply: {}", preview(output))))?;
    serde_json::from_str(block)
        .map_err(|e| LlmError::InvalidResponse(format!("{}: {}", e, preview(block))))
}

fn preview(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}
