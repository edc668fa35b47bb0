//! Agent 错误类型
//!
//! 分三类：调用方用法错误（如无活动 Run 时记录步骤）、外部调用错误（推理 / 页面，
//! 以失败的子操作形式出现后再由调用方决定是否抛出）、超时与取消。
//! 摘要器失败不在此列：它们在 memory 层就地降级为确定性的兜底文本。

use thiserror::Error;

use crate::page::PageError;

/// 面向调用方的错误；失败信息总是带上出错的指令 / 断言文本与尽力而为的原因
#[derive(Error, Debug)]
pub enum AgentError {
    /// 未调用 start_run 就记录步骤，属于配置 / 调用方错误
    #[error("No active test run. Call start_run first.")]
    NoActiveRun,

    /// 指令执行失败：instruction 为原始指令，reason 来自失败子操作的 thought 或 error
    #[error("{instruction}\nReason: {reason}")]
    TaskFailed { instruction: String, reason: String },

    #[error("{message}\nReason: {reason}")]
    AssertionFailed { message: String, reason: String },

    /// 计时器竞速超时：仅停止等待，已送达页面的副作用不会回滚
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown type: {0}, only support 'action', 'query', 'assert', 'tap'")]
    UnknownAiType(String),

    #[error("Page error: {0}")]
    Page(#[from] PageError),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Dump error: {0}")]
    Dump(String),
}

impl AgentError {
    /// 构造 TaskFailed；reason 为空时使用 "(no_reason)"
    pub fn task_failed(instruction: impl Into<String>, reason: Option<&str>) -> Self {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("(no_reason)");
        AgentError::TaskFailed {
            instruction: instruction.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failed_display_carries_instruction_and_reason() {
        let err = AgentError::task_failed("click the login button", Some("Element not found"));
        assert_eq!(
            err.to_string(),
            "click the login button\nReason: Element not found"
        );
    }

    #[test]
    fn test_task_failed_without_reason() {
        let err = AgentError::task_failed("scroll down", Some("   "));
        assert!(err.to_string().ends_with("Reason: (no_reason)"));
    }
}
