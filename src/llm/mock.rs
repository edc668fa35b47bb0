//! Mock LLM 客户端（用于测试与演示，无需 API）
//!
//! 预置回复按顺序弹出；队列为空时取最后一条 User 消息的首行，回显为 `{"summary": ...}`。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{Completion, LlmClient, LlmError, Message, Role, TokenUsage};

/// Mock 客户端：脚本化回复 + 回显兜底
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    /// 设置后每次调用都返回该错误
    fail_with: Option<LlmError>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次返回给定回复
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            ..Self::default()
        }
    }

    /// 每次调用都失败
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            fail_with: Some(LlmError::ApiError(reason.into())),
            ..Self::default()
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Ok(reply.into()));
        }
    }

    pub fn push_error(&self, err: LlmError) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(err));
        }
    }

    /// 已收到的调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> Option<Result<String, LlmError>> {
        if let Some(err) = &self.fail_with {
            return Some(Err(err.clone()));
        }
        self.replies.lock().ok()?.pop_front()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reply) = self.next_reply() {
            let content = reply?;
            return Ok(Completion {
                usage: Some(TokenUsage::new(10, content.len() as u64 / 4)),
                content,
            });
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .and_then(|m| m.content.lines().map(str::trim).find(|l| !l.is_empty()))
            .unwrap_or("(no input)");

        let content = serde_json::json!({ "summary": format!("Mock: {}", last_user) }).to_string();
        Ok(Completion {
            usage: Some(TokenUsage::new(10, 5)),
            content,
        })
    }
}
