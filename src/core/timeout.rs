//! 软超时：与计时器竞速
//!
//! 超时后丢弃被等待的 future，等待方立即得到 AgentError::Timeout。
//! 已经发出的外部调用（推理请求、页面操作）可能已在对端生效，重试方需容忍这类迟到的副作用。

use std::future::Future;
use std::time::Duration;

use crate::core::AgentError;

/// 在 `after` 内等待 `fut`；超时返回 Timeout（operation 用于错误描述）
pub async fn with_timeout<T, F>(operation: &str, after: Duration, fut: F) -> Result<T, AgentError>
where
    F: Future<Output = Result<T, AgentError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            let after_ms = after.as_millis() as u64;
            tracing::warn!(operation, after_ms, "soft timeout elapsed, in-flight call not awaited");
            Err(AgentError::Timeout {
                operation: operation.to_string(),
                after_ms,
            })
        }
    }
}
