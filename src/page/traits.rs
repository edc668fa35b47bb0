//! Page trait：驱动层的最小接口

use async_trait::async_trait;
use thiserror::Error;

use crate::inference::PrimitiveAction;
use crate::page::{ElementInfo, PageSnapshot};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PageError {
    #[error("Snapshot failed: {0}")]
    Snapshot(String),

    #[error("Action {action} failed: {reason}")]
    Action { action: String, reason: String },

    #[error("Unsupported action: {0}")]
    Unsupported(String),
}

/// 被控页面：提供快照并执行原语操作
#[async_trait]
pub trait Page: Send + Sync {
    /// 驱动类型标识（puppeteer / playwright / android / static ...）
    fn page_type(&self) -> &str;

    async fn snapshot(&self) -> Result<PageSnapshot, PageError>;

    async fn url(&self) -> Result<String, PageError>;

    /// 执行一个原语操作；element 为定位阶段解析出的目标元素（若有）
    async fn perform(
        &self,
        action: &PrimitiveAction,
        element: Option<&ElementInfo>,
    ) -> Result<serde_json::Value, PageError>;
}
