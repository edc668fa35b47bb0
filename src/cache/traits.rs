//! TaskCache trait 与缓存载荷

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::Fingerprint;
use crate::inference::{LocateResponse, PlanResponse};

/// 缓存载荷：与对应推理响应同型，命中与未命中产出的子操作输出形状一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "response", rename_all = "lowercase")]
pub enum CachedPayload {
    Plan(PlanResponse),
    Locate(LocateResponse),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// 内容寻址的 get / put 存储；持久化介质由实现决定
#[async_trait]
pub trait TaskCache: Send + Sync {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CachedPayload>, CacheError>;

    async fn put(&self, fingerprint: Fingerprint, payload: CachedPayload) -> Result<(), CacheError>;
}
