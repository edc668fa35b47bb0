//! Inference trait
//!
//! 推理错误总是以失败的子操作体现，由 Executor 记录；是否致命由调用方决定。

use async_trait::async_trait;
use thiserror::Error;

use crate::inference::{
    AssertResponse, ExtractDemand, ExtractResponse, LocateParam, LocateResponse, PlanResponse,
};
use crate::llm::LlmError;
use crate::page::PageSnapshot;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid inference response: {0}")]
    InvalidResponse(String),

    #[error("Inference unavailable: {0}")]
    Unavailable(String),
}

/// 推理服务：规划、定位、提取、断言
#[async_trait]
pub trait Inference: Send + Sync {
    /// 把指令规划为原语操作序列；context 为调用方拼好的附加上下文（如已完成步骤摘要）
    async fn plan(
        &self,
        instruction: &str,
        context: Option<&str>,
        snapshot: &PageSnapshot,
    ) -> Result<PlanResponse, InferenceError>;

    async fn locate(
        &self,
        locate: &LocateParam,
        snapshot: &PageSnapshot,
    ) -> Result<LocateResponse, InferenceError>;

    async fn extract(
        &self,
        demand: &ExtractDemand,
        snapshot: &PageSnapshot,
    ) -> Result<ExtractResponse, InferenceError>;

    async fn assert(
        &self,
        assertion: &str,
        context: Option<&str>,
        snapshot: &PageSnapshot,
    ) -> Result<AssertResponse, InferenceError>;
}
