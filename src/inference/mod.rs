//! 推理层：推理服务的协作者契约
//!
//! 给定指令与页面快照，返回原语操作描述或直接答案，并附带 token 用量。
//! 本 crate 不实现模型，只提供基于 LlmClient 的 prompt / 解析适配（LlmInference）
//! 与测试 / 演示用的脚本化实现（ScriptedInference）。

pub mod llm_inference;
pub mod scripted;
pub mod traits;
pub mod types;

pub use llm_inference::LlmInference;
pub use scripted::ScriptedInference;
pub use traits::{Inference, InferenceError};
pub use types::{
    ActionType, AssertResponse, ExtractDemand, ExtractResponse, LocateParam, LocateResponse,
    PlanResponse, PrimitiveAction, ScrollDirection, ScrollParam, ScrollType,
};
