//! 记忆层：上下文引擎
//!
//! - **types**: Run / Step 数据模型与带类型的步骤元数据
//! - **context_engine**: 有界的步骤记忆，产出可注入 prompt 的已完成步骤摘要
//! - **summarizer**: 步骤 / Run 的 AI 摘要，失败时降级为确定性兜底文本
//! - **integrator**: 面向调用方的 record / complete / wrap 适配器

pub mod context_engine;
pub mod integrator;
pub mod summarizer;
pub mod types;

pub use context_engine::{ContextEngine, ContextSnapshot};
pub use integrator::{ActionContextIntegrator, StepHandle};
pub use summarizer::{run_fallback, step_fallback, LlmSummarizer, Summarizer};
pub use types::{ContextEngineOptions, Run, Step, StepMetadata, StepStatus};
