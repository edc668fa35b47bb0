//! Stepwise - AI 驱动的页面自动化核心
//!
//! 模块划分：
//! - **agent**: PageAgent 编排入口与统一结果信封
//! - **cache**: 推理结果缓存（指纹、内存 / 文件实现）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与超时辅助
//! - **inference**: 推理服务契约（规划、定位、提取、断言）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 上下文引擎、步骤摘要与动作记录适配器
//! - **observability**: 日志初始化
//! - **page**: 页面环境契约与内存实现
//! - **task**: 子操作状态机与各类调用的执行流水线

pub mod agent;
pub mod cache;
pub mod config;
pub mod core;
pub mod inference;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod page;
pub mod task;

pub use agent::{AiTaskMetadata, AiTaskResult, PageAgent, PageAgentBuilder};
pub use config::{load_config, AppConfig};
pub use core::{with_timeout, AgentError};
pub use memory::{ActionContextIntegrator, ContextEngine};
