//! 编排层：PageAgent 与统一结果信封
//!
//! - **page_agent**: ai_action / ai_tap / ai_query / ai_assert / ai_wait_for ... 调用入口
//! - **metadata**: 由 Executor 子操作列表推导的 { result, metadata } 信封
//! - **dump**: 按分组累积的执行记录（JSON）
//! - **builder**: 按配置装配各协作者

pub mod builder;
pub mod dump;
pub mod metadata;
pub mod page_agent;

pub use builder::PageAgentBuilder;
pub use dump::GroupedActionDump;
pub use metadata::{
    ActionDetail, ActionInfo, AiTaskMetadata, AiTaskResult, InsightInfo, PlanningInfo, TaskDetail,
};
pub use page_agent::{AssertOptions, PageAgent, WaitForOptions};
