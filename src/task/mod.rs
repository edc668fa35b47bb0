//! 任务执行层
//!
//! - **types**: 子操作（ExecutionTask）及其状态、计时、缓存标记
//! - **executor**: 单条指令的子操作流水线与状态机
//! - **plans**: 预置计划构建（Locate + 操作）
//! - **page_executor**: 各类调用（action / query / assert / waitFor ...）的流水线编排与缓存协议

pub mod executor;
pub mod page_executor;
pub mod plans;
pub mod types;

pub use executor::{Executor, CANCELLED};
pub use page_executor::{PageTaskExecutor, TaskRun, DEFAULT_MAX_REPLANS};
pub use plans::{build_plans, expand_plans, task_title};
pub use types::{
    CacheHit, ExecutionDump, ExecutionTask, TaskFailure, TaskKind, TaskOutcome, TaskParam,
    TaskStatus, TaskTiming,
};
