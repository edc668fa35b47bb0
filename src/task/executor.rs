//! Executor：一条指令的子操作流水线
//!
//! 子操作先 append（pending），再逐个 run。run 负责状态推进、计时与审计日志；
//! 失败只记录在 Executor 上，是否致命由调用方决定。

use std::future::Future;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::task::{ExecutionDump, ExecutionTask, TaskFailure, TaskOutcome, TaskStatus, TaskTiming};

/// 取消导致的子操作失败使用的错误文本
pub const CANCELLED: &str = "cancelled";

pub struct Executor {
    name: String,
    tasks: Vec<ExecutionTask>,
    cancel: Option<CancellationToken>,
}

impl Executor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            cancel: None,
        }
    }

    /// 绑定取消令牌：取消后，正在运行和尚未开始的子操作都以 "cancelled" 失败
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 追加 pending 子操作，返回其下标
    pub fn append(&mut self, task: ExecutionTask) -> usize {
        self.tasks.push(task);
        self.tasks.len() - 1
    }

    pub fn tasks(&self) -> &[ExecutionTask] {
        &self.tasks
    }

    pub fn is_in_error_state(&self) -> bool {
        self.tasks.iter().any(|t| t.status == TaskStatus::Failed)
    }

    /// 流水线顺序中最后一个失败的子操作
    pub fn latest_error_task(&self) -> Option<&ExecutionTask> {
        self.tasks.iter().rev().find(|t| t.status == TaskStatus::Failed)
    }

    pub fn dump(&self) -> ExecutionDump {
        ExecutionDump {
            name: self.name.clone(),
            log_time: chrono::Utc::now().timestamp_millis(),
            tasks: self.tasks.clone(),
        }
    }

    /// 追加一个直接失败的子操作（如 waitFor 超时、重规划超限）
    pub fn append_failed(&mut self, task: ExecutionTask, error: impl Into<String>) -> usize {
        let idx = self.append(task);
        let now = chrono::Utc::now().timestamp_millis();
        let task = &mut self.tasks[idx];
        task.status = TaskStatus::Failed;
        task.error = Some(error.into());
        task.timing = Some(TaskTiming {
            start: now,
            end: now,
            cost: 0,
        });
        self.audit(idx);
        idx
    }

    /// 驱动下标为 idx 的 pending 子操作：pending → running → success | failed。
    /// 成功返回 fut 的值；失败、取消或子操作不处于 pending 时返回 None。
    pub async fn run<T, Fut>(&mut self, idx: usize, fut: Fut) -> Option<T>
    where
        Fut: Future<Output = Result<(T, TaskOutcome), TaskFailure>>,
    {
        match self.tasks.get_mut(idx) {
            Some(task) if task.status == TaskStatus::Pending => task.status = TaskStatus::Running,
            Some(task) => {
                tracing::warn!(
                    executor = %self.name,
                    task = idx,
                    status = %task.status,
                    "task is not pending, skipped"
                );
                return None;
            }
            None => {
                tracing::warn!(executor = %self.name, task = idx, "no such task");
                return None;
            }
        }

        let start_ms = chrono::Utc::now().timestamp_millis();
        let started = Instant::now();

        let result = match &self.cancel {
            Some(token) if token.is_cancelled() => Err(TaskFailure::new(CANCELLED)),
            Some(token) => {
                let token = token.clone();
                tokio::select! {
                    r = fut => r,
                    _ = token.cancelled() => Err(TaskFailure::new(CANCELLED)),
                }
            }
            None => fut.await,
        };

        let timing = TaskTiming {
            start: start_ms,
            end: chrono::Utc::now().timestamp_millis(),
            cost: started.elapsed().as_millis() as u64,
        };

        let task = &mut self.tasks[idx];
        task.timing = Some(timing);
        let value = match result {
            Ok((value, outcome)) => {
                task.status = TaskStatus::Success;
                task.output = outcome.output;
                if outcome.thought.is_some() {
                    task.thought = outcome.thought;
                }
                task.usage = outcome.usage;
                task.cache = outcome.cache;
                if let Some(plans) = outcome.plans {
                    task.param.get_or_insert_with(Default::default).plans = Some(plans);
                }
                Some(value)
            }
            Err(failure) => {
                task.status = TaskStatus::Failed;
                task.error = Some(failure.error);
                if failure.thought.is_some() {
                    task.thought = failure.thought;
                }
                task.usage = failure.usage;
                None
            }
        };
        self.audit(idx);
        value
    }

    fn audit(&self, idx: usize) {
        let task = &self.tasks[idx];
        let audit = serde_json::json!({
            "event": "task_audit",
            "executor": self.name,
            "kind": task.kind.to_string(),
            "sub_type": task.sub_type,
            "status": task.status.as_str(),
            "cost_ms": task.timing.map(|t| t.cost),
            "cache_hit": task.cache.map(|c| c.hit),
        });
        tracing::info!(audit = %audit.to_string(), "task");
        if let Some(err) = &task.error {
            tracing::debug!(executor = %self.name, task = idx, error = %err, "task failed");
        }
    }
}
