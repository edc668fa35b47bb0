//! 上下文引擎：有界、可摘要的执行历史
//!
//! 一个引擎实例同一时刻至多一个活动 Run。步骤数超过 max_steps 时按 FIFO 淘汰最旧步骤，
//! 被淘汰步骤的内容不会并入 Run 级摘要。已完成步骤被压成编号摘要，注入后续推理 prompt。
//!
//! 引擎不做内部互斥：所有修改操作取 `&mut self`，并发调用方须自行串行化。

use std::sync::Arc;

use serde::Serialize;

use crate::core::AgentError;
use crate::memory::types::DEFAULT_MAX_STEPS;
use crate::memory::{
    run_fallback, step_fallback, ContextEngineOptions, Run, Step, StepMetadata, StepStatus,
    Summarizer,
};

/// 引擎状态的只读快照（供调试与检查工具使用）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub current_run: Option<Run>,
    pub history: Vec<Run>,
    pub max_steps: usize,
    pub action_summaries: String,
}

pub struct ContextEngine {
    max_steps: usize,
    use_ai_summaries: bool,
    summarizer: Option<Arc<dyn Summarizer>>,
    current_run: Option<Run>,
    history: Vec<Run>,
}

impl Default for ContextEngine {
    fn default() -> Self {
        Self::new(ContextEngineOptions::default())
    }
}

impl ContextEngine {
    pub fn new(options: ContextEngineOptions) -> Self {
        let max_steps = if options.max_steps == 0 {
            DEFAULT_MAX_STEPS
        } else {
            options.max_steps
        };
        Self {
            max_steps,
            use_ai_summaries: options.use_ai_summaries,
            summarizer: None,
            current_run: None,
            history: Vec::new(),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    fn active_summarizer(&self) -> Option<Arc<dyn Summarizer>> {
        if self.use_ai_summaries {
            self.summarizer.clone()
        } else {
            None
        }
    }

    /// 开始新 Run；已有活动 Run 时先完成并归档它
    pub async fn start_run(&mut self, name: impl Into<String>, description: Option<String>) -> Run {
        if self.current_run.is_some() {
            self.complete_run().await;
        }
        let run = Run::new(name.into(), description);
        tracing::info!(run_id = %run.id, name = %run.name, "run started");
        self.current_run = Some(run.clone());
        run
    }

    /// 完成活动 Run：计算聚合结果、可选生成摘要、归档并清空活动槽位
    pub async fn complete_run(&mut self) -> Option<Run> {
        let mut run = self.current_run.take()?;
        run.result = run.derived_result();
        run.completed_timestamp = Some(chrono::Utc::now().timestamp_millis());

        if let Some(summarizer) = self.active_summarizer() {
            run.summary = Some(match summarizer.summarize_run(&run).await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!(run_id = %run.id, error = %e, "run summary failed, using fallback");
                    run_fallback(&run)
                }
            });
        }

        tracing::info!(
            run_id = %run.id,
            result = %run.result,
            steps = run.steps.len(),
            "run completed"
        );
        self.history.push(run.clone());
        Some(run)
    }

    /// 向活动 Run 追加 Pending 步骤；超出容量时淘汰最旧步骤
    pub fn add_step(
        &mut self,
        action: impl Into<String>,
        description: impl Into<String>,
        metadata: Option<StepMetadata>,
    ) -> Result<Step, AgentError> {
        let max_steps = self.max_steps;
        let run = self.current_run.as_mut().ok_or(AgentError::NoActiveRun)?;

        let step = Step::pending(action.into(), description.into(), metadata);
        run.steps.push(step.clone());

        if run.steps.len() > max_steps {
            let overflow = run.steps.len() - max_steps;
            for evicted in run.steps.drain(..overflow) {
                tracing::debug!(run_id = %run.id, step_id = %evicted.id, "step evicted");
            }
        }

        tracing::debug!(run_id = %run.id, step_id = %step.id, action = %step.action, "step added");
        Ok(step)
    }

    /// 把步骤改写为终态。无活动 Run、id 未知、步骤已是终态或 result 为 Pending 时返回 None 且不做任何修改
    pub async fn complete_step(
        &mut self,
        step_id: &str,
        result: StepStatus,
        error: Option<String>,
        action_result: Option<serde_json::Value>,
    ) -> Option<Step> {
        if !result.is_terminal() {
            tracing::debug!(step_id, "complete_step called with pending result, ignored");
            return None;
        }
        let summarizer = self.active_summarizer();
        let run = self.current_run.as_mut()?;
        let step = run.steps.iter_mut().find(|s| s.id == step_id)?;
        if step.result.is_terminal() {
            tracing::debug!(step_id, "step already completed, ignored");
            return None;
        }

        step.result = result;
        if error.is_some() {
            step.error = error;
        }
        if action_result.is_some() {
            step.action_result = action_result;
        }

        if let Some(summarizer) = summarizer {
            let snapshot = step.clone();
            let summary = match summarizer.summarize_step(&snapshot).await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!(step_id, error = %e, "step summary failed, using fallback");
                    step_fallback(&snapshot)
                }
            };
            step.summary = Some(summary);
        }

        tracing::debug!(step_id, result = %step.result, "step completed");
        Some(step.clone())
    }

    /// 活动 Run 中已完成（非 Pending）的步骤，按插入顺序
    pub fn completed_steps(&self) -> Vec<Step> {
        self.current_run
            .as_ref()
            .map(|run| {
                run.steps
                    .iter()
                    .filter(|s| s.result.is_terminal())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 已完成步骤的编号摘要（从 1 开始）；没有已完成步骤时返回空串
    pub fn action_summaries(&self) -> String {
        self.completed_steps()
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {}", i + 1, step.digest_line()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 拼入 prompt 的段落：标题 + 编号摘要；没有已完成步骤时返回空串
    pub fn prompt_section(&self) -> String {
        let summaries = self.action_summaries();
        if summaries.is_empty() {
            return String::new();
        }
        format!(
            "### Previous Actions Summary\nThe following actions have already been performed:\n\n{}\n",
            summaries
        )
    }

    pub fn current_run(&self) -> Option<&Run> {
        self.current_run.as_ref()
    }

    /// 已归档 Run 的副本（按完成顺序）
    pub fn run_history(&self) -> Vec<Run> {
        self.history.clone()
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            current_run: self.current_run.clone(),
            history: self.history.clone(),
            max_steps: self.max_steps,
            action_summaries: self.action_summaries(),
        }
    }

    /// 清空活动 Run 与历史
    pub fn clear(&mut self) {
        self.current_run = None;
        self.history.clear();
    }
}
