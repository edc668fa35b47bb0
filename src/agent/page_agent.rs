//! PageAgent：面向调用方的编排入口
//!
//! 每次调用交给 PageTaskExecutor 执行，随后统一走 after_task_running：追加执行记录、
//! 按失败策略决定是否抛错、从子操作列表推导 metadata。
//! 开启上下文跟踪时，ai_action 在执行前登记步骤、把已完成步骤的摘要拼进规划上下文，
//! 并在执行结束（成功或失败）之后才完成该步骤。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::agent::{AiTaskMetadata, AiTaskResult, GroupedActionDump};
use crate::cache::TaskCache;
use crate::config::AppConfig;
use crate::core::{with_timeout, AgentError};
use crate::inference::{ActionType, AssertResponse, ExtractDemand, Inference, LocateParam, ScrollParam};
use crate::memory::{
    ActionContextIntegrator, ContextEngine, ContextEngineOptions, ContextSnapshot, Run, Summarizer,
};
use crate::page::Page;
use crate::task::{
    build_plans, task_title, ExecutionTask, Executor, PageTaskExecutor, TaskKind, TaskParam, TaskRun,
    CANCELLED,
};

/// ai_assert 选项
#[derive(Debug, Clone, Default)]
pub struct AssertOptions {
    /// 失败时替换默认的 "Assertion failed: {assertion}"
    pub message: Option<String>,
    /// 为 true 时不通过也不抛错，直接返回原始 {pass, thought}
    pub keep_raw_response: bool,
}

/// ai_wait_for 选项；未设置的字段取配置中的默认值
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitForOptions {
    pub timeout_ms: Option<u64>,
    pub check_interval_ms: Option<u64>,
}

pub struct PageAgent {
    page: Arc<dyn Page>,
    tasks: PageTaskExecutor,
    engine: Option<Arc<Mutex<ContextEngine>>>,
    integrator: Option<ActionContextIntegrator>,
    action_context: Option<String>,
    dump: Mutex<GroupedActionDump>,
    dump_path: Option<PathBuf>,
    wait_for_ms: u64,
    wait_for_interval_ms: u64,
    action_timeout: Option<Duration>,
}

impl PageAgent {
    /// 按配置创建 Agent；开启上下文跟踪时立即以 group_name 开启一个 Run
    pub async fn new(
        page: Arc<dyn Page>,
        inference: Arc<dyn Inference>,
        cache: Arc<dyn TaskCache>,
        summarizer: Option<Arc<dyn Summarizer>>,
        config: &AppConfig,
    ) -> Self {
        let tasks = PageTaskExecutor::new(Arc::clone(&page), inference, cache)
            .with_cache_enabled(config.cache.enabled);

        let (engine, integrator) = if config.context.enabled {
            let mut engine = ContextEngine::new(ContextEngineOptions {
                max_steps: config.context.max_steps,
                use_ai_summaries: config.context.ai_summaries,
            });
            if let Some(summarizer) = summarizer {
                engine = engine.with_summarizer(summarizer);
            }
            engine
                .start_run(
                    config.agent.group_name.clone(),
                    config.agent.group_description.clone(),
                )
                .await;
            let engine = Arc::new(Mutex::new(engine));
            let integrator = ActionContextIntegrator::new(Arc::clone(&engine));
            (Some(engine), Some(integrator))
        } else {
            (None, None)
        };

        tracing::info!(
            page_type = page.page_type(),
            context = config.context.enabled,
            cache = config.cache.enabled,
            "page agent created"
        );

        Self {
            page,
            tasks,
            engine,
            integrator,
            action_context: config.agent.action_context.clone(),
            dump: Mutex::new(GroupedActionDump::new(
                config.agent.group_name.clone(),
                config.agent.group_description.clone(),
            )),
            dump_path: config.agent.dump_path.clone(),
            wait_for_ms: config.timeouts.wait_for_ms,
            wait_for_interval_ms: config.timeouts.wait_for_interval_ms,
            action_timeout: config.timeouts.action_ms.map(Duration::from_millis),
        }
    }

    /// 替换内部的任务执行器（用于设置取消令牌、重规划上限等）
    pub fn with_task_executor(mut self, tasks: PageTaskExecutor) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn set_ai_action_context(&mut self, prompt: impl Into<String>) {
        self.action_context = Some(prompt.into());
    }

    /// 上下文跟踪开启时返回记录适配器，供调用方包装自定义操作
    pub fn integrator(&self) -> Option<&ActionContextIntegrator> {
        self.integrator.as_ref()
    }

    /// 上下文引擎的只读快照；未开启上下文跟踪时为 None
    pub async fn context_snapshot(&self) -> Option<ContextSnapshot> {
        match &self.engine {
            Some(engine) => Some(engine.lock().await.snapshot()),
            None => None,
        }
    }

    /// 结束当前 Run（若有）并落盘执行记录
    pub async fn finish(&self) -> Option<Run> {
        let run = match &self.engine {
            Some(engine) => engine.lock().await.complete_run().await,
            None => None,
        };
        self.write_out_action_dumps().await;
        run
    }

    pub async fn dump_data_string(&self) -> Result<String, AgentError> {
        self.dump
            .lock()
            .await
            .to_json_string()
            .map_err(|e| AgentError::Dump(e.to_string()))
    }

    async fn write_out_action_dumps(&self) {
        let Some(path) = &self.dump_path else {
            return;
        };
        if let Err(e) = self.dump.lock().await.write_to(path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write action dump");
        }
    }

    /// 超时被丢弃的调用：补记一条失败的执行记录
    async fn record_abandoned(&self, prompt: &str, error: &AgentError) {
        let mut executor = Executor::new(task_title("Action", prompt));
        executor.append_failed(
            ExecutionTask::new(TaskKind::Planning, "Plan").with_param(TaskParam::prompt(prompt)),
            error.to_string(),
        );
        self.dump.lock().await.append(executor.dump());
        self.write_out_action_dumps().await;
    }

    /// 记录执行、按失败策略决定是否抛错，并推导 metadata
    async fn after_task_running(
        &self,
        executor: &Executor,
        instruction: &str,
        tolerate_error: bool,
    ) -> Result<AiTaskMetadata, AgentError> {
        self.dump.lock().await.append(executor.dump());
        self.write_out_action_dumps().await;

        if executor.is_in_error_state() && !tolerate_error {
            let latest = executor.latest_error_task();
            if latest.and_then(|t| t.error.as_deref()) == Some(CANCELLED) {
                return Err(AgentError::Cancelled);
            }
            let reason = latest.and_then(|t| t.error.as_deref().or(t.thought.as_deref()));
            return Err(AgentError::task_failed(instruction, reason));
        }
        Ok(AiTaskMetadata::from_executor(executor))
    }

    /// 基础上下文 + 已完成步骤摘要
    async fn effective_context(&self) -> Option<String> {
        let digest = match &self.integrator {
            Some(integrator) => integrator.prompt_section().await,
            None => String::new(),
        };
        match (self.action_context.as_deref(), digest.is_empty()) {
            (Some(base), false) => Some(format!("{}\n\n{}", base, digest)),
            (Some(base), true) => Some(base.to_string()),
            (None, false) => Some(digest),
            (None, true) => None,
        }
    }

    pub async fn ai_action(&self, prompt: &str) -> Result<AiTaskResult<Value>, AgentError> {
        if prompt.trim().is_empty() {
            return Err(AgentError::InvalidArgument("missing action prompt".to_string()));
        }

        let handle = match &self.integrator {
            Some(integrator) => Some(integrator.record_action("aiAction", prompt, None).await?),
            None => None,
        };
        let context = self.effective_context().await;

        let outcome = self.run_action(prompt, context.as_deref()).await;

        if let (Some(integrator), Some(handle)) = (&self.integrator, &handle) {
            match &outcome {
                Ok(result) => {
                    integrator
                        .complete_action(handle, true, None, Some(result.result.clone()))
                        .await
                }
                Err(e) => {
                    integrator
                        .complete_action(handle, false, Some(e.to_string()), None)
                        .await
                }
            }
        }
        outcome
    }

    async fn run_action(
        &self,
        prompt: &str,
        context: Option<&str>,
    ) -> Result<AiTaskResult<Value>, AgentError> {
        let run = match self.action_timeout {
            Some(after) => {
                let timed = with_timeout("aiAction", after, async {
                    Ok(self.tasks.action(prompt, context).await)
                })
                .await;
                match timed {
                    Ok(run) => run,
                    Err(e) => {
                        self.record_abandoned(prompt, &e).await;
                        return Err(e);
                    }
                }
            }
            None => self.tasks.action(prompt, context).await,
        };
        let metadata = self.after_task_running(&run.executor, prompt, false).await?;
        Ok(AiTaskResult {
            result: run.output.unwrap_or(Value::Null),
            metadata,
        })
    }

    async fn run_prebuilt(
        &self,
        kind: ActionType,
        title_detail: String,
        locate: Option<LocateParam>,
        param: Option<Value>,
    ) -> Result<(TaskRun<Value>, AiTaskMetadata), AgentError> {
        let title = task_title(&kind.to_string(), &title_detail);
        let run = self
            .tasks
            .run_plans(title.clone(), build_plans(kind, locate, param))
            .await;
        let metadata = self.after_task_running(&run.executor, &title, false).await?;
        Ok((run, metadata))
    }

    pub async fn ai_tap(&self, locate: impl Into<LocateParam>) -> Result<AiTaskResult<Value>, AgentError> {
        let locate = checked_locate(locate.into())?;
        let (run, metadata) = self
            .run_prebuilt(ActionType::Tap, locate.prompt.clone(), Some(locate), None)
            .await?;
        Ok(envelope(run, metadata))
    }

    pub async fn ai_hover(&self, locate: impl Into<LocateParam>) -> Result<AiTaskResult<Value>, AgentError> {
        let locate = checked_locate(locate.into())?;
        let (run, metadata) = self
            .run_prebuilt(ActionType::Hover, locate.prompt.clone(), Some(locate), None)
            .await?;
        Ok(envelope(run, metadata))
    }

    pub async fn ai_input(
        &self,
        value: &str,
        locate: impl Into<LocateParam>,
    ) -> Result<AiTaskResult<Value>, AgentError> {
        let locate = checked_locate(locate.into())?;
        let (run, metadata) = self
            .run_prebuilt(
                ActionType::Input,
                locate.prompt.clone(),
                Some(locate),
                Some(json!({ "value": value })),
            )
            .await?;
        Ok(envelope(run, metadata))
    }

    /// 按键；locate 为 None 时作用于当前焦点
    pub async fn ai_keyboard_press(
        &self,
        key: &str,
        locate: Option<LocateParam>,
    ) -> Result<AiTaskResult<Value>, AgentError> {
        if key.is_empty() {
            return Err(AgentError::InvalidArgument("missing key name".to_string()));
        }
        let locate = locate.map(checked_locate).transpose()?;
        let detail = locate.as_ref().map(|l| l.prompt.clone()).unwrap_or_default();
        let (run, metadata) = self
            .run_prebuilt(
                ActionType::KeyboardPress,
                detail,
                locate,
                Some(json!({ "value": key })),
            )
            .await?;
        Ok(envelope(run, metadata))
    }

    pub async fn ai_scroll(
        &self,
        scroll: ScrollParam,
        locate: Option<LocateParam>,
    ) -> Result<AiTaskResult<Value>, AgentError> {
        let locate = locate.map(checked_locate).transpose()?;
        let detail = match &locate {
            Some(l) => format!("{} - {}", l.prompt, scroll.describe()),
            None => scroll.describe(),
        };
        let param = serde_json::to_value(&scroll)
            .map_err(|e| AgentError::InvalidArgument(e.to_string()))?;
        let (run, metadata) = self
            .run_prebuilt(ActionType::Scroll, detail, locate, Some(param))
            .await?;
        Ok(envelope(run, metadata))
    }

    /// 定位元素，返回 {rect, center}
    pub async fn ai_locate(&self, locate: impl Into<LocateParam>) -> Result<AiTaskResult<Value>, AgentError> {
        let locate = checked_locate(locate.into())?;
        let (run, metadata) = self
            .run_prebuilt(ActionType::Locate, locate.prompt.clone(), Some(locate), None)
            .await?;
        let element = run
            .output
            .as_ref()
            .and_then(|o| o.get("element"))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(AiTaskResult {
            result: json!({ "rect": element.get("rect"), "center": element.get("center") }),
            metadata,
        })
    }

    pub async fn ai_query(&self, demand: Value) -> Result<AiTaskResult<Value>, AgentError> {
        self.run_query(ExtractDemand::Query(demand)).await
    }

    pub async fn ai_boolean(&self, prompt: &str) -> Result<AiTaskResult<Value>, AgentError> {
        self.run_query(ExtractDemand::Boolean(prompt.to_string())).await
    }

    pub async fn ai_number(&self, prompt: &str) -> Result<AiTaskResult<Value>, AgentError> {
        self.run_query(ExtractDemand::Number(prompt.to_string())).await
    }

    pub async fn ai_string(&self, prompt: &str) -> Result<AiTaskResult<Value>, AgentError> {
        self.run_query(ExtractDemand::String(prompt.to_string())).await
    }

    async fn run_query(&self, demand: ExtractDemand) -> Result<AiTaskResult<Value>, AgentError> {
        let instruction = demand.prompt();
        let run = self.tasks.query(demand).await;
        let metadata = self.after_task_running(&run.executor, &instruction, false).await?;
        Ok(envelope(run, metadata))
    }

    pub async fn ai_assert(
        &self,
        assertion: &str,
        message: Option<&str>,
    ) -> Result<AiTaskResult<AssertResponse>, AgentError> {
        self.ai_assert_with(
            assertion,
            AssertOptions {
                message: message.map(str::to_string),
                keep_raw_response: false,
            },
        )
        .await
    }

    /// 断言；执行失败也被容忍，仅根据 pass 决定是否抛出 AssertionFailed
    pub async fn ai_assert_with(
        &self,
        assertion: &str,
        options: AssertOptions,
    ) -> Result<AiTaskResult<AssertResponse>, AgentError> {
        let url = self.page.url().await?;
        let context = format!("Current URL: {}", url);
        let run = self.tasks.assert(assertion, Some(&context)).await;
        let metadata = self.after_task_running(&run.executor, assertion, true).await?;

        match run.output {
            Some(output) if output.pass || options.keep_raw_response => Ok(AiTaskResult {
                result: output,
                metadata,
            }),
            output => {
                let reason = output
                    .and_then(|o| o.thought)
                    .filter(|t| !t.is_empty())
                    .or_else(|| run.executor.latest_error_task().and_then(|t| t.error.clone()))
                    .unwrap_or_else(|| "(no_reason)".to_string());
                Err(AgentError::AssertionFailed {
                    message: options
                        .message
                        .unwrap_or_else(|| format!("Assertion failed: {}", assertion)),
                    reason,
                })
            }
        }
    }

    /// 等待条件成立；超时不抛错，result 为条件最终是否成立
    pub async fn ai_wait_for(
        &self,
        assertion: &str,
        options: WaitForOptions,
    ) -> Result<AiTaskResult<bool>, AgentError> {
        let timeout_ms = options.timeout_ms.unwrap_or(self.wait_for_ms);
        let interval_ms = options.check_interval_ms.unwrap_or(self.wait_for_interval_ms);
        let run = self.tasks.wait_for(assertion, timeout_ms, interval_ms).await;
        let metadata = self.after_task_running(&run.executor, assertion, true).await?;
        Ok(AiTaskResult {
            result: run.output.unwrap_or(false),
            metadata,
        })
    }

    /// 按类型分派：action / query / assert / tap
    pub async fn ai(&self, prompt: &str, kind: &str) -> Result<AiTaskResult<Value>, AgentError> {
        match kind {
            "action" => self.ai_action(prompt).await,
            "query" => self.ai_query(Value::String(prompt.to_string())).await,
            "assert" => {
                let res = self.ai_assert(prompt, None).await?;
                let result = serde_json::to_value(&res.result)
                    .map_err(|e| AgentError::InvalidArgument(e.to_string()))?;
                Ok(AiTaskResult {
                    result,
                    metadata: res.metadata,
                })
            }
            "tap" => self.ai_tap(prompt).await,
            other => Err(AgentError::UnknownAiType(other.to_string())),
        }
    }
}

fn checked_locate(locate: LocateParam) -> Result<LocateParam, AgentError> {
    if locate.prompt.trim().is_empty() {
        return Err(AgentError::InvalidArgument("missing locate prompt".to_string()));
    }
    Ok(locate)
}

fn envelope(run: TaskRun<Value>, metadata: AiTaskMetadata) -> AiTaskResult<Value> {
    AiTaskResult {
        result: run.output.unwrap_or(Value::Null),
        metadata,
    }
}
