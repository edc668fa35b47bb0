//! PageTaskExecutor：把一次高层调用展开成子操作流水线
//!
//! 每次调用新建一个 Executor 并随结果一起返回。Planning 与 Insight(Locate) 两类
//! 子操作在调用推理服务前先查缓存：指纹由语义输入与当前页面签名计算，命中则跳过外部调用。
//! 缓存读写失败一律降级为未命中，不影响流水线结果。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheKind, CachedPayload, Fingerprint, TaskCache};
use crate::inference::{
    ActionType, AssertResponse, ExtractDemand, Inference, LocateParam, PlanResponse,
    PrimitiveAction,
};
use crate::page::{ElementInfo, Page};
use crate::task::plans::{expand_plans, task_title};
use crate::task::{ExecutionTask, Executor, TaskFailure, TaskKind, TaskOutcome, TaskParam};

/// 单次 action 调用允许的最大规划轮数
pub const DEFAULT_MAX_REPLANS: usize = 10;

const DEFAULT_SLEEP_MS: u64 = 1000;

/// 一次调用的结果：完整的子操作记录 + 输出（失败时为 None）
pub struct TaskRun<T> {
    pub executor: Executor,
    pub output: Option<T>,
}

pub struct PageTaskExecutor {
    page: Arc<dyn Page>,
    inference: Arc<dyn Inference>,
    cache: Arc<dyn TaskCache>,
    cache_enabled: bool,
    max_replans: usize,
    cancel: Option<CancellationToken>,
}

impl PageTaskExecutor {
    pub fn new(page: Arc<dyn Page>, inference: Arc<dyn Inference>, cache: Arc<dyn TaskCache>) -> Self {
        Self {
            page,
            inference,
            cache,
            cache_enabled: true,
            max_replans: DEFAULT_MAX_REPLANS,
            cancel: None,
        }
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_max_replans(mut self, max_replans: usize) -> Self {
        self.max_replans = max_replans.max(1);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn page(&self) -> &Arc<dyn Page> {
        &self.page
    }

    fn executor(&self, name: String) -> Executor {
        let executor = Executor::new(name);
        match &self.cancel {
            Some(token) => executor.with_cancel(token.clone()),
            None => executor,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(|t| t.is_cancelled()).unwrap_or(false)
    }

    /// 自然语言指令：规划 → (定位 → 操作)*，需要时基于新页面重新规划
    pub async fn action(&self, prompt: &str, context: Option<&str>) -> TaskRun<Value> {
        let mut executor = self.executor(task_title("Action", prompt));
        let mut output = None;
        let mut rounds = 0;

        loop {
            rounds += 1;
            let idx = executor.append(
                ExecutionTask::new(TaskKind::Planning, "Plan").with_param(TaskParam::prompt(prompt)),
            );
            // 只有首轮规划读写缓存：后续轮次依赖前面操作的效果，而页面签名未必能体现
            let cacheable = rounds == 1;
            let planned = executor.run(idx, self.plan_task(prompt, context, cacheable)).await;
            let Some(plan) = planned else {
                break;
            };

            let more = plan.more_actions_needed;
            let answer = plan.answer;
            let plans = expand_plans(plan.actions);
            let Some(last) = self.execute_plans(&mut executor, &plans).await else {
                break;
            };
            match answer {
                Some(answer) => output = Some(answer),
                None if !plans.is_empty() => output = Some(last),
                None => {}
            }

            if !more {
                break;
            }
            if rounds >= self.max_replans {
                executor.append_failed(
                    ExecutionTask::new(TaskKind::Planning, "Plan").with_param(TaskParam::prompt(prompt)),
                    format!("Replanned too many times (limit {})", self.max_replans),
                );
                break;
            }
            tracing::debug!(prompt, round = rounds, "more actions needed, replanning");
        }

        TaskRun { executor, output }
    }

    /// 执行预置计划（tap / hover / input / keyboard / scroll / locate）
    pub async fn run_plans(&self, title: String, plans: Vec<PrimitiveAction>) -> TaskRun<Value> {
        let mut executor = self.executor(title);
        let output = self.execute_plans(&mut executor, &plans).await;
        TaskRun { executor, output }
    }

    pub async fn query(&self, demand: ExtractDemand) -> TaskRun<Value> {
        let mut executor = self.executor(task_title(demand.sub_type(), &demand.prompt()));
        let idx = executor.append(
            ExecutionTask::new(TaskKind::Insight, demand.sub_type())
                .with_param(TaskParam::prompt(demand.prompt())),
        );
        let output = executor.run(idx, self.extract_task(&demand)).await;
        TaskRun { executor, output }
    }

    pub async fn boolean(&self, prompt: &str) -> TaskRun<Value> {
        self.query(ExtractDemand::Boolean(prompt.to_string())).await
    }

    pub async fn number(&self, prompt: &str) -> TaskRun<Value> {
        self.query(ExtractDemand::Number(prompt.to_string())).await
    }

    pub async fn string(&self, prompt: &str) -> TaskRun<Value> {
        self.query(ExtractDemand::String(prompt.to_string())).await
    }

    /// 断言；不通过不算子操作失败，由调用方根据 pass 决定
    pub async fn assert(&self, assertion: &str, context: Option<&str>) -> TaskRun<AssertResponse> {
        let mut executor = self.executor(task_title("Assert", assertion));
        let idx = executor.append(
            ExecutionTask::new(TaskKind::Assertion, "Assert").with_param(TaskParam::prompt(assertion)),
        );
        let output = executor.run(idx, self.assert_task(assertion, context)).await;
        TaskRun { executor, output }
    }

    /// 反复断言直到通过或超时；超时追加一个失败的 Assertion 子操作，输出 false
    pub async fn wait_for(&self, assertion: &str, timeout_ms: u64, interval_ms: u64) -> TaskRun<bool> {
        let mut executor = self.executor(task_title("WaitFor", assertion));
        let started = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let interval = Duration::from_millis(interval_ms);
        let mut last_thought = None;

        loop {
            let idx = executor.append(
                ExecutionTask::new(TaskKind::Assertion, "WaitFor")
                    .with_param(TaskParam::prompt(assertion)),
            );
            match executor.run(idx, self.assert_task(assertion, None)).await {
                Some(resp) if resp.pass => {
                    return TaskRun {
                        executor,
                        output: Some(true),
                    };
                }
                Some(resp) => last_thought = resp.thought,
                None if self.is_cancelled() => {
                    return TaskRun {
                        executor,
                        output: Some(false),
                    };
                }
                None => {}
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                break;
            }
            let pause = interval.min(timeout - elapsed);
            match &self.cancel {
                Some(token) => {
                    tokio::select! {
                        _ = tokio::time::sleep(pause) => {}
                        _ = token.cancelled() => {
                            return TaskRun { executor, output: Some(false) };
                        }
                    }
                }
                None => tokio::time::sleep(pause).await,
            }
        }

        let mut task = ExecutionTask::new(TaskKind::Assertion, "WaitFor")
            .with_param(TaskParam::prompt(assertion));
        task.thought = last_thought;
        executor.append_failed(task, format!("waitFor timeout: {}", assertion));
        TaskRun {
            executor,
            output: Some(false),
        }
    }

    /// 先把所有计划登记为 pending，再按顺序执行；遇到失败即停，其余保持 pending
    async fn execute_plans(&self, executor: &mut Executor, plans: &[PrimitiveAction]) -> Option<Value> {
        let indexed: Vec<(usize, &PrimitiveAction)> = plans
            .iter()
            .map(|plan| (executor.append(task_for_plan(plan)), plan))
            .collect();

        let mut element: Option<ElementInfo> = None;
        let mut last = Value::Null;
        for (idx, plan) in indexed {
            if plan.action_type == ActionType::Locate {
                let found = match plan.locate.as_ref() {
                    Some(locate) => executor.run(idx, self.locate_task(locate)).await?,
                    None => {
                        executor
                            .run::<ElementInfo, _>(idx, async {
                                Err(TaskFailure::new("missing locate prompt"))
                            })
                            .await?
                    }
                };
                last = element_output(&found);
                element = Some(found);
            } else {
                last = executor
                    .run(idx, self.action_task(plan, element.take()))
                    .await?;
            }
        }
        Some(last)
    }

    async fn cache_get(&self, fingerprint: &Fingerprint) -> Option<CachedPayload> {
        if !self.cache_enabled {
            return None;
        }
        match self.cache.get(fingerprint).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(fingerprint = %fingerprint, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn cache_put(&self, fingerprint: Fingerprint, payload: CachedPayload) {
        if !self.cache_enabled {
            return;
        }
        if let Err(e) = self.cache.put(fingerprint.clone(), payload).await {
            tracing::warn!(fingerprint = %fingerprint, error = %e, "cache write failed");
        }
    }

    async fn plan_task(
        &self,
        prompt: &str,
        context: Option<&str>,
        cacheable: bool,
    ) -> Result<(PlanResponse, TaskOutcome), TaskFailure> {
        let snapshot = self.page.snapshot().await?;
        let fingerprint = Fingerprint::compute(
            CacheKind::Plan,
            &[prompt, context.unwrap_or("")],
            &snapshot.signature(),
        );

        let cached = if cacheable {
            self.cache_get(&fingerprint).await
        } else {
            None
        };
        let (plan, hit) = match cached {
            Some(CachedPayload::Plan(plan)) => (plan, true),
            _ => {
                let plan = self.inference.plan(prompt, context, &snapshot).await?;
                if let Some(error) = &plan.error {
                    return Err(TaskFailure::new(error.clone())
                        .with_thought(plan.thought.clone())
                        .with_usage(plan.usage));
                }
                if cacheable {
                    self.cache_put(fingerprint.clone(), CachedPayload::Plan(plan.clone()))
                        .await;
                }
                (plan, false)
            }
        };
        tracing::debug!(fingerprint = %fingerprint, hit, actions = plan.actions.len(), "plan resolved");

        let output = serde_json::to_value(&plan).map_err(|e| TaskFailure::new(e.to_string()))?;
        let outcome = TaskOutcome::output(output)
            .with_thought(plan.thought.clone())
            .with_usage(plan.usage)
            .with_cache(hit)
            .with_plans(plan.actions.clone());
        Ok((plan, outcome))
    }

    async fn locate_task(&self, locate: &LocateParam) -> Result<(ElementInfo, TaskOutcome), TaskFailure> {
        let snapshot = self.page.snapshot().await?;
        let fingerprint = Fingerprint::compute(
            CacheKind::Locate,
            &[locate.prompt.as_str()],
            &snapshot.signature(),
        );

        let cached = if locate.cacheable {
            self.cache_get(&fingerprint).await
        } else {
            None
        };
        // 命中但元素已不在当前快照中时按未命中处理
        let (resp, hit) = match cached {
            Some(CachedPayload::Locate(resp))
                if resp
                    .element_id
                    .as_deref()
                    .and_then(|id| snapshot.element(id))
                    .is_some() =>
            {
                (resp, true)
            }
            _ => (self.inference.locate(locate, &snapshot).await?, false),
        };

        let element = resp
            .element_id
            .as_deref()
            .and_then(|id| snapshot.element(id))
            .cloned();
        let Some(element) = element else {
            let reason = resp
                .error
                .clone()
                .unwrap_or_else(|| format!("Element not found: {}", locate.prompt));
            return Err(TaskFailure::new(reason)
                .with_thought(resp.thought)
                .with_usage(resp.usage));
        };

        if !hit && locate.cacheable {
            self.cache_put(fingerprint, CachedPayload::Locate(resp.clone()))
                .await;
        }

        let outcome = TaskOutcome::output(element_output(&element))
            .with_thought(resp.thought)
            .with_usage(resp.usage)
            .with_cache(hit);
        Ok((element, outcome))
    }

    async fn action_task(
        &self,
        action: &PrimitiveAction,
        element: Option<ElementInfo>,
    ) -> Result<(Value, TaskOutcome), TaskFailure> {
        let thought = action.thought.clone();
        match action.action_type {
            ActionType::Error => {
                let reason = thought
                    .clone()
                    .unwrap_or_else(|| "planner reported an error".to_string());
                Err(TaskFailure::new(reason).with_thought(thought))
            }
            ActionType::Finished => Ok((Value::Null, TaskOutcome::default().with_thought(thought))),
            ActionType::Sleep => {
                let ms = action
                    .param
                    .as_ref()
                    .and_then(|p| p.get("timeMs"))
                    .and_then(Value::as_u64)
                    .unwrap_or(DEFAULT_SLEEP_MS);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                let output = json!({ "sleptMs": ms });
                Ok((output.clone(), TaskOutcome::output(output).with_thought(thought)))
            }
            _ => {
                let output = self.page.perform(action, element.as_ref()).await?;
                Ok((output.clone(), TaskOutcome::output(output).with_thought(thought)))
            }
        }
    }

    async fn extract_task(&self, demand: &ExtractDemand) -> Result<(Value, TaskOutcome), TaskFailure> {
        let snapshot = self.page.snapshot().await?;
        let resp = self.inference.extract(demand, &snapshot).await?;
        if let Some(error) = resp.error {
            return Err(TaskFailure::new(error)
                .with_thought(resp.thought)
                .with_usage(resp.usage));
        }
        if !demand.accepts(&resp.data) {
            return Err(TaskFailure::new(format!(
                "Expected a {} value, got {}",
                demand.sub_type().to_lowercase(),
                resp.data
            ))
            .with_thought(resp.thought)
            .with_usage(resp.usage));
        }
        let outcome = TaskOutcome::output(resp.data.clone())
            .with_thought(resp.thought)
            .with_usage(resp.usage);
        Ok((resp.data, outcome))
    }

    async fn assert_task(
        &self,
        assertion: &str,
        context: Option<&str>,
    ) -> Result<(AssertResponse, TaskOutcome), TaskFailure> {
        let snapshot = self.page.snapshot().await?;
        let resp = self.inference.assert(assertion, context, &snapshot).await?;
        let outcome = TaskOutcome::output(json!({ "pass": resp.pass, "thought": resp.thought }))
            .with_thought(resp.thought.clone())
            .with_usage(resp.usage);
        Ok((resp, outcome))
    }
}

fn task_for_plan(plan: &PrimitiveAction) -> ExecutionTask {
    if plan.action_type == ActionType::Locate {
        let mut task = ExecutionTask::new(TaskKind::Insight, "Locate");
        task.locate = plan.locate.clone();
        return task;
    }
    let mut task = ExecutionTask::new(TaskKind::Action, plan.action_type.to_string());
    task.locate = plan.locate.clone();
    task.thought = plan.thought.clone();
    task.param = plan.param.clone().map(TaskParam::value);
    task
}

fn element_output(element: &ElementInfo) -> Value {
    let (x, y) = element.center();
    json!({
        "element": {
            "id": element.id,
            "content": element.content,
            "rect": element.rect,
            "center": [x, y],
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryTaskCache;
    use crate::inference::{ExtractResponse, InferenceError, LocateResponse, ScriptedInference};
    use crate::page::{PageSnapshot, Rect, StaticPage};
    use crate::task::plans::build_plans;
    use crate::task::TaskStatus;

    fn login_page() -> Arc<StaticPage> {
        Arc::new(StaticPage::new(PageSnapshot::new(
            "https://example.com/login",
            "Login",
            vec![
                ElementInfo::new("e1", "textbox", "Email", Rect::new(10.0, 10.0, 200.0, 30.0)),
                ElementInfo::new("e2", "button", "Sign in", Rect::new(10.0, 60.0, 80.0, 30.0)),
            ],
        )))
    }

    fn executor_with(
        page: Arc<StaticPage>,
        inference: Arc<ScriptedInference>,
        cache: Arc<InMemoryTaskCache>,
    ) -> PageTaskExecutor {
        PageTaskExecutor::new(page, inference, cache)
    }

    fn login_plan() -> PlanResponse {
        PlanResponse {
            actions: vec![
                PrimitiveAction::new(ActionType::Input)
                    .with_locate(LocateParam::new("Email"))
                    .with_param(json!({"value": "a@b.c"})),
                PrimitiveAction::new(ActionType::Tap).with_locate(LocateParam::new("Sign in")),
            ],
            thought: Some("fill the form then submit".into()),
            ..PlanResponse::default()
        }
    }

    #[tokio::test]
    async fn test_action_runs_plan() {
        let page = login_page();
        let inference = Arc::new(ScriptedInference::new());
        inference.push_plan(login_plan());
        let tasks = executor_with(page.clone(), inference.clone(), Arc::new(InMemoryTaskCache::new()));

        let run = tasks.action("log in", None).await;
        assert!(!run.executor.is_in_error_state());
        let kinds: Vec<_> = run.executor.tasks().iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TaskKind::Planning,
                TaskKind::Insight,
                TaskKind::Action,
                TaskKind::Insight,
                TaskKind::Action
            ]
        );
        let performed = page.performed();
        assert_eq!(performed.len(), 2);
        assert_eq!(performed[0].element_id.as_deref(), Some("e1"));
        assert_eq!(performed[1].action_type, ActionType::Tap);
        let plans = run.executor.tasks()[0].param.as_ref().unwrap().plans.as_ref().unwrap();
        assert_eq!(plans.len(), 2);
    }

    #[tokio::test]
    async fn test_plan_cache_round_trip() {
        let page = login_page();
        let inference = Arc::new(ScriptedInference::new());
        inference.push_plan(login_plan());
        let cache = Arc::new(InMemoryTaskCache::new());
        let tasks = executor_with(page, inference.clone(), cache.clone());

        let first = tasks.action("log in", None).await;
        let second = tasks.action("log in", None).await;
        assert_eq!(inference.plan_calls(), 1);
        assert_eq!(inference.locate_calls(), 2);

        let a = &first.executor.tasks()[0];
        let b = &second.executor.tasks()[0];
        assert!(!a.cache.unwrap().hit);
        assert!(b.cache.unwrap().hit);
        assert_eq!(a.output, b.output);
        assert!(second.executor.tasks()[1].cache.unwrap().hit);
    }

    #[tokio::test]
    async fn test_cache_disabled_always_calls() {
        let inference = Arc::new(ScriptedInference::new());
        inference.push_plan(login_plan()).push_plan(login_plan());
        let tasks = executor_with(login_page(), inference.clone(), Arc::new(InMemoryTaskCache::new()))
            .with_cache_enabled(false);
        tasks.action("log in", None).await;
        tasks.action("log in", None).await;
        assert_eq!(inference.plan_calls(), 2);
    }

    #[tokio::test]
    async fn test_context_changes_plan_fingerprint() {
        let inference = Arc::new(ScriptedInference::new());
        inference.push_plan(login_plan()).push_plan(login_plan());
        let tasks = executor_with(login_page(), inference.clone(), Arc::new(InMemoryTaskCache::new()));
        tasks.action("log in", None).await;
        tasks.action("log in", Some("1. aiTap: open login (success)")).await;
        assert_eq!(inference.plan_calls(), 2);
    }

    #[tokio::test]
    async fn test_locate_failure_leaves_rest_pending() {
        let inference = Arc::new(ScriptedInference::new());
        inference.push_locate(LocateResponse {
            element_id: None,
            thought: Some("nothing looks like a logout link".into()),
            ..LocateResponse::default()
        });
        let tasks = executor_with(login_page(), inference, Arc::new(InMemoryTaskCache::new()));
        let run = tasks
            .run_plans(
                "Tap - Log out".into(),
                build_plans(ActionType::Tap, Some(LocateParam::new("Log out")), None),
            )
            .await;
        assert!(run.output.is_none());
        let tasks = run.executor.tasks();
        assert_eq!(tasks[0].status, TaskStatus::Failed);
        assert_eq!(tasks[0].error.as_deref(), Some("Element not found: Log out"));
        assert_eq!(tasks[0].thought.as_deref(), Some("nothing looks like a logout link"));
        assert_eq!(tasks[1].status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_plan_error_fails_planning() {
        let inference = Arc::new(ScriptedInference::new());
        inference.push_plan(PlanResponse {
            error: Some("page has no login form".into()),
            ..PlanResponse::default()
        });
        let cache = Arc::new(InMemoryTaskCache::new());
        let tasks = executor_with(login_page(), inference, cache.clone());
        let run = tasks.action("log in", None).await;
        assert!(run.executor.is_in_error_state());
        assert_eq!(
            run.executor.latest_error_task().unwrap().error.as_deref(),
            Some("page has no login form")
        );
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_replan_limit() {
        let inference = Arc::new(ScriptedInference::new());
        for _ in 0..3 {
            inference.push_plan(PlanResponse {
                more_actions_needed: true,
                ..PlanResponse::default()
            });
        }
        let tasks = executor_with(login_page(), inference.clone(), Arc::new(InMemoryTaskCache::new()))
            .with_cache_enabled(false)
            .with_max_replans(2);
        let run = tasks.action("keep going", None).await;
        assert_eq!(inference.plan_calls(), 2);
        let err = run.executor.latest_error_task().unwrap();
        assert!(err.error.as_deref().unwrap().contains("Replanned too many times"));
    }

    #[tokio::test]
    async fn test_replan_with_cache_matches_uncached() {
        async fn replan_once(cache_enabled: bool) -> (bool, usize, usize, usize) {
            let page = login_page();
            let inference = Arc::new(ScriptedInference::new());
            inference
                .push_plan(PlanResponse {
                    actions: vec![PrimitiveAction::new(ActionType::Input)
                        .with_locate(LocateParam::new("Email"))
                        .with_param(json!({"value": "a@b.c"}))],
                    more_actions_needed: true,
                    ..PlanResponse::default()
                })
                .push_plan(PlanResponse::default());
            let cache = Arc::new(InMemoryTaskCache::new());
            let tasks = executor_with(page.clone(), inference.clone(), cache.clone())
                .with_cache_enabled(cache_enabled);
            let run = tasks.action("fill the email", None).await;
            (
                run.executor.is_in_error_state(),
                inference.plan_calls(),
                page.performed().len(),
                cache.len().await,
            )
        }

        let uncached = replan_once(false).await;
        let cached = replan_once(true).await;
        assert_eq!(uncached.0, cached.0);
        assert!(!cached.0);
        assert_eq!(uncached.1, cached.1);
        assert_eq!(cached.1, 2);
        assert_eq!(uncached.2, cached.2);
        assert_eq!(cached.2, 1);
        // 首轮规划 + 一次定位
        assert_eq!(cached.3, 2);
    }

    #[tokio::test]
    async fn test_query_type_check() {
        let inference = Arc::new(ScriptedInference::new());
        inference
            .push_extract(ExtractResponse {
                data: json!(3),
                ..ExtractResponse::default()
            })
            .push_extract(ExtractResponse {
                data: json!("three"),
                ..ExtractResponse::default()
            });
        let tasks = executor_with(login_page(), inference, Arc::new(InMemoryTaskCache::new()));

        let ok = tasks.number("how many inputs").await;
        assert_eq!(ok.output, Some(json!(3)));
        let bad = tasks.number("how many inputs").await;
        assert!(bad.output.is_none());
        assert!(bad.executor.is_in_error_state());
    }

    #[tokio::test]
    async fn test_assert_not_pass_is_not_task_failure() {
        let inference = Arc::new(ScriptedInference::new());
        inference.push_assert(AssertResponse {
            pass: false,
            thought: Some("no welcome text".into()),
            usage: None,
        });
        let tasks = executor_with(login_page(), inference, Arc::new(InMemoryTaskCache::new()));
        let run = tasks.assert("welcome is shown", None).await;
        assert!(!run.executor.is_in_error_state());
        assert!(!run.output.unwrap().pass);
    }

    #[tokio::test]
    async fn test_wait_for_passes_eventually() {
        let inference = Arc::new(ScriptedInference::new());
        inference
            .push_assert(AssertResponse::default())
            .push_assert(AssertResponse {
                pass: true,
                ..AssertResponse::default()
            });
        let tasks = executor_with(login_page(), inference.clone(), Arc::new(InMemoryTaskCache::new()));
        let run = tasks.wait_for("dashboard loaded", 1000, 10).await;
        assert_eq!(run.output, Some(true));
        assert_eq!(inference.assert_calls(), 2);
    }

    #[tokio::test]
    async fn test_wait_for_timeout_appends_failed_task() {
        let inference = Arc::new(ScriptedInference::new());
        inference.push_assert(AssertResponse {
            pass: false,
            thought: Some("still loading".into()),
            usage: None,
        });
        inference.push_assert_error(InferenceError::Unavailable("offline".into()));
        let tasks = executor_with(login_page(), inference, Arc::new(InMemoryTaskCache::new()));
        let run = tasks.wait_for("dashboard loaded", 30, 20).await;
        assert_eq!(run.output, Some(false));
        let last = run.executor.tasks().last().unwrap();
        assert_eq!(last.status, TaskStatus::Failed);
        assert_eq!(last.error.as_deref(), Some("waitFor timeout: dashboard loaded"));
    }

    #[tokio::test]
    async fn test_cancelled_executor_fails_fast() {
        let token = CancellationToken::new();
        token.cancel();
        let inference = Arc::new(ScriptedInference::new());
        inference.push_plan(login_plan());
        let tasks = executor_with(login_page(), inference.clone(), Arc::new(InMemoryTaskCache::new()))
            .with_cancel(token);
        let run = tasks.action("log in", None).await;
        assert_eq!(
            run.executor.latest_error_task().unwrap().error.as_deref(),
            Some("cancelled")
        );
        assert_eq!(inference.plan_calls(), 0);
    }
}
