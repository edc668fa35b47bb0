//! 结果信封：{ result, metadata }
//!
//! metadata 完全由 Executor 的子操作列表推导，不重新执行任何东西。字段名与形状
//! 供下游报告 / 调试工具直接消费，保持 camelCase，空值字段不输出。

use serde::Serialize;
use serde_json::Value;

use crate::inference::{LocateParam, PrimitiveAction};
use crate::llm::TokenUsage;
use crate::task::{CacheHit, Executor, TaskKind, TaskStatus, TaskTiming};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiTaskResult<T> {
    pub result: T,
    pub metadata: AiTaskMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanningInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub elements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDetail {
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub sub_type: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub sub_type: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locate: Option<LocateParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<TaskTiming>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiTaskMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// 所有非空 thought，按子操作顺序以换行拼接
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locate: Option<Vec<LocateParam>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<Vec<PrimitiveAction>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning: Option<PlanningInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<InsightInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionInfo>,
    pub action_details: Vec<ActionDetail>,
    pub tasks: Vec<TaskDetail>,
}

impl AiTaskMetadata {
    pub fn from_executor(executor: &Executor) -> Self {
        let tasks = executor.tasks();
        let last = tasks.last();

        let thoughts: Vec<&str> = tasks
            .iter()
            .filter_map(|t| t.thought.as_deref())
            .filter(|t| !t.is_empty())
            .collect();
        let locates: Vec<LocateParam> = tasks.iter().filter_map(|t| t.locate.clone()).collect();
        let plans: Vec<Vec<PrimitiveAction>> = tasks
            .iter()
            .filter_map(|t| t.param.as_ref().and_then(|p| p.plans.clone()))
            .collect();

        let of_kind = |kind: TaskKind| tasks.iter().filter(move |t| t.kind == kind);

        let planning_steps: Vec<String> = of_kind(TaskKind::Planning)
            .map(|t| t.thought.clone().unwrap_or_else(|| "Planning step".to_string()))
            .collect();
        let insight_elements: Vec<String> = of_kind(TaskKind::Insight)
            .map(|t| t.thought.clone().unwrap_or_else(|| "Insight element".to_string()))
            .collect();
        let has_action = of_kind(TaskKind::Action).next().is_some();

        Self {
            status: last.map(|t| t.status),
            start: last.and_then(|t| t.timing).map(|t| t.start),
            end: last.and_then(|t| t.timing).map(|t| t.end),
            total_time: last.and_then(|t| t.timing).map(|t| t.cost),
            cache: last.and_then(|t| t.cache),
            usage: last.and_then(|t| t.usage),
            thought: if thoughts.is_empty() {
                None
            } else {
                Some(thoughts.join("\n"))
            },
            locate: (!locates.is_empty()).then_some(locates),
            plan: (!plans.is_empty()).then_some(plans),
            planning: (!planning_steps.is_empty()).then(|| PlanningInfo {
                kind: "Planning".to_string(),
                description: "Planning for task execution".to_string(),
                steps: planning_steps,
            }),
            insight: (!insight_elements.is_empty()).then(|| InsightInfo {
                kind: "Insight".to_string(),
                description: "Insight for task execution".to_string(),
                elements: insight_elements,
            }),
            action: has_action.then(|| ActionInfo {
                kind: "Action".to_string(),
                description: "Action for task execution".to_string(),
                result: last.and_then(|t| t.output.clone()),
            }),
            action_details: tasks
                .iter()
                .map(|t| ActionDetail {
                    kind: t.kind,
                    sub_type: t.sub_type.clone(),
                    status: t.status,
                    thought: t.thought.clone(),
                })
                .collect(),
            tasks: tasks
                .iter()
                .map(|t| TaskDetail {
                    kind: t.kind,
                    sub_type: t.sub_type.clone(),
                    status: t.status,
                    thought: t.thought.clone(),
                    locate: t.locate.clone(),
                    timing: t.timing,
                    usage: t.usage,
                    cache: t.cache,
                    error: t.error.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::ActionType;
    use crate::task::{ExecutionTask, TaskFailure, TaskOutcome};
    use serde_json::json;

    async fn sample_executor() -> Executor {
        let mut executor = Executor::new("Action - log in");
        let plan = executor.append(ExecutionTask::new(TaskKind::Planning, "Plan"));
        let locate = executor.append(
            ExecutionTask::new(TaskKind::Insight, "Locate").with_locate(LocateParam::new("Sign in")),
        );
        let tap = executor.append(ExecutionTask::new(TaskKind::Action, "Tap"));

        let plans = vec![PrimitiveAction::new(ActionType::Tap)];
        executor
            .run(plan, async move {
                Ok(((), TaskOutcome::default()
                    .with_thought(Some("click sign in".into()))
                    .with_plans(plans)
                    .with_usage(Some(TokenUsage::new(100, 20)))))
            })
            .await;
        executor
            .run(locate, async {
                Ok(((), TaskOutcome::output(json!({"element": {"id": "e2"}})).with_cache(true)))
            })
            .await;
        executor
            .run::<(), _>(tap, async { Err(TaskFailure::new("click intercepted")) })
            .await;
        executor
    }

    #[tokio::test]
    async fn test_metadata_from_executor() {
        let executor = sample_executor().await;
        let meta = AiTaskMetadata::from_executor(&executor);

        assert_eq!(meta.status, Some(TaskStatus::Failed));
        assert!(meta.total_time.is_some());
        assert_eq!(meta.thought.as_deref(), Some("click sign in"));
        assert_eq!(meta.locate.as_ref().unwrap()[0].prompt, "Sign in");
        assert_eq!(meta.plan.as_ref().unwrap().len(), 1);
        assert_eq!(meta.planning.as_ref().unwrap().steps, vec!["click sign in"]);
        assert_eq!(meta.insight.as_ref().unwrap().elements, vec!["Insight element"]);
        assert!(meta.action.is_some());
        assert_eq!(meta.action_details.len(), 3);
        assert_eq!(meta.tasks[2].error.as_deref(), Some("click intercepted"));
        assert_eq!(meta.tasks[1].cache, Some(CacheHit { hit: true }));
    }

    #[tokio::test]
    async fn test_metadata_wire_names() {
        let executor = sample_executor().await;
        let v = serde_json::to_value(AiTaskMetadata::from_executor(&executor)).unwrap();
        for key in ["status", "start", "end", "totalTime", "thought", "locate", "plan", "planning", "insight", "action", "actionDetails", "tasks"] {
            assert!(v.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(v["status"], "failed");
        assert_eq!(v["actionDetails"][0]["type"], "Planning");
        assert_eq!(v["actionDetails"][0]["subType"], "Plan");
        assert_eq!(v["planning"]["type"], "Planning");
    }

    #[test]
    fn test_empty_executor() {
        let meta = AiTaskMetadata::from_executor(&Executor::new("empty"));
        assert!(meta.status.is_none());
        assert!(meta.thought.is_none());
        assert!(meta.planning.is_none());
        assert!(meta.tasks.is_empty());
    }
}
