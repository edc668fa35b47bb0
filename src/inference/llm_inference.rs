//! LlmInference：基于 LlmClient 的推理适配
//!
//! 每种请求拼一条 system prompt（任务说明 + schemars 生成的响应 JSON Schema）和一条
//! user prompt（页面快照文本 + 指令），再从回复中提取 JSON 反序列化为响应类型。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

use crate::inference::{
    AssertResponse, ExtractDemand, ExtractResponse, Inference, InferenceError, LocateParam,
    LocateResponse, PlanResponse,
};
use crate::llm::{parse_json_reply, LlmClient, LlmError, Message, TokenUsage};
use crate::page::PageSnapshot;

const PLAN_SYSTEM: &str = "You are a UI automation planner. Break the user's instruction into \
primitive actions on the page below. Refer to target elements with a `locate.prompt` that \
describes them in natural language. Set `moreActionsNeeded` to true when the page must be \
re-inspected after these actions. If the instruction can be answered without acting, put it in \
`answer` and return no actions. Reply with a single JSON object matching this schema:";

const LOCATE_SYSTEM: &str = "You locate one element on a UI page. Each element line starts with \
its id in brackets. Return the id of the element that best matches the description, or null \
when nothing matches. Reply with a single JSON object matching this schema:";

const EXTRACT_SYSTEM: &str = "You extract data from a UI page. Return the requested data in \
`data`, shaped as the demand describes. Reply with a single JSON object matching this schema:";

const ASSERT_SYSTEM: &str = "You verify an assertion about a UI page. Set `pass` to whether the \
assertion holds and explain briefly in `thought`. Reply with a single JSON object matching this \
schema:";

/// 返回类型 T 的 JSON Schema 字符串，拼入 system prompt
fn schema_json<T: JsonSchema>() -> String {
    let schema = schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// LLM 推理适配器
pub struct LlmInference {
    llm: Arc<dyn LlmClient>,
}

impl LlmInference {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    async fn ask<T: DeserializeOwned + JsonSchema>(
        &self,
        system: &str,
        user: String,
    ) -> Result<(T, Option<TokenUsage>), InferenceError> {
        let messages = vec![
            Message::system(format!("{}\n{}", system, schema_json::<T>())),
            Message::user(user),
        ];
        let completion = self.llm.complete(&messages).await?;
        let parsed = parse_json_reply::<T>(&completion.content).map_err(|e| match e {
            LlmError::InvalidResponse(msg) => InferenceError::InvalidResponse(msg),
            other => InferenceError::Llm(other),
        })?;
        Ok((parsed, completion.usage))
    }
}

fn page_block(snapshot: &PageSnapshot) -> String {
    format!("## Page\n{}\n", snapshot.text_representation())
}

#[async_trait]
impl Inference for LlmInference {
    async fn plan(
        &self,
        instruction: &str,
        context: Option<&str>,
        snapshot: &PageSnapshot,
    ) -> Result<PlanResponse, InferenceError> {
        let mut user = page_block(snapshot);
        if let Some(ctx) = context.filter(|c| !c.trim().is_empty()) {
            user.push_str(&format!("\n## Context\n{}\n", ctx.trim()));
        }
        user.push_str(&format!("\n## Instruction\n{}", instruction));
        let (mut plan, usage): (PlanResponse, _) = self.ask(PLAN_SYSTEM, user).await?;
        plan.usage = usage;
        Ok(plan)
    }

    async fn locate(
        &self,
        locate: &LocateParam,
        snapshot: &PageSnapshot,
    ) -> Result<LocateResponse, InferenceError> {
        let mut user = page_block(snapshot);
        if locate.deep_think {
            user.push_str("\nExamine every candidate carefully before answering.\n");
        }
        user.push_str(&format!("\n## Element description\n{}", locate.prompt));
        let (mut resp, usage): (LocateResponse, _) = self.ask(LOCATE_SYSTEM, user).await?;
        resp.usage = usage;
        Ok(resp)
    }

    async fn extract(
        &self,
        demand: &ExtractDemand,
        snapshot: &PageSnapshot,
    ) -> Result<ExtractResponse, InferenceError> {
        let user = format!("{}\n## Demand\n{}", page_block(snapshot), demand.prompt());
        let (mut resp, usage): (ExtractResponse, _) = self.ask(EXTRACT_SYSTEM, user).await?;
        resp.usage = usage;
        Ok(resp)
    }

    async fn assert(
        &self,
        assertion: &str,
        context: Option<&str>,
        snapshot: &PageSnapshot,
    ) -> Result<AssertResponse, InferenceError> {
        let mut user = page_block(snapshot);
        if let Some(ctx) = context.filter(|c| !c.trim().is_empty()) {
            user.push_str(&format!("\n## Context\n{}\n", ctx.trim()));
        }
        user.push_str(&format!("\n## Assertion\n{}", assertion));
        let (mut resp, usage): (AssertResponse, _) = self.ask(ASSERT_SYSTEM, user).await?;
        resp.usage = usage;
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::ActionType;
    use crate::llm::MockLlmClient;
    use crate::page::{ElementInfo, Rect};

    fn snapshot() -> PageSnapshot {
        PageSnapshot::new(
            "https://example.com",
            "Example",
            vec![ElementInfo::new("b1", "button", "Buy", Rect::new(0.0, 0.0, 10.0, 10.0))],
        )
    }

    #[tokio::test]
    async fn test_plan_parses_fenced_json() {
        let llm = Arc::new(MockLlmClient::with_replies([
            "```json\n{\"actions\": [{\"type\": \"Tap\", \"locate\": {\"prompt\": \"Buy\"}}], \"thought\": \"tap buy\"}\n```",
        ]));
        let inference = LlmInference::new(llm);
        let plan = inference.plan("buy it", None, &snapshot()).await.unwrap();
        assert_eq!(plan.actions[0].action_type, ActionType::Tap);
        assert_eq!(plan.thought.as_deref(), Some("tap buy"));
        assert!(plan.usage.is_some());
    }

    #[tokio::test]
    async fn test_locate_invalid_reply() {
        let llm = Arc::new(MockLlmClient::with_replies(["I cannot see the page"]));
        let inference = LlmInference::new(llm);
        let err = inference
            .locate(&LocateParam::new("Buy"), &snapshot())
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let llm = Arc::new(MockLlmClient::failing("quota exceeded"));
        let inference = LlmInference::new(llm);
        let err = inference.assert("page shows Buy", None, &snapshot()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Llm(_)));
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = schema_json::<PlanResponse>();
        assert!(schema.contains("moreActionsNeeded"));
        assert!(!schema.contains("usage"));
    }
}
