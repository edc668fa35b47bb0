//! 步骤 / Run 的 AI 摘要
//!
//! 摘要只是锦上添花：任何失败都由调用方（ContextEngine）换成确定性兜底文本，
//! 绝不让一次摘要失败中断自动化流程。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::llm::{extract_json_block, LlmClient, LlmError, Message};
use crate::memory::{Run, Step, StepStatus};

const NO_SUMMARY: &str = "No summary available";

/// 摘要器：输入步骤或 Run，输出一两句自然语言
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize_step(&self, step: &Step) -> Result<String, LlmError>;

    async fn summarize_run(&self, run: &Run) -> Result<String, LlmError>;
}

/// 步骤摘要失败时的兜底文本
pub fn step_fallback(step: &Step) -> String {
    format!("{} - {} ({})", step.action, step.description, step.result)
}

/// Run 摘要失败时的兜底文本
pub fn run_fallback(run: &Run) -> String {
    format!("Test run: {} ({})", run.name, run.result)
}

fn outcome_word(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Success => "Successful",
        _ => "Failed",
    }
}

fn step_prompt(step: &Step) -> String {
    let mut lines = vec![
        "Summarize the following test step in 1-2 concise sentences:".to_string(),
        String::new(),
        format!("Action: {}", step.action),
        format!("Description: {}", step.description),
        format!("Result: {}", outcome_word(step.result)),
    ];
    if let Some(err) = &step.error {
        lines.push(format!("Error: {}", err));
    }
    if let Some(result) = &step.action_result {
        let text = match result {
            serde_json::Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        };
        lines.push(format!("Action Result: {}", text));
    }
    if let Some(meta) = &step.metadata {
        if let Ok(json) = serde_json::to_string(meta) {
            lines.push(format!("Metadata: {}", json));
        }
    }
    lines.push(String::new());
    lines.push(
        "Your summary should be factual, concise, and focus on what was done and the outcome."
            .to_string(),
    );
    lines.push("Include specific information from the action result when relevant.".to_string());
    lines.join("\n")
}

fn run_prompt(run: &Run) -> String {
    let steps = run
        .steps
        .iter()
        .map(|s| {
            let mut line = format!("- {}: {} ({})", s.action, s.description, s.result);
            if let Some(err) = &s.error {
                line.push_str(&format!(" - Error: {}", err));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut lines = vec![
        "Summarize the following test run in 2-3 concise sentences:".to_string(),
        String::new(),
        format!("Test: {}", run.name),
    ];
    if let Some(desc) = &run.description {
        lines.push(format!("Description: {}", desc));
    }
    lines.push(format!("Result: {}", outcome_word(run.result)));
    lines.push("Steps:".to_string());
    lines.push(steps);
    lines.push(String::new());
    lines.push(
        "Your summary should be factual, concise, and focus on what was done and the overall outcome."
            .to_string(),
    );
    lines.join("\n")
}

#[derive(Deserialize)]
struct SummaryReply {
    #[serde(default)]
    summary: Option<String>,
}

/// 解析 `{"summary": "..."}`；没有 JSON 时把整段回复当作摘要
fn parse_summary(reply: &str) -> String {
    let text = match extract_json_block(reply) {
        Some(block) => serde_json::from_str::<SummaryReply>(block)
            .ok()
            .and_then(|r| r.summary)
            .unwrap_or_default(),
        None => reply.to_string(),
    };
    let text = text.trim();
    if text.is_empty() {
        NO_SUMMARY.to_string()
    } else {
        text.to_string()
    }
}

/// 基于 LlmClient 的摘要器
pub struct LlmSummarizer {
    llm: Arc<dyn LlmClient>,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize_step(&self, step: &Step) -> Result<String, LlmError> {
        let messages = vec![
            Message::system(
                "Generate a concise summary of the test step that includes key information from the action result. Reply as JSON: {\"summary\": \"...\"}",
            ),
            Message::user(step_prompt(step)),
        ];
        let completion = self.llm.complete(&messages).await?;
        Ok(parse_summary(&completion.content))
    }

    async fn summarize_run(&self, run: &Run) -> Result<String, LlmError> {
        let messages = vec![
            Message::system(
                "Generate a concise summary of the test run. Reply as JSON: {\"summary\": \"...\"}",
            ),
            Message::user(run_prompt(run)),
        ];
        let completion = self.llm.complete(&messages).await?;
        Ok(parse_summary(&completion.content))
    }
}
