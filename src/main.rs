//! Stepwise 演示入口
//!
//! 在内存页面上跑一段登录流程：provider = mock 时使用脚本化推理，
//! provider = openai 时使用真实模型。每次调用的结果信封以 JSON 打印到标准输出。

use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use stepwise::agent::{PageAgentBuilder, WaitForOptions};
use stepwise::config::load_config;
use stepwise::inference::{
    ActionType, AssertResponse, LocateParam, PlanResponse, PrimitiveAction, ScriptedInference,
};
use stepwise::observability;
use stepwise::page::{ElementInfo, PageSnapshot, Rect, StaticPage};

fn login_page() -> PageSnapshot {
    PageSnapshot::new(
        "https://shop.example.com/login",
        "Sign in - Example Shop",
        vec![
            ElementInfo::new("e1", "textbox", "Email", Rect::new(40.0, 120.0, 280.0, 32.0))
                .with_attribute("type", "email"),
            ElementInfo::new("e2", "textbox", "Password", Rect::new(40.0, 170.0, 280.0, 32.0))
                .with_attribute("type", "password"),
            ElementInfo::new("e3", "button", "Sign in", Rect::new(40.0, 220.0, 120.0, 36.0)),
        ],
    )
}

fn scripted_inference() -> ScriptedInference {
    let inference = ScriptedInference::new();
    inference
        .push_plan(PlanResponse {
            actions: vec![
                PrimitiveAction::new(ActionType::Input)
                    .with_locate(LocateParam::new("Email"))
                    .with_param(json!({ "value": "demo@example.com" })),
                PrimitiveAction::new(ActionType::Input)
                    .with_locate(LocateParam::new("Password"))
                    .with_param(json!({ "value": "hunter2" })),
            ],
            thought: Some("Fill in the credentials".to_string()),
            ..PlanResponse::default()
        })
        .push_assert(AssertResponse {
            pass: true,
            thought: Some("The Sign in button is visible".to_string()),
            usage: None,
        })
        .push_assert(AssertResponse {
            pass: true,
            thought: Some("The form is ready".to_string()),
            usage: None,
        });
    inference
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config = load_config(None).context("Failed to load config")?;
    let page = Arc::new(StaticPage::new(login_page()));

    let mut builder = PageAgentBuilder::new(config.clone()).with_page(page.clone());
    if config.llm.provider != "openai" {
        builder = builder.with_inference(Arc::new(scripted_inference()));
    }
    let agent = builder.build().await.context("Failed to build agent")?;

    let filled = agent
        .ai_action("fill in the login form with the demo account")
        .await
        .context("aiAction failed")?;
    println!("{}", serde_json::to_string_pretty(&filled)?);

    let tapped = agent.ai_tap("Sign in").await.context("aiTap failed")?;
    println!("{}", serde_json::to_string_pretty(&tapped)?);

    let asserted = agent
        .ai_assert("the Sign in button is visible", None)
        .await
        .context("aiAssert failed")?;
    println!("{}", serde_json::to_string_pretty(&asserted)?);

    let ready = agent
        .ai_wait_for("the login form is ready", WaitForOptions::default())
        .await
        .context("aiWaitFor failed")?;
    println!("{}", serde_json::to_string_pretty(&ready)?);

    if let Some(run) = agent.finish().await {
        println!("{}", serde_json::to_string_pretty(&run)?);
    }
    tracing::info!(actions = page.performed().len(), "demo finished");

    Ok(())
}
