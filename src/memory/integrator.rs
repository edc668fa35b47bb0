//! 动作记录适配器
//!
//! 把 ContextEngine 包装成调用方友好的 record / complete 接口，并提供
//! `wrap_with_action_recording`：执行前登记 Pending 步骤，结束后恰好完成一次。

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::core::AgentError;
use crate::memory::{ContextEngine, StepMetadata, StepStatus};

/// record_action 返回的步骤句柄
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepHandle {
    pub step_id: String,
}

#[derive(Clone)]
pub struct ActionContextIntegrator {
    engine: Arc<Mutex<ContextEngine>>,
}

impl ActionContextIntegrator {
    pub fn new(engine: Arc<Mutex<ContextEngine>>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> Arc<Mutex<ContextEngine>> {
        Arc::clone(&self.engine)
    }

    /// 登记一个 Pending 步骤；没有活动 Run 时返回 NoActiveRun
    pub async fn record_action(
        &self,
        action: &str,
        description: &str,
        metadata: Option<StepMetadata>,
    ) -> Result<StepHandle, AgentError> {
        let step = self
            .engine
            .lock()
            .await
            .add_step(action, description, metadata)?;
        Ok(StepHandle { step_id: step.id })
    }

    /// 以成功 / 失败完成步骤；句柄已失效（被淘汰或已完成）时静默忽略
    pub async fn complete_action(
        &self,
        handle: &StepHandle,
        success: bool,
        error: Option<String>,
        action_result: Option<serde_json::Value>,
    ) {
        let status = if success {
            StepStatus::Success
        } else {
            StepStatus::Failure
        };
        let completed = self
            .engine
            .lock()
            .await
            .complete_step(&handle.step_id, status, error, action_result)
            .await;
        if completed.is_none() {
            tracing::debug!(step_id = %handle.step_id, "complete_action on stale handle");
        }
    }

    pub async fn action_summaries(&self) -> String {
        self.engine.lock().await.action_summaries()
    }

    pub async fn prompt_section(&self) -> String {
        self.engine.lock().await.prompt_section()
    }

    /// 包装一次异步操作：先登记步骤，再执行，结束后按结果完成步骤。
    /// 成功值与错误值都原样返回给调用方。
    pub async fn wrap_with_action_recording<T, E, F>(
        &self,
        action: &str,
        description: &str,
        fut: F,
        metadata: Option<StepMetadata>,
    ) -> Result<T, E>
    where
        T: Serialize,
        E: Display + From<AgentError>,
        F: Future<Output = Result<T, E>>,
    {
        let handle = self.record_action(action, description, metadata).await?;
        match fut.await {
            Ok(value) => {
                let recorded = serde_json::to_value(&value).ok();
                self.complete_action(&handle, true, None, recorded).await;
                Ok(value)
            }
            Err(e) => {
                self.complete_action(&handle, false, Some(e.to_string()), None)
                    .await;
                Err(e)
            }
        }
    }
}
