//! ScriptedInference：脚本化推理（测试与演示用，无需模型）
//!
//! 各请求类型各有一个响应队列；定位请求在队列为空时按元素文本做大小写不敏感的包含匹配。
//! 统计每类调用次数，便于验证缓存命中时确实跳过了外部调用。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::inference::{
    AssertResponse, ExtractDemand, ExtractResponse, Inference, InferenceError, LocateParam,
    LocateResponse, PlanResponse,
};
use crate::llm::TokenUsage;
use crate::page::PageSnapshot;

type Queue<T> = Mutex<VecDeque<Result<T, InferenceError>>>;

#[derive(Default)]
pub struct ScriptedInference {
    plans: Queue<PlanResponse>,
    locates: Queue<LocateResponse>,
    extracts: Queue<ExtractResponse>,
    asserts: Queue<AssertResponse>,
    plan_calls: AtomicUsize,
    locate_calls: AtomicUsize,
    extract_calls: AtomicUsize,
    assert_calls: AtomicUsize,
    delay: Option<Duration>,
}

fn pop<T>(queue: &Queue<T>) -> Option<Result<T, InferenceError>> {
    queue.lock().ok()?.pop_front()
}

fn push<T>(queue: &Queue<T>, item: Result<T, InferenceError>) {
    if let Ok(mut q) = queue.lock() {
        q.push_back(item);
    }
}

impl ScriptedInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用前先等待 delay（模拟慢速推理，用于超时测试）
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_plan(&self, plan: PlanResponse) -> &Self {
        push(&self.plans, Ok(plan));
        self
    }

    pub fn push_plan_error(&self, err: InferenceError) -> &Self {
        push(&self.plans, Err(err));
        self
    }

    pub fn push_locate(&self, resp: LocateResponse) -> &Self {
        push(&self.locates, Ok(resp));
        self
    }

    pub fn push_locate_error(&self, err: InferenceError) -> &Self {
        push(&self.locates, Err(err));
        self
    }

    pub fn push_extract(&self, resp: ExtractResponse) -> &Self {
        push(&self.extracts, Ok(resp));
        self
    }

    pub fn push_assert(&self, resp: AssertResponse) -> &Self {
        push(&self.asserts, Ok(resp));
        self
    }

    pub fn push_assert_error(&self, err: InferenceError) -> &Self {
        push(&self.asserts, Err(err));
        self
    }

    pub fn plan_calls(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
    }

    pub fn locate_calls(&self) -> usize {
        self.locate_calls.load(Ordering::SeqCst)
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn assert_calls(&self) -> usize {
        self.assert_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
    }
}

/// 元素文本与描述互相包含即视为命中（大小写不敏感）
fn match_by_content(locate: &LocateParam, snapshot: &PageSnapshot) -> LocateResponse {
    let needle = locate.prompt.to_lowercase();
    let hit = snapshot.elements.iter().find(|e| {
        let content = e.content.to_lowercase();
        !content.is_empty() && (needle.contains(&content) || content.contains(&needle))
    });
    LocateResponse {
        element_id: hit.map(|e| e.id.clone()),
        thought: Some(match hit {
            Some(e) => format!("matched element {} by its text", e.id),
            None => format!("no element matches \"{}\"", locate.prompt),
        }),
        error: None,
        usage: Some(TokenUsage::new(locate.prompt.len() as u64, 8)),
    }
}

#[async_trait]
impl Inference for ScriptedInference {
    async fn plan(
        &self,
        instruction: &str,
        _context: Option<&str>,
        _snapshot: &PageSnapshot,
    ) -> Result<PlanResponse, InferenceError> {
        self.plan_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        pop(&self.plans).unwrap_or_else(|| {
            Err(InferenceError::Unavailable(format!(
                "no scripted plan for \"{}\"",
                instruction
            )))
        })
    }

    async fn locate(
        &self,
        locate: &LocateParam,
        snapshot: &PageSnapshot,
    ) -> Result<LocateResponse, InferenceError> {
        self.locate_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        pop(&self.locates).unwrap_or_else(|| Ok(match_by_content(locate, snapshot)))
    }

    async fn extract(
        &self,
        demand: &ExtractDemand,
        _snapshot: &PageSnapshot,
    ) -> Result<ExtractResponse, InferenceError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        pop(&self.extracts).unwrap_or_else(|| {
            Err(InferenceError::Unavailable(format!(
                "no scripted extraction for \"{}\"",
                demand.prompt()
            )))
        })
    }

    async fn assert(
        &self,
        assertion: &str,
        _context: Option<&str>,
        _snapshot: &PageSnapshot,
    ) -> Result<AssertResponse, InferenceError> {
        self.assert_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        pop(&self.asserts).unwrap_or_else(|| {
            Err(InferenceError::Unavailable(format!(
                "no scripted assertion for \"{}\"",
                assertion
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{ElementInfo, Rect};

    #[tokio::test]
    async fn test_locate_falls_back_to_content_match() {
        let inference = ScriptedInference::new();
        let snapshot = PageSnapshot::new(
            "about:blank",
            "",
            vec![ElementInfo::new("s1", "button", "Search", Rect::default())],
        );
        let resp = inference
            .locate(&LocateParam::new("the Search button"), &snapshot)
            .await
            .unwrap();
        assert_eq!(resp.element_id.as_deref(), Some("s1"));
        assert_eq!(inference.locate_calls(), 1);
    }

    #[tokio::test]
    async fn test_plan_queue_exhausted() {
        let inference = ScriptedInference::new();
        let err = inference
            .plan("do it", None, &PageSnapshot::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Unavailable(_)));
    }
}
