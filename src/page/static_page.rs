//! StaticPage：内存中的脚本化页面（测试与演示用）
//!
//! 快照固定（可整体替换以模拟页面变化），记录每次执行的操作，可指定某类操作必定失败。

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::inference::{ActionType, PrimitiveAction};
use crate::page::{ElementInfo, Page, PageError, PageSnapshot};

/// 已执行的操作记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformedAction {
    pub action_type: ActionType,
    pub element_id: Option<String>,
    pub param: Option<serde_json::Value>,
}

pub struct StaticPage {
    snapshot: Mutex<PageSnapshot>,
    performed: Mutex<Vec<PerformedAction>>,
    failing: Mutex<HashSet<ActionType>>,
}

impl StaticPage {
    pub fn new(snapshot: PageSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            performed: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// 之后该类型的操作都返回错误
    pub fn fail_on(&self, action_type: ActionType) {
        if let Ok(mut f) = self.failing.lock() {
            f.insert(action_type);
        }
    }

    /// 替换快照（模拟导航或 DOM 变化）
    pub fn set_snapshot(&self, snapshot: PageSnapshot) {
        if let Ok(mut s) = self.snapshot.lock() {
            *s = snapshot;
        }
    }

    pub fn performed(&self) -> Vec<PerformedAction> {
        self.performed.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn current(&self) -> Result<PageSnapshot, PageError> {
        self.snapshot
            .lock()
            .map(|s| s.clone())
            .map_err(|_| PageError::Snapshot("snapshot lock poisoned".to_string()))
    }
}

#[async_trait]
impl Page for StaticPage {
    fn page_type(&self) -> &str {
        "static"
    }

    async fn snapshot(&self) -> Result<PageSnapshot, PageError> {
        self.current()
    }

    async fn url(&self) -> Result<String, PageError> {
        Ok(self.current()?.url)
    }

    async fn perform(
        &self,
        action: &PrimitiveAction,
        element: Option<&ElementInfo>,
    ) -> Result<serde_json::Value, PageError> {
        let should_fail = self
            .failing
            .lock()
            .map(|f| f.contains(&action.action_type))
            .unwrap_or(false);
        if should_fail {
            return Err(PageError::Action {
                action: action.action_type.to_string(),
                reason: "scripted failure".to_string(),
            });
        }

        let needs_element = matches!(action.action_type, ActionType::Tap | ActionType::Hover);
        if needs_element && element.is_none() {
            return Err(PageError::Action {
                action: action.action_type.to_string(),
                reason: "no target element".to_string(),
            });
        }

        let record = PerformedAction {
            action_type: action.action_type,
            element_id: element.map(|e| e.id.clone()),
            param: action.param.clone(),
        };
        if let Ok(mut p) = self.performed.lock() {
            p.push(record.clone());
        }

        Ok(json!({
            "action": action.action_type.to_string(),
            "element": record.element_id,
            "center": element.map(|e| {
                let (x, y) = e.center();
                json!([x, y])
            }),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Rect;

    fn page() -> StaticPage {
        StaticPage::new(PageSnapshot::new(
            "https://example.com",
            "Example",
            vec![ElementInfo::new("a", "link", "More", Rect::new(0.0, 0.0, 20.0, 10.0))],
        ))
    }

    #[tokio::test]
    async fn test_perform_records_action() {
        let page = page();
        let snap = page.snapshot().await.unwrap();
        let out = page
            .perform(&PrimitiveAction::new(ActionType::Tap), snap.element("a"))
            .await
            .unwrap();
        assert_eq!(out["element"], "a");
        assert_eq!(page.performed().len(), 1);
    }

    #[tokio::test]
    async fn test_tap_without_element_fails() {
        let page = page();
        let err = page
            .perform(&PrimitiveAction::new(ActionType::Tap), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PageError::Action { .. }));
    }

    #[tokio::test]
    async fn test_fail_on() {
        let page = page();
        page.fail_on(ActionType::Scroll);
        assert!(page
            .perform(&PrimitiveAction::new(ActionType::Scroll), None)
            .await
            .is_err());
        assert!(page.performed().is_empty());
    }
}
