//! 页面快照
//!
//! 推理服务看到的是快照的文本表示：每个元素一行，带唯一 id，便于模型精准引用；
//! signature() 是快照的内容指纹，参与缓存 key 的计算。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 元素矩形（页面坐标，单位 px）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// 快照中的元素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub id: String,
    /// 角色（button / link / textbox ...）
    pub role: String,
    /// 可读文本或无障碍名称
    pub content: String,
    pub rect: Rect,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ElementInfo {
    pub fn new(id: impl Into<String>, role: impl Into<String>, content: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            content: content.into(),
            rect,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn center(&self) -> (f64, f64) {
        self.rect.center()
    }
}

/// 页面快照：URL、标题、元素列表，可选截图
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub elements: Vec<ElementInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_base64: Option<String>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, title: impl Into<String>, elements: Vec<ElementInfo>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            elements,
            screenshot_base64: None,
        }
    }

    pub fn element(&self, id: &str) -> Option<&ElementInfo> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// 环境签名：URL、标题与每个元素的 id / 角色 / 文本 / 位置的 sha256（十六进制）。
    /// 截图不参与，避免像素级抖动导致缓存失效。
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [self.url.as_str(), self.title.as_str()] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        for e in &self.elements {
            for part in [e.id.as_str(), e.role.as_str(), e.content.as_str()] {
                hasher.update((part.len() as u64).to_le_bytes());
                hasher.update(part.as_bytes());
            }
            for v in [e.rect.left, e.rect.top, e.rect.width, e.rect.height] {
                hasher.update(v.to_le_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }

    /// 供 prompt 使用的文本表示
    pub fn text_representation(&self) -> String {
        let mut lines = Vec::with_capacity(self.elements.len() + 2);
        lines.push(format!("URL: {}", self.url));
        if !self.title.is_empty() {
            lines.push(format!("Title: {}", self.title));
        }
        for e in &self.elements {
            let mut line = format!("[{}] {}", e.id, e.role);
            if !e.content.is_empty() {
                line.push_str(&format!(": \"{}\"", e.content));
            }
            line.push_str(&format!(
                " ({:.0},{:.0},{:.0},{:.0})",
                e.rect.left, e.rect.top, e.rect.width, e.rect.height
            ));
            for (k, v) in &e.attributes {
                line.push_str(&format!(" {}=\"{}\"", k, v));
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> PageSnapshot {
        PageSnapshot::new(
            "https://shop.example/login",
            "Login",
            vec![
                ElementInfo::new("e1", "textbox", "Email", Rect::new(10.0, 20.0, 200.0, 30.0)),
                ElementInfo::new("e2", "button", "Sign in", Rect::new(10.0, 60.0, 80.0, 30.0)),
            ],
        )
    }

    #[test]
    fn test_signature_is_stable() {
        assert_eq!(snapshot().signature(), snapshot().signature());
        assert_eq!(snapshot().signature().len(), 64);
    }

    #[test]
    fn test_signature_changes_with_content() {
        let mut changed = snapshot();
        changed.elements[1].content = "Log in".to_string();
        assert_ne!(snapshot().signature(), changed.signature());
    }

    #[test]
    fn test_signature_ignores_screenshot() {
        let mut with_shot = snapshot();
        with_shot.screenshot_base64 = Some("aGVsbG8=".to_string());
        assert_eq!(snapshot().signature(), with_shot.signature());
    }

    #[test]
    fn test_text_representation() {
        let text = snapshot().text_representation();
        assert!(text.contains("[e2] button: \"Sign in\" (10,60,80,30)"));
        assert!(text.starts_with("URL: https://shop.example/login"));
    }

    #[test]
    fn test_center() {
        let e = ElementInfo::new("x", "button", "", Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(e.center(), (50.0, 25.0));
    }
}
