//! 缓存指纹：语义输入的确定性 sha256

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 被缓存的推理类型，参与指纹计算，保证规划与定位的 key 空间互不相交
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    Plan,
    Locate,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Plan => "plan",
            CacheKind::Locate => "locate",
        }
    }
}

/// 十六进制 sha256 指纹
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// kind + 各文本输入 + 环境签名；每段带长度前缀，避免拼接歧义（"ab"+"c" ≠ "a"+"bc"）
    pub fn compute(kind: CacheKind, inputs: &[&str], environment_signature: &str) -> Self {
        let mut hasher = Sha256::new();
        let kind = kind.as_str();
        hasher.update((kind.len() as u64).to_le_bytes());
        hasher.update(kind.as_bytes());
        hasher.update((inputs.len() as u64).to_le_bytes());
        for input in inputs {
            hasher.update((input.len() as u64).to_le_bytes());
            hasher.update(input.as_bytes());
        }
        hasher.update((environment_signature.len() as u64).to_le_bytes());
        hasher.update(environment_signature.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
